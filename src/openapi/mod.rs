use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shiptrack API",
        version = "1.0.0",
        description = r#"
# Shiptrack Logistics API

Purchase orders tracked from production to delivery, with the suppliers, carriers and
destinations they reference, attached documents, and dashboard aggregates.

## Authentication

Sign in at `/api/v1/auth/sign-in` and send the access token on every other request:

```
Authorization: Bearer <your-jwt-token>
```

`/api/v1/users` additionally requires the admin role.

## Error Handling

Errors share one body shape:

```json
{
  "error": "Unprocessable Entity",
  "message": "Validation failed",
  "fields": [{"field": "email", "message": "Must be a valid email address"}],
  "request_id": "5f0c...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

Irreversible deletes require `confirm=true`.

## Localization

Status labels follow the `lang` query parameter (`pt`, `pt-BR`, `en-US`), then
`Accept-Language`, then the configured default.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Sign-in, sign-out and session events"),
        (name = "orders", description = "Purchase orders and their shipping milestones"),
        (name = "documents", description = "Files attached to orders"),
        (name = "suppliers", description = "Supplier records"),
        (name = "carriers", description = "Carrier records and price statistics"),
        (name = "destinations", description = "Destination records"),
        (name = "dashboard", description = "Aggregate figures"),
        (name = "lookups", description = "Controlled lists"),
        (name = "users", description = "Account administration"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::api_status,
        crate::health_check,

        crate::handlers::auth::sign_in,
        crate::handlers::auth::sign_up,
        crate::handlers::auth::sign_out,
        crate::handlers::auth::current_session,
        crate::handlers::auth::session_events,

        crate::handlers::dashboard::get_dashboard,

        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::new_order_form,
        crate::handlers::orders::edit_order_form,
        crate::handlers::orders::create_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::save_order_with_document,
        crate::handlers::orders::delete_preview,
        crate::handlers::orders::delete_order,

        crate::handlers::documents::list_documents,
        crate::handlers::documents::upload_document,
        crate::handlers::documents::rename_document,
        crate::handlers::documents::delete_document,

        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::update_supplier,
        crate::handlers::suppliers::delete_supplier,

        crate::handlers::carriers::list_carriers,
        crate::handlers::carriers::get_carrier,
        crate::handlers::carriers::create_carrier,
        crate::handlers::carriers::update_carrier,
        crate::handlers::carriers::delete_carrier,
        crate::handlers::carriers::carrier_stats,

        crate::handlers::destinations::list_destinations,
        crate::handlers::destinations::get_destination,
        crate::handlers::destinations::create_destination,
        crate::handlers::destinations::update_destination,
        crate::handlers::destinations::delete_destination,

        crate::handlers::lookups::list_container_types,

        crate::handlers::users::list_users,
        crate::handlers::users::create_user,
        crate::handlers::users::delete_user,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::errors::FieldError,
            crate::entities::OrderStatus,
            crate::entities::StatusTone,
            crate::auth::user::UserRole,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url(OPENAPI_JSON_PATH, ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from(OPENAPI_JSON_PATH).try_it_out_enabled(true))
}
