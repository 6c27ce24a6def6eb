use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{
        password::hash_password,
        session::{SessionEvent, SessionHub},
        user::{self, UserRole},
    },
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
};

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Ana Souza",
    "email": "ana@example.com",
    "password": "s3cret-pass",
    "role": "operator"
}))]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must have at least 6 characters"))]
    pub password: String,
    /// Defaults to `operator`
    #[serde(default)]
    pub role: Option<UserRole>,
}

impl CreateUserRequest {
    fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            ..self
        }
    }
}

/// Account without credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub active: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            active: model.active,
            confirmed_at: model.confirmed_at,
            last_sign_in_at: model.last_sign_in_at,
            created_at: model.created_at,
        }
    }
}

/// Service for user accounts
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    sessions: SessionHub,
}

impl UserService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        sessions: SessionHub,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            sessions,
        }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<UserResponse>, ServiceError> {
        let users = user::Entity::find()
            .order_by_asc(user::Column::Email)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list users");
                ServiceError::from(e)
            })?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        user::Entity::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to look up user by email");
                ServiceError::from(e)
            })
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<user::Model>, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Failed to look up user");
                ServiceError::from(e)
            })
    }

    /// Creates a confirmed account; a taken email is a uniqueness conflict.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create(&self, request: CreateUserRequest) -> Result<UserResponse, ServiceError> {
        let request = request.normalized();
        request.validate()?;

        let password_hash = hash_password(&request.password)?;
        let now = Utc::now();
        let user_id = Uuid::new_v4();

        let model = user::ActiveModel {
            id: Set(user_id),
            name: Set(request.name),
            email: Set(request.email),
            password_hash: Set(password_hash),
            role: Set(request.role.unwrap_or_default()),
            active: Set(true),
            confirmed_at: Set(Some(now)),
            last_sign_in_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create user");
            ServiceError::from(e)
        })?;

        self.sessions.publish(SessionEvent::UserCreated {
            user_id,
            email: model.email.clone(),
            at: now,
        });
        self.publish(Event::UserCreated(user_id)).await;
        info!(user_id = %user_id, role = model.role.as_str(), "User created successfully");
        Ok(model.into())
    }

    /// Removes an account; nobody can delete their own.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn delete(&self, user_id: Uuid, acting_user_id: Uuid) -> Result<(), ServiceError> {
        if user_id == acting_user_id {
            return Err(ServiceError::BadRequest(
                "You cannot delete your own account".to_string(),
            ));
        }

        let result = user::Entity::delete_by_id(user_id)
            .exec(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "Failed to delete user");
                ServiceError::from(e)
            })?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("User {} not found", user_id)));
        }

        self.sessions.publish(SessionEvent::UserDeleted {
            user_id,
            at: Utc::now(),
        });
        self.publish(Event::UserDeleted(user_id)).await;
        info!(user_id = %user_id, "User deleted successfully");
        Ok(())
    }

    pub async fn record_sign_in(&self, model: user::Model) -> Result<user::Model, ServiceError> {
        let now = Utc::now();
        let mut active: user::ActiveModel = model.into();
        active.last_sign_in_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&*self.db_pool).await.map_err(|e| {
            error!(error = %e, "Failed to record sign-in");
            ServiceError::from(e)
        })
    }

    /// Creates the first admin when no account uses `email` yet.
    #[instrument(skip(self, password))]
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<bool, ServiceError> {
        if self.find_by_email(email).await?.is_some() {
            return Ok(false);
        }
        self.create(CreateUserRequest {
            name: "Administrator".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: Some(UserRole::Admin),
        })
        .await?;
        info!(email, "Bootstrap admin created");
        Ok(true)
    }

    async fn publish(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event).await;
        }
    }
}
