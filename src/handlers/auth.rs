use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use super::common::created;
use crate::{
    auth::{
        session::SessionEvent, AuthUser, SessionInfo, SignInRequest, SignInResponse,
        SignUpRequest,
    },
    errors::ServiceError,
    ApiResponse, ApiResult, AppState,
};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Sign in with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-in",
    tag = "auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = ApiResponse<SignInResponse>),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse),
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> ApiResult<SignInResponse> {
    let response = state.auth.sign_in(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Create an operator account and sign it in
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-up",
    tag = "auth",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = ApiResponse<SignInResponse>),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse),
        (status = 422, description = "Validation error", body = crate::errors::ErrorResponse),
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SignInResponse>>), ServiceError> {
    let response = state.auth.sign_up(request).await?;
    Ok(created(response))
}

/// Revoke the presented token
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-out",
    tag = "auth",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn sign_out(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<StatusCode, ServiceError> {
    state.auth.sign_out(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current session
#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    tag = "auth",
    responses(
        (status = 200, description = "Active session", body = ApiResponse<SessionInfo>),
        (status = 401, description = "No valid session", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn current_session(State(state): State<AppState>, user: AuthUser) -> ApiResult<SessionInfo> {
    Ok(Json(ApiResponse::success(state.auth.session(&user))))
}

/// Server-sent stream of session changes for the caller's account, or every account for admins.
///
/// Ends after the caller's own sign-out or account deletion, and on shutdown.
#[utoipa::path(
    get,
    path = "/api/v1/auth/session/events",
    tag = "auth",
    responses(
        (status = 200, description = "text/event-stream of session events", body = SessionEvent, content_type = "text/event-stream"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Session hub is shut down", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = []))
)]
pub async fn session_events(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, ServiceError> {
    let receiver = state
        .sessions
        .subscribe()
        .ok_or_else(|| ServiceError::InternalError("Session hub is shut down".to_string()))?;
    debug!(user_id = %user.user_id, "Session event subscriber attached");

    let events = stream::unfold(Some((receiver, user)), |subscription| async move {
        let (mut receiver, user) = subscription?;
        loop {
            match receiver.recv().await {
                Ok(event) if !event.visible_to(&user) => continue,
                Ok(event) if event == SessionEvent::Closed || event.ends_session_of(&user) => {
                    debug!(user_id = %user.user_id, event = event.name(), "Session event stream finished");
                    return Some((Ok(to_sse(&event)), None));
                }
                Ok(event) => return Some((Ok(to_sse(&event)), Some((receiver, user)))),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Session event subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

fn to_sse(event: &SessionEvent) -> SseEvent {
    let base = SseEvent::default().event(event.name());
    match base.clone().json_data(event) {
        Ok(with_data) => with_data,
        Err(e) => {
            warn!(error = %e, "Failed to serialize session event");
            base
        }
    }
}
