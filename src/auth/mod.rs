/*!
 * # Authentication and Authorization Module
 *
 * Email and password sign-in issuing HS256 JWT access tokens, token revocation on
 * sign-out, and role checks for admin-only routes. Session changes are broadcast
 * through [`session::SessionHub`].
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    errors::ServiceError,
    services::users::{CreateUserRequest, UserResponse, UserService},
};

pub mod password;
pub mod session;
pub mod user;

use session::{SessionEvent, SessionHub};
use user::UserRole;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,           // Subject (user ID)
    pub name: Option<String>,  // User's name
    pub email: Option<String>, // User's email
    pub roles: Vec<String>,    // User's roles
    pub jti: String,           // JWT ID (unique identifier for this token)
    pub iat: i64,              // Issued at time
    pub exp: i64,              // Expiration time
    pub nbf: i64,              // Not valid before time
    pub iss: String,           // Issuer
    pub aud: String,           // Audience
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
    #[serde(skip)]
    pub token_id: String,
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check if the user is an admin
    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin.as_str())
    }

    fn from_claims(claims: Claims) -> Result<Self, AuthError> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        Ok(Self {
            user_id,
            name: claims.name,
            email: claims.email,
            roles: claims.roles,
            token_id: claims.jti,
            expires_at: claims.exp,
        })
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_audience.clone(),
            cfg.auth_issuer.clone(),
            Duration::from_secs(cfg.jwt_expiration_secs),
        )
    }
}

/// Token blacklist entry
#[derive(Clone, Debug)]
struct BlacklistedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

/// Access token response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    pub expires_in: i64,
}

/// Sign-in credentials
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignInRequest {
    #[schema(example = "ana@example.com")]
    pub email: String,
    pub password: String,
}

/// Sign-up payload; the account is always an operator
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Token plus the account it belongs to
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignInResponse {
    #[serde(flatten)]
    pub token: TokenPair,
    pub user: UserResponse,
}

/// Current session as seen by the token holder
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionInfo {
    pub user: AuthUser,
    pub expires_at: DateTime<Utc>,
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InsufficientPermissions => ServiceError::Forbidden(err.to_string()),
            AuthError::TokenCreation(msg) | AuthError::InternalError(msg) => {
                ServiceError::InternalError(msg)
            }
            other => ServiceError::Unauthorized(other.to_string()),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

/// Authentication service that handles sign-in, token issuance and validation
#[derive(Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    users: UserService,
    sessions: SessionHub,
    blacklisted_tokens: Arc<RwLock<Vec<BlacklistedToken>>>,
}

impl AuthService {
    pub fn new(config: AuthConfig, users: UserService, sessions: SessionHub) -> Self {
        Self {
            config,
            users,
            sessions,
            blacklisted_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Verifies credentials and issues an access token
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn sign_in(&self, request: SignInRequest) -> Result<SignInResponse, ServiceError> {
        let found = self.users.find_by_email(&request.email).await?;
        let account = match found {
            Some(account) if password::verify_password(&request.password, &account.password_hash) => {
                account
            }
            Some(_) => {
                warn!("Rejected sign-in attempt");
                return Err(AuthError::InvalidCredentials.into());
            }
            None => {
                password::verify_against_dummy(&request.password);
                warn!("Rejected sign-in attempt");
                return Err(AuthError::InvalidCredentials.into());
            }
        };
        if !account.active {
            return Err(AuthError::AccountDisabled.into());
        }

        let account = self.users.record_sign_in(account).await?;
        let token = self.generate_token(&account)?;

        self.sessions.publish(SessionEvent::SignedIn {
            user_id: account.id,
            email: account.email.clone(),
            at: Utc::now(),
        });
        info!(user_id = %account.id, "User signed in");
        Ok(SignInResponse {
            token,
            user: account.into(),
        })
    }

    /// Creates an operator account and signs it in
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<SignInResponse, ServiceError> {
        let credentials = SignInRequest {
            email: request.email.clone(),
            password: request.password.clone(),
        };
        self.users
            .create(CreateUserRequest {
                name: request.name,
                email: request.email,
                password: request.password,
                role: Some(UserRole::Operator),
            })
            .await?;
        self.sign_in(credentials).await
    }

    /// Revokes the presented token
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn sign_out(&self, user: &AuthUser) -> Result<(), ServiceError> {
        let expiry = DateTime::<Utc>::from_timestamp(user.expires_at, 0).unwrap_or_else(Utc::now);
        self.revoke(&user.token_id, expiry).await;
        self.sessions.publish(SessionEvent::SignedOut {
            user_id: user.user_id,
            token_id: user.token_id.clone(),
            at: Utc::now(),
        });
        info!("User signed out");
        Ok(())
    }

    pub fn session(&self, user: &AuthUser) -> SessionInfo {
        SessionInfo {
            user: user.clone(),
            expires_at: DateTime::<Utc>::from_timestamp(user.expires_at, 0).unwrap_or_else(Utc::now),
        }
    }

    pub fn sessions(&self) -> &SessionHub {
        &self.sessions
    }

    /// Generate a JWT access token for an account
    pub fn generate_token(&self, account: &user::Model) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let claims = Claims {
            sub: account.id.to_string(),
            name: Some(account.name.clone()),
            email: Some(account.email.clone()),
            roles: vec![account.role.as_str().to_string()],
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(TokenPair {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
        })
    }

    /// Validate a JWT token and extract the claims
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);
        validation.set_audience(&[self.config.jwt_audience.as_str()]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        if self.is_token_blacklisted(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    /// Validates the token and checks the account still exists and is active.
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let user = AuthUser::from_claims(self.validate_token(token).await?)?;
        match self.users.find_by_id(user.user_id).await {
            Ok(Some(account)) if account.active => Ok(user),
            Ok(Some(_)) => Err(AuthError::AccountDisabled),
            Ok(None) => Err(AuthError::InvalidToken),
            Err(e) => Err(AuthError::InternalError(e.to_string())),
        }
    }

    async fn revoke(&self, jti: &str, expiry: DateTime<Utc>) {
        let mut blacklist = self.blacklisted_tokens.write().await;
        blacklist.push(BlacklistedToken {
            jti: jti.to_string(),
            expiry,
        });

        // Clean up expired tokens in the blacklist
        let now = Utc::now();
        blacklist.retain(|token| token.expiry > now);
        debug!(revoked = blacklist.len(), "Token revoked");
    }

    async fn is_token_blacklisted(&self, jti: &str) -> bool {
        let blacklist = self.blacklisted_tokens.read().await;
        blacklist.iter().any(|token| token.jti == jti)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_role(&required_role) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that validates the bearer token
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::InternalError("Authentication service not available".to_string())
                .into_response();
        }
    };

    let token = match bearer_token(request.headers()) {
        Some(token) => token.to_string(),
        None => return AuthError::MissingAuth.into_response(),
    };

    match auth_service.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            e.into_response()
        }
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: UserRole) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: UserRole) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.as_str().to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use assert_matches::assert_matches;

    async fn service() -> AuthService {
        let pool = establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        let sessions = SessionHub::init();
        let users = UserService::new(Arc::new(pool), None, sessions.clone());
        AuthService::new(
            AuthConfig::new(
                "a8Fq2LmZ7xR4pT9vW1cN6bY3kD5hJ0sG".into(),
                "shiptrack-api".into(),
                "shiptrack-auth".into(),
                Duration::from_secs(600),
            ),
            users,
            sessions,
        )
    }

    fn sign_up(email: &str) -> SignUpRequest {
        SignUpRequest {
            name: "Ana".into(),
            email: email.into(),
            password: "s3cret-pass".into(),
        }
    }

    #[tokio::test]
    async fn sign_up_issues_operator_token() {
        let auth = service().await;
        let mut events = auth.sessions().subscribe().unwrap();

        let response = auth.sign_up(sign_up("Ana@Example.com")).await.unwrap();
        assert_eq!(response.user.email, "ana@example.com");
        assert_eq!(response.user.role, UserRole::Operator);

        let user = auth.authenticate(&response.token.access_token).await.unwrap();
        assert!(!user.is_admin());
        assert_eq!(user.user_id, response.user.id);

        assert_matches!(events.recv().await.unwrap(), SessionEvent::UserCreated { .. });
        assert_matches!(events.recv().await.unwrap(), SessionEvent::SignedIn { .. });
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let auth = service().await;
        auth.sign_up(sign_up("ana@example.com")).await.unwrap();

        let err = auth
            .sign_in(SignInRequest {
                email: "ana@example.com".into(),
                password: "nope-nope".into(),
            })
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::Unauthorized(_));
    }

    #[tokio::test]
    async fn unknown_email_is_indistinguishable_from_wrong_password() {
        let auth = service().await;
        auth.sign_up(sign_up("ana@example.com")).await.unwrap();

        let wrong_password = auth
            .sign_in(SignInRequest {
                email: "ana@example.com".into(),
                password: "nope-nope".into(),
            })
            .await
            .unwrap_err();
        let unknown = auth
            .sign_in(SignInRequest {
                email: "nobody@example.com".into(),
                password: "nope-nope".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(unknown.to_string(), wrong_password.to_string());
        assert_eq!(unknown.response_message(), wrong_password.response_message());
    }

    #[tokio::test]
    async fn signed_out_tokens_are_revoked() {
        let auth = service().await;
        let response = auth.sign_up(sign_up("ana@example.com")).await.unwrap();
        let token = response.token.access_token;

        let user = auth.authenticate(&token).await.unwrap();
        auth.sign_out(&user).await.unwrap();
        assert_matches!(auth.authenticate(&token).await, Err(AuthError::RevokedToken));
    }

    #[tokio::test]
    async fn foreign_tokens_are_invalid() {
        let auth = service().await;
        assert_matches!(
            auth.validate_token("not.a.jwt").await,
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));
    }
}
