/*!
 * # Authentication and Authorization Module
 *
 * Issues and validates JWT access/refresh token pairs, manages account
 * registration and activation, and provides the middleware used to gate
 * routes by permission or role.
 *
 * Authorization is capability based: route-level gates check a permission
 * string carried in the token, while resource-level ownership checks live
 * next to the queries that load the resource.
 */

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::Engine as _;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::events::{Event, EventSender};

// Entity modules
pub mod activation_token;
pub mod user;

const BASE64: base64::engine::general_purpose::GeneralPurpose =
    base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Permission strings carried in tokens and required by gated routers.
pub mod consts {
    /// Create/update/delete products, categories and product images
    pub const CATALOG_MANAGE: &str = "catalog:manage";
    /// Read the admin statistics dashboard
    pub const REPORTS_VIEW: &str = "reports:view";
    /// Drive payment-status transitions on orders
    pub const PAYMENTS_MANAGE: &str = "payments:manage";

    /// Role that bypasses permission checks
    pub const STAFF_ROLE: &str = "staff";
    pub const CUSTOMER_ROLE: &str = "customer";
}

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,              // Subject (user ID)
    pub name: Option<String>,     // User's name
    pub email: Option<String>,    // User's email
    pub roles: Vec<String>,       // User's roles
    pub permissions: Vec<String>, // User's explicit permissions
    pub jti: String,              // JWT ID
    pub iat: i64,                 // Issued at time
    pub exp: i64,                 // Expiration time
    pub nbf: i64,                 // Not valid before time
    pub iss: String,              // Issuer
    pub aud: String,              // Audience
    pub scope: Option<String>,    // "refresh" on refresh tokens
}

/// Authenticated user data extracted from a validated token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub token_id: String,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Elevated capability: sees all reviews, manages the catalog,
    /// reads reports.
    pub fn is_staff(&self) -> bool {
        self.has_role(consts::STAFF_ROLE)
    }
}

#[async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
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

/// Type alias kept for handler signatures
pub type AuthenticatedUser = AuthUser;

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expiration: Duration,
    pub refresh_token_expiration: Duration,
    pub activation_token_ttl: ChronoDuration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        access_token_expiration: Duration,
        refresh_token_expiration: Duration,
        activation_token_ttl: ChronoDuration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            access_token_expiration,
            refresh_token_expiration,
            activation_token_ttl,
        }
    }
}

/// Token blacklist entry
#[derive(Clone, Debug)]
struct BlacklistedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

/// Authentication service handling registration, activation, login and
/// token issuance/validation.
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    blacklisted_tokens: Arc<RwLock<Vec<BlacklistedToken>>>,
}

/// Result of a successful registration. The activation token cleartext
/// exists only here; callers decide how to deliver it.
#[derive(Debug)]
pub struct RegisteredUser {
    pub user: user::Model,
    pub activation_uid: String,
    pub activation_token: String,
}

impl AuthService {
    pub fn new(
        config: AuthConfig,
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            config,
            db,
            event_sender,
            blacklisted_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register a new, inactive account and issue its activation token.
    pub async fn register(&self, input: RegisterRequest) -> Result<RegisteredUser, AuthError> {
        input
            .validate()
            .map_err(|e| AuthError::InvalidInput(e.to_string()))?;

        let email = input.email.trim().to_ascii_lowercase();
        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        if existing.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let now = Utc::now();
        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(hash_password(&input.password)?),
            is_staff: Set(false),
            is_active: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let user = user
            .insert(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        let token = self.issue_activation_token(user.id).await?;
        self.event_sender
            .send_or_log(Event::UserRegistered(user.id))
            .await;
        info!("Registered user {} (inactive)", user.id);

        Ok(RegisteredUser {
            activation_uid: activation_uid(user.id),
            activation_token: token,
            user,
        })
    }

    /// Activate the account referenced by an opaque uid/token pair.
    ///
    /// The uid is the base64 form of the user id; the token must match an
    /// unconsumed, unexpired activation token for that user. Succeeds with
    /// no payload; the token is consumed either way once matched.
    pub async fn activate_account(&self, uid: &str, token: &str) -> Result<(), AuthError> {
        let user_id = decode_activation_uid(uid)?;

        let user = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidActivationToken)?;

        let digest = digest_token(token);
        let record = activation_token::Entity::find()
            .filter(activation_token::Column::UserId.eq(user_id))
            .filter(activation_token::Column::TokenDigest.eq(digest))
            .filter(activation_token::Column::Consumed.eq(false))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidActivationToken)?;

        if record.expires_at < Utc::now() {
            return Err(AuthError::InvalidActivationToken);
        }

        let mut record: activation_token::ActiveModel = record.into();
        record.consumed = Set(true);
        record
            .update(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        let mut user: user::ActiveModel = user.into();
        user.is_active = Set(true);
        user.updated_at = Set(Utc::now());
        let user = user
            .update(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        self.event_sender
            .send_or_log(Event::UserActivated(user.id))
            .await;
        info!("Activated account {}", user.id);
        Ok(())
    }

    /// Validate credentials and issue a token pair.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<TokenPair, AuthError> {
        let email = credentials.email.trim().to_ascii_lowercase();
        let user = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&credentials.password, &user.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }

        self.generate_token(&user).await
    }

    /// Generate a JWT access/refresh pair for a user
    pub async fn generate_token(&self, user: &user::Model) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let access_exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;
        let refresh_exp = now
            + ChronoDuration::from_std(self.config.refresh_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        let roles = roles_for(user);
        let permissions = permissions_for(user);

        let access_claims = Claims {
            sub: user.id.to_string(),
            name: Some(user.name.clone()),
            email: Some(user.email.clone()),
            roles,
            permissions,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: access_exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
            scope: None,
        };

        // Refresh token claims carry minimal data
        let refresh_claims = Claims {
            sub: user.id.to_string(),
            name: None,
            email: None,
            roles: vec![],
            permissions: vec![],
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: refresh_exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
            scope: Some("refresh".to_string()),
        };

        let key = EncodingKey::from_secret(self.config.jwt_secret.as_bytes());
        let access_token = encode(&Header::new(Algorithm::HS256), &access_claims, &key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))?;
        let refresh_token = encode(&Header::new(Algorithm::HS256), &refresh_claims, &key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
            refresh_expires_in: self.config.refresh_token_expiration.as_secs() as i64,
        })
    }

    /// Validate a JWT and extract its claims
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.clone()]);
        validation.set_audience(&[self.config.jwt_audience.clone()]);

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

    /// Exchange a refresh token for a new pair
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.validate_token(refresh_token).await?;
        if claims.scope.as_deref() != Some("refresh") {
            return Err(AuthError::InvalidToken);
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let user = user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }

        // The old refresh token stays valid only until its jti is revoked
        self.blacklist(&claims.jti, claims.exp).await;

        self.generate_token(&user).await
    }

    /// Revoke a token (adds its jti to the blacklist)
    pub async fn revoke_token(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.validate_token(token).await?;
        self.blacklist(&claims.jti, claims.exp).await;
        Ok(())
    }

    async fn blacklist(&self, jti: &str, exp: i64) {
        let expiry = DateTime::<Utc>::from_timestamp(exp, 0).unwrap_or_else(Utc::now);
        let mut blacklist = self.blacklisted_tokens.write().await;
        let now = Utc::now();
        blacklist.retain(|t| t.expiry > now);
        blacklist.push(BlacklistedToken {
            jti: jti.to_string(),
            expiry,
        });
    }

    async fn is_token_blacklisted(&self, token_id: &str) -> bool {
        let blacklist = self.blacklisted_tokens.read().await;
        blacklist.iter().any(|t| t.jti == token_id)
    }

    /// Mint and persist a fresh activation token for a user, returning the
    /// cleartext.
    pub async fn issue_activation_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        let token_bytes: Vec<u8> = thread_rng().sample_iter(&Alphanumeric).take(32).collect();
        let token = String::from_utf8(token_bytes)
            .map_err(|_| AuthError::InternalError("token generation failed".to_string()))?;

        let record = activation_token::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            token_digest: Set(digest_token(&token)),
            expires_at: Set(Utc::now() + self.config.activation_token_ttl),
            consumed: Set(false),
            created_at: Set(Utc::now()),
        };
        record
            .insert(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(token)
    }
}

/// Opaque account reference used in activation links
pub fn activation_uid(user_id: Uuid) -> String {
    BASE64.encode(user_id.to_string())
}

fn decode_activation_uid(uid: &str) -> Result<Uuid, AuthError> {
    let bytes = BASE64
        .decode(uid)
        .map_err(|_| AuthError::InvalidActivationToken)?;
    let raw = String::from_utf8(bytes).map_err(|_| AuthError::InvalidActivationToken)?;
    Uuid::parse_str(&raw).map_err(|_| AuthError::InvalidActivationToken)
}

fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    use argon2::password_hash::{rand_core::OsRng, SaltString};
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::InternalError(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::password_hash::PasswordHash;
    use argon2::{Argon2, PasswordVerifier};

    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn roles_for(user: &user::Model) -> Vec<String> {
    if user.is_staff {
        vec![
            consts::STAFF_ROLE.to_string(),
            consts::CUSTOMER_ROLE.to_string(),
        ]
    } else {
        vec![consts::CUSTOMER_ROLE.to_string()]
    }
}

fn permissions_for(user: &user::Model) -> Vec<String> {
    if user.is_staff {
        vec![
            consts::CATALOG_MANAGE.to_string(),
            consts::REPORTS_VIEW.to_string(),
            consts::PAYMENTS_MANAGE.to_string(),
        ]
    } else {
        vec![]
    }
}

/// Token pair response
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

/// Login credentials
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Registration request
#[derive(Debug, Serialize, Deserialize, Validate, utoipa::ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Public view of a user account
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub is_staff: bool,
    pub is_active: bool,
}

impl From<user::Model> for UserResponse {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            is_staff: user.is_staff,
            is_active: user.is_active,
        }
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is not active")]
    AccountInactive,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Invalid or expired activation token")]
    InvalidActivationToken,

    #[error("Email address is already registered")]
    EmailTaken,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            Self::AccountInactive => (
                StatusCode::UNAUTHORIZED,
                "AUTH_ACCOUNT_INACTIVE",
                "Account has not been activated".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::RevokedToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REVOKED_TOKEN",
                "Authentication token has been revoked".to_string(),
            ),
            Self::TokenCreation(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                msg.clone(),
            ),
            Self::InvalidActivationToken => (
                StatusCode::BAD_REQUEST,
                "AUTH_INVALID_ACTIVATION_TOKEN",
                "Invalid or expired activation token".to_string(),
            ),
            Self::EmailTaken => (
                StatusCode::CONFLICT,
                "AUTH_EMAIL_TAKEN",
                "Email address is already registered".to_string(),
            ),
            Self::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "AUTH_INVALID_INPUT", msg.clone()),
            Self::UserNotFound => (
                StatusCode::NOT_FOUND,
                "AUTH_USER_NOT_FOUND",
                "User not found".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_DATABASE_ERROR",
                msg.clone(),
            ),
            Self::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                msg.clone(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

/// Permission middleware: staff bypass, otherwise the required permission
/// must be present in the token.
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = match request.extensions().get::<AuthUser>() {
        Some(user) => user.clone(),
        None => return Err(AuthError::MissingAuth),
    };

    if user.is_staff() || user.has_permission(&required_permission) {
        return Ok(next.run(request).await);
    }

    Err(AuthError::InsufficientPermissions)
}

/// Authentication middleware that validates the bearer token and stores the
/// resulting `AuthUser` in request extensions.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let headers = request.headers().clone();

    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    match extract_auth_from_headers(&headers, &auth_service).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extract authentication info from request headers
async fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Err(AuthError::MissingAuth);
    };
    let auth_value = auth_header.to_str().map_err(|_| AuthError::InvalidToken)?;
    if !auth_value.starts_with("Bearer ") {
        return Err(AuthError::MissingAuth);
    }

    let token = auth_value.trim_start_matches("Bearer ").trim();
    let claims = auth_service.validate_token(token).await?;
    if claims.scope.as_deref() == Some("refresh") {
        // Refresh tokens cannot be used to call the API
        return Err(AuthError::InvalidToken);
    }

    debug!("Authenticated request for user {}", claims.sub);
    Ok(AuthUser {
        user_id: Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?,
        name: claims.name,
        email: claims.email,
        roles: claims.roles,
        permissions: claims.permissions,
        token_id: claims.jti,
    })
}

/// Authentication routes
pub fn auth_routes() -> axum::Router<Arc<AuthService>> {
    use axum::extract::DefaultBodyLimit;

    let me = axum::Router::new()
        .route("/me", axum::routing::get(me_handler))
        .route("/logout", axum::routing::post(logout_handler))
        .layer(axum::middleware::from_fn(auth_middleware));

    axum::Router::new()
        .route("/register", axum::routing::post(register_handler))
        .route("/login", axum::routing::post(login_handler))
        .route("/refresh", axum::routing::post(refresh_token_handler))
        .merge(me)
        .layer(DefaultBodyLimit::max(1024 * 64))
}

/// Register handler. The activation link is logged because there is no
/// outbound mailer in this service.
pub async fn register_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AuthError> {
    let registered = auth_service.register(request).await?;

    info!(
        user_id = %registered.user.id,
        "Activation link issued: /activate/{}/{}",
        registered.activation_uid,
        registered.activation_token
    );

    Ok((StatusCode::CREATED, Json(registered.user.into())))
}

/// Login handler
pub async fn login_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(credentials): Json<LoginCredentials>,
) -> Result<Json<TokenPair>, AuthError> {
    let token_pair = auth_service.login(credentials).await?;
    Ok(Json(token_pair))
}

/// Refresh token handler
pub async fn refresh_token_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(refresh_request): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let token_pair = auth_service
        .refresh_token(&refresh_request.refresh_token)
        .await?;
    Ok(Json(token_pair))
}

/// Current-user handler
async fn me_handler(
    State(auth_service): State<Arc<AuthService>>,
    auth_user: AuthUser,
) -> Result<Json<UserResponse>, AuthError> {
    let user = user::Entity::find_by_id(auth_user.user_id)
        .one(&*auth_service.db)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or(AuthError::UserNotFound)?;
    Ok(Json(user.into()))
}

/// Logout handler: revokes the presented access token
async fn logout_handler(
    State(auth_service): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AuthError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_value) = auth_header.to_str() {
            if auth_value.starts_with("Bearer ") {
                let token = auth_value.trim_start_matches("Bearer ").trim();
                auth_service.revoke_token(token).await?;
                return Ok(Json(
                    serde_json::json!({ "message": "Successfully logged out" }),
                ));
            }
        }
    }

    Err(AuthError::MissingAuth)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_uid_round_trips() {
        let id = Uuid::new_v4();
        let uid = activation_uid(id);
        assert_eq!(decode_activation_uid(&uid).unwrap(), id);
    }

    #[test]
    fn malformed_uid_is_rejected() {
        assert!(matches!(
            decode_activation_uid("%%%not-base64%%%"),
            Err(AuthError::InvalidActivationToken)
        ));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn staff_users_carry_catalog_permissions() {
        let user = user::Model {
            id: Uuid::new_v4(),
            name: "Ops".into(),
            email: "ops@example.com".into(),
            password_hash: String::new(),
            is_staff: true,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(roles_for(&user).contains(&consts::STAFF_ROLE.to_string()));
        assert!(permissions_for(&user).contains(&consts::CATALOG_MANAGE.to_string()));
    }
}
