/// Identity endpoints
///
/// Accounts are keyed by email. Token issuance returns a JWT
/// access/refresh pair; the access token authenticates every other
/// endpoint.
///
/// # Endpoints
///
/// - `POST /v1/users` - Create account
/// - `POST /v1/users/token` - Obtain tokens
/// - `POST /v1/users/token/refresh` - Refresh access token
/// - `GET /v1/users/me` - Own profile
/// - `PATCH /v1/users/me` - Update own profile

use crate::{
    app::{AppState, CurrentUser},
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use curio_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, UpdateUser, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Create account request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 5, message = "Password must be at least 5 characters"))]
    pub password: String,

    /// Optional display name
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,
}

/// Public user representation
///
/// Never includes the password hash.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User ID
    pub id: i64,

    /// Email address
    pub email: String,

    /// Display name
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

/// Token request
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Token response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// User ID
    pub user_id: i64,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Profile update request
///
/// Only present fields are changed.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    /// New display name
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,

    /// New password
    #[validate(length(min = 5, message = "Password must be at least 5 characters"))]
    pub password: Option<String>,
}

/// Create a new account
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email already exists
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    req.validate()?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
            name: req.name.unwrap_or_default(),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Obtain an access/refresh token pair for valid credentials
///
/// Wrong email and wrong password produce the same response, so the
/// endpoint does not reveal whether an account exists.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Invalid credentials or inactive account
pub async fn create_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is inactive".to_string()));
    }

    let access_claims = jwt::Claims::new(user.id, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user.id, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    Ok(Json(TokenResponse {
        user_id: user.id,
        access_token,
        refresh_token,
    }))
}

/// Exchange a refresh token for a new access token
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Retrieve the authenticated user's profile
pub async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<UserResponse>> {
    let user = User::find_by_id(&state.db, current.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}

/// Update the authenticated user's profile
///
/// A new password is re-hashed before storage.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
pub async fn update_me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<UpdateMeRequest>,
) -> ApiResult<Json<UserResponse>> {
    req.validate()?;

    let password_hash = match req.password {
        Some(ref password) => Some(password::hash_password(password)?),
        None => None,
    };

    let user = User::update(
        &state.db,
        current.id,
        UpdateUser {
            name: req.name,
            password_hash,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user.into()))
}
