//! Account registration, login and password recovery handlers

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use outdoor_common::{Error, User, UserProfile};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{hash_password, verify_password, AuthUser, TokenPurpose};
use crate::handlers::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// User plus a fresh session token
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: UserProfile,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct RecoverPasswordRequest {
    pub email: String,
}

/// Always the same message whether the email exists or not; the token is
/// only present when it does. There is no mail delivery in this service.
#[derive(Debug, Serialize)]
pub struct RecoverPasswordResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Create an account and return it with a session token
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.name.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
    {
        return Err(Error::Validation("name, email and password are required".to_string()).into());
    }

    let password_hash = hash_password(&payload.password)?;
    let user = User::new(payload.name, payload.email, password_hash);

    state.storage.lock().await.create_user(&user).await?;
    info!("Registered user {}", user.email);

    let token = state.tokens.issue_session(&user.id)?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user: UserProfile::from(&user),
            token,
        }),
    ))
}

/// Verify credentials and return the user with a session token.
///
/// Unknown email and wrong password produce the same response so the
/// endpoint does not leak which one failed.
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(Error::Validation("email and password are required".to_string()).into());
    }

    let user = state
        .storage
        .lock()
        .await
        .get_user_by_email(&payload.email)
        .await?
        .ok_or(Error::InvalidCredentials)?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(Error::InvalidCredentials.into());
    }

    info!("User {} logged in", user.email);
    let token = state.tokens.issue_session(&user.id)?;

    Ok(Json(SessionResponse {
        user: UserProfile::from(&user),
        token,
    }))
}

/// Return the caller's own profile
pub async fn me_handler(AuthUser(user): AuthUser) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        user: UserProfile::from(&user),
    })
}

/// Issue a short-lived reset token for an account
pub async fn recover_password_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RecoverPasswordRequest>,
) -> Result<Json<RecoverPasswordResponse>, ApiError> {
    if payload.email.trim().is_empty() {
        return Err(Error::Validation("email is required".to_string()).into());
    }

    let user = state
        .storage
        .lock()
        .await
        .get_user_by_email(&payload.email)
        .await?;

    let token = match user {
        Some(user) => Some(state.tokens.issue_reset(&user.id)?),
        None => None,
    };

    Ok(Json(RecoverPasswordResponse {
        message: "If the email exists, you will receive password recovery instructions."
            .to_string(),
        token,
    }))
}

/// Consume a reset token and set a new password
pub async fn reset_password_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.token.is_empty() || payload.new_password.is_empty() {
        return Err(Error::Validation("token and new password are required".to_string()).into());
    }

    let user_id = state.tokens.verify(&payload.token, TokenPurpose::Reset)?;

    let mut storage = state.storage.lock().await;
    let mut user = storage
        .get_user(&user_id)
        .await?
        .ok_or(Error::TokenInvalid)?;

    user.password_hash = hash_password(&payload.new_password)?;
    storage.put_user(&user).await?;

    info!("Password reset for user {}", user.id);
    Ok(Json(MessageResponse {
        message: "Password updated successfully".to_string(),
    }))
}
