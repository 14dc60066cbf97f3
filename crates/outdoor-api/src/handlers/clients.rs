//! Customer account management handlers (admin plus self-service)

use axum::extract::{Path, State};
use axum::Json;
use outdoor_common::{Error, Role, UserProfile};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::{AdminUser, AuthUser};
use crate::handlers::auth::MessageResponse;
use crate::handlers::ApiError;
use crate::policy;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// List customer accounts, newest first (admin only)
pub async fn list_clients_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let users = state.storage.lock().await.list_users().await?;

    let mut clients: Vec<UserProfile> = users
        .iter()
        .filter(|u| u.role == Role::Customer)
        .map(UserProfile::from)
        .collect();
    clients.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(clients))
}

/// Fetch one account; allowed for the account itself or an admin
pub async fn get_client_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    policy::ensure_owner_or_admin(&caller, &id)?;

    let user = state
        .storage
        .lock()
        .await
        .get_user(&id)
        .await?
        .ok_or_else(|| Error::NotFound("client not found".to_string()))?;

    Ok(Json(UserProfile::from(&user)))
}

/// Update name and/or email; allowed for the account itself or an admin
pub async fn update_client_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateClientRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    policy::ensure_owner_or_admin(&caller, &id)?;

    let mut storage = state.storage.lock().await;
    let mut user = storage
        .get_user(&id)
        .await?
        .ok_or_else(|| Error::NotFound("client not found".to_string()))?;

    let previous_email = user.email.clone();

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(Error::Validation("name must not be empty".to_string()).into());
        }
        user.name = name;
    }
    if let Some(email) = payload.email {
        if email.trim().is_empty() {
            return Err(Error::Validation("email must not be empty".to_string()).into());
        }
        user.email = email;
    }

    if user.email != previous_email {
        storage.update_user_email(&user, &previous_email).await?;
    } else {
        storage.put_user(&user).await?;
    }

    info!("Updated client {}", user.id);
    Ok(Json(UserProfile::from(&user)))
}

/// Delete an account (admin only)
pub async fn delete_client_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut storage = state.storage.lock().await;
    let user = storage
        .get_user(&id)
        .await?
        .ok_or_else(|| Error::NotFound("client not found".to_string()))?;

    storage.delete_user(&user).await?;

    Ok(Json(MessageResponse {
        message: "Client removed successfully".to_string(),
    }))
}
