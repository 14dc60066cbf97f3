//! Outdoor management and public playback handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use outdoor_common::{
    Ad, AdStatus, Error, Outdoor, OutdoorKind, OutdoorStatus, UserProfile,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::auth::{AdminUser, AuthUser};
use crate::handlers::auth::MessageResponse;
use crate::handlers::ApiError;
use crate::policy;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOutdoorRequest {
    pub name: String,
    pub location: String,
    pub kind: OutdoorKind,
}

/// Partial update; the public code is immutable and not accepted here
#[derive(Debug, Deserialize)]
pub struct UpdateOutdoorRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub kind: Option<OutdoorKind>,
    pub status: Option<OutdoorStatus>,
}

/// Outdoor with its owner and linked ads resolved, for admin listings
#[derive(Debug, Serialize)]
pub struct OutdoorDetails {
    pub outdoor: Outdoor,
    pub owner: Option<UserProfile>,
    pub ads: Vec<Ad>,
}

/// Create a new outdoor owned by the caller
pub async fn create_outdoor_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(payload): Json<CreateOutdoorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.name.trim().is_empty() || payload.location.trim().is_empty() {
        return Err(Error::Validation("name and location are required".to_string()).into());
    }

    let mut outdoor = Outdoor::new(payload.name, payload.location, payload.kind, user.id);
    state.storage.lock().await.create_outdoor(&mut outdoor).await?;

    Ok((StatusCode::CREATED, Json(outdoor)))
}

/// List the caller's outdoors
pub async fn list_my_outdoors_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Outdoor>>, ApiError> {
    let outdoors = state
        .storage
        .lock()
        .await
        .list_outdoors_by_owner(&user.id)
        .await?;
    Ok(Json(outdoors))
}

/// List every outdoor with owner and ads resolved (admin only)
pub async fn list_all_outdoors_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<OutdoorDetails>>, ApiError> {
    let mut storage = state.storage.lock().await;
    let outdoors = storage.list_all_outdoors().await?;

    let mut details = Vec::with_capacity(outdoors.len());
    for outdoor in outdoors {
        let owner = storage
            .get_user(&outdoor.owner_id)
            .await?
            .as_ref()
            .map(UserProfile::from);
        let ads = storage.collect_ads(&outdoor.ad_ids).await?;
        details.push(OutdoorDetails { outdoor, owner, ads });
    }

    Ok(Json(details))
}

/// Get one of the caller's outdoors
pub async fn get_outdoor_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Outdoor>, ApiError> {
    let outdoor = state
        .storage
        .lock()
        .await
        .get_outdoor_owned(&id, &user.id)
        .await?;
    Ok(Json(outdoor))
}

/// Partially update one of the caller's outdoors
pub async fn update_outdoor_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateOutdoorRequest>,
) -> Result<Json<Outdoor>, ApiError> {
    let mut storage = state.storage.lock().await;
    let mut outdoor = storage.get_outdoor_owned(&id, &user.id).await?;

    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(Error::Validation("name must not be empty".to_string()).into());
        }
        outdoor.name = name;
    }
    if let Some(location) = payload.location {
        if location.trim().is_empty() {
            return Err(Error::Validation("location must not be empty".to_string()).into());
        }
        outdoor.location = location;
    }
    if let Some(kind) = payload.kind {
        outdoor.kind = kind;
    }
    if let Some(status) = payload.status {
        outdoor.status = status;
    }
    outdoor.updated_at = Utc::now();

    storage.put_outdoor(&outdoor).await?;
    info!("Updated outdoor {}", outdoor.id);

    Ok(Json(outdoor))
}

/// Delete one of the caller's outdoors, cleaning up linked ads
pub async fn delete_outdoor_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut storage = state.storage.lock().await;
    let outdoor = storage.get_outdoor_owned(&id, &user.id).await?;

    storage.delete_outdoor(&outdoor).await?;

    Ok(Json(MessageResponse {
        message: "Outdoor deleted successfully".to_string(),
    }))
}

/// List the ads linked to one of the caller's outdoors
pub async fn list_outdoor_ads_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Ad>>, ApiError> {
    let mut storage = state.storage.lock().await;
    let outdoor = storage.get_outdoor_owned(&id, &user.id).await?;
    let ads = storage.collect_ads(&outdoor.ad_ids).await?;
    Ok(Json(ads))
}

/// Link an ad to an outdoor; both sides are updated atomically
pub async fn link_ad_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((id, ad_id)): Path<(String, String)>,
) -> Result<Json<Outdoor>, ApiError> {
    let mut storage = state.storage.lock().await;

    let mut outdoor = storage
        .get_outdoor(&id)
        .await?
        .ok_or_else(|| Error::NotFound("ad or outdoor not found".to_string()))?;
    let mut ad = storage
        .get_ad(&ad_id)
        .await?
        .ok_or_else(|| Error::NotFound("ad or outdoor not found".to_string()))?;

    policy::ensure_owner_or_admin(&user, &outdoor.owner_id)?;
    policy::ensure_owner_or_admin(&user, &ad.owner_id)?;

    storage.link_ad(&mut outdoor, &mut ad).await?;

    Ok(Json(outdoor))
}

/// Unlink an ad from an outdoor; idempotent on both sides
pub async fn unlink_ad_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((id, ad_id)): Path<(String, String)>,
) -> Result<Json<Outdoor>, ApiError> {
    let mut storage = state.storage.lock().await;

    let mut outdoor = storage
        .get_outdoor(&id)
        .await?
        .ok_or_else(|| Error::NotFound("ad or outdoor not found".to_string()))?;
    let mut ad = storage
        .get_ad(&ad_id)
        .await?
        .ok_or_else(|| Error::NotFound("ad or outdoor not found".to_string()))?;

    policy::ensure_owner_or_admin(&user, &outdoor.owner_id)?;
    policy::ensure_owner_or_admin(&user, &ad.owner_id)?;

    storage.unlink_ad(&mut outdoor, &mut ad).await?;

    Ok(Json(outdoor))
}

/// Resolve an outdoor by public code, gating on its status.
///
/// The public playback paths both go through here.
fn require_active(outdoor: Option<Outdoor>) -> Result<Outdoor, Error> {
    let outdoor = outdoor.ok_or_else(|| Error::NotFound("outdoor not found".to_string()))?;

    if outdoor.status != OutdoorStatus::Active {
        return Err(Error::Forbidden("outdoor is not active".to_string()));
    }

    Ok(outdoor)
}

/// Active ads only, ordered by creation time ascending
fn playable_ads(mut ads: Vec<Ad>) -> Vec<Ad> {
    ads.retain(|ad| ad.status == AdStatus::Active);
    ads.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    ads
}

/// Public lookup of an outdoor by code; no authentication
pub async fn public_outdoor_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Outdoor>, ApiError> {
    let outdoor = state.storage.lock().await.get_outdoor_by_code(&code).await?;
    Ok(Json(require_active(outdoor)?))
}

/// Public list of an outdoor's active ads, for playback clients
pub async fn public_ads_handler(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<Vec<Ad>>, ApiError> {
    let mut storage = state.storage.lock().await;

    let outdoor = require_active(storage.get_outdoor_by_code(&code).await?)?;
    let ads = storage.collect_ads(&outdoor.ad_ids).await?;

    Ok(Json(playable_ads(ads)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use outdoor_common::MediaKind;

    fn ad_created_at(title: &str, status: AdStatus, offset_secs: i64) -> Ad {
        let mut ad = Ad::new(
            title.to_string(),
            MediaKind::Image,
            "f.png".to_string(),
            5,
            "owner".to_string(),
        );
        ad.status = status;
        ad.created_at = Utc::now() + Duration::seconds(offset_secs);
        ad
    }

    #[test]
    fn test_playable_ads_filters_and_orders() {
        let ads = vec![
            ad_created_at("third", AdStatus::Active, 30),
            ad_created_at("hidden", AdStatus::Inactive, 10),
            ad_created_at("first", AdStatus::Active, 0),
            ad_created_at("second", AdStatus::Active, 20),
        ];

        let playable = playable_ads(ads);
        let titles: Vec<&str> = playable.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_require_active_gates() {
        assert!(matches!(require_active(None), Err(Error::NotFound(_))));

        let mut outdoor = Outdoor::new(
            "X".to_string(),
            "Y".to_string(),
            OutdoorKind::Led,
            "owner".to_string(),
        );

        outdoor.status = OutdoorStatus::Maintenance;
        assert!(matches!(
            require_active(Some(outdoor.clone())),
            Err(Error::Forbidden(_))
        ));

        outdoor.status = OutdoorStatus::Active;
        assert!(require_active(Some(outdoor)).is_ok());
    }
}
