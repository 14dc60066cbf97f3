//! Advertisement upload, management and media fetch handlers

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use outdoor_common::{Ad, Error, MediaKind, Outdoor, UserProfile};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::{AdminUser, AuthUser};
use crate::handlers::auth::MessageResponse;
use crate::handlers::ApiError;
use crate::policy;
use crate::AppState;

/// Ad with its owner and linked outdoors resolved, for admin listings
#[derive(Debug, Serialize)]
pub struct AdDetails {
    pub ad: Ad,
    pub owner: Option<UserProfile>,
    pub outdoors: Vec<Outdoor>,
}

/// Multipart fields collected from an upload request
#[derive(Default)]
struct UploadForm {
    title: Option<String>,
    kind: Option<String>,
    duration: Option<String>,
    file: Option<(Vec<u8>, String, Option<String>)>,
}

/// Validated metadata for a new ad
#[derive(Debug)]
struct AdFields {
    title: String,
    kind: MediaKind,
    duration_secs: u32,
}

/// Validate the declared fields against each other and the uploaded MIME.
///
/// Pure so the rules stay testable without a running server.
fn validate_ad_fields(
    title: Option<String>,
    kind: Option<String>,
    duration: Option<String>,
    mime: &str,
) -> Result<AdFields, Error> {
    let title = title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| Error::Validation("title, kind and duration are required".to_string()))?;

    let kind = match kind.as_deref() {
        Some("image") => MediaKind::Image,
        Some("video") => MediaKind::Video,
        Some(other) => {
            return Err(Error::Validation(format!(
                "kind must be \"image\" or \"video\", got \"{}\"",
                other
            )))
        }
        None => {
            return Err(Error::Validation(
                "title, kind and duration are required".to_string(),
            ))
        }
    };

    if !kind.matches_mime(mime) {
        return Err(Error::Validation(format!(
            "declared kind does not match the uploaded file type ({})",
            mime
        )));
    }

    let duration_secs = duration
        .ok_or_else(|| Error::Validation("title, kind and duration are required".to_string()))?
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| Error::Validation("duration must be a positive integer".to_string()))?;

    Ok(AdFields {
        title,
        kind,
        duration_secs,
    })
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, Error> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("malformed multipart request: {}", e)))?
    {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("title") => form.title = Some(field.text().await.map_err(multipart_err)?),
            Some("kind") => form.kind = Some(field.text().await.map_err(multipart_err)?),
            Some("duration") => form.duration = Some(field.text().await.map_err(multipart_err)?),
            Some("file") => {
                let mime = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let original_name = field.file_name().map(|n| n.to_string());
                let data = field.bytes().await.map_err(multipart_err)?;
                form.file = Some((data.to_vec(), mime, original_name));
            }
            _ => {}
        }
    }

    Ok(form)
}

fn multipart_err(e: axum::extract::multipart::MultipartError) -> Error {
    Error::Validation(format!("malformed multipart request: {}", e))
}

/// Create an ad from a multipart upload.
///
/// The file is written to the media store first; if any later validation or
/// persistence step fails, it is deleted again before the error response,
/// so failed uploads never leave orphaned files behind.
pub async fn create_ad_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_upload_form(multipart).await?;

    let (data, mime, original_name) = form
        .file
        .ok_or_else(|| Error::Validation("no file was uploaded".to_string()))?;

    // Rejects unsupported types and oversized payloads before writing.
    let filename = state
        .media
        .store(&data, &mime, original_name.as_deref())
        .await?;

    let stored = async {
        let fields = validate_ad_fields(form.title, form.kind, form.duration, &mime)?;

        let ad = Ad::new(
            fields.title,
            fields.kind,
            filename.clone(),
            fields.duration_secs,
            user.id.clone(),
        );
        state.storage.lock().await.create_ad(&ad).await?;
        Ok::<Ad, Error>(ad)
    }
    .await;

    match stored {
        Ok(ad) => {
            info!("Created ad {} for user {}", ad.id, user.id);
            Ok((StatusCode::CREATED, Json(ad)))
        }
        Err(e) => {
            // Clean up the already-written file before reporting the error.
            let _ = state.media.delete(&filename).await;
            Err(e.into())
        }
    }
}

/// List the caller's ads
pub async fn list_my_ads_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Ad>>, ApiError> {
    let ads = state.storage.lock().await.list_ads_by_owner(&user.id).await?;
    Ok(Json(ads))
}

/// List every ad with owner and outdoors resolved (admin only)
pub async fn list_all_ads_handler(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<AdDetails>>, ApiError> {
    let mut storage = state.storage.lock().await;
    let ads = storage.list_all_ads().await?;

    let mut details = Vec::with_capacity(ads.len());
    for ad in ads {
        let owner = storage
            .get_user(&ad.owner_id)
            .await?
            .as_ref()
            .map(UserProfile::from);

        let mut outdoors = Vec::with_capacity(ad.outdoor_ids.len());
        for outdoor_id in &ad.outdoor_ids {
            if let Some(outdoor) = storage.get_outdoor(outdoor_id).await? {
                outdoors.push(outdoor);
            }
        }

        details.push(AdDetails { ad, owner, outdoors });
    }

    Ok(Json(details))
}

/// Delete one of the caller's ads along with its stored file
pub async fn delete_ad_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut storage = state.storage.lock().await;
    let ad = storage.get_ad_owned(&id, &user.id).await?;

    storage.delete_ad(&ad).await?;
    drop(storage);

    state.media.delete(&ad.file).await?;

    Ok(Json(MessageResponse {
        message: "Ad deleted successfully".to_string(),
    }))
}

/// Link an ad to an outdoor (mirror of the outdoor-side route)
pub async fn link_outdoor_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((id, outdoor_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut storage = state.storage.lock().await;

    let mut ad = storage
        .get_ad(&id)
        .await?
        .ok_or_else(|| Error::NotFound("ad or outdoor not found".to_string()))?;
    let mut outdoor = storage
        .get_outdoor(&outdoor_id)
        .await?
        .ok_or_else(|| Error::NotFound("ad or outdoor not found".to_string()))?;

    policy::ensure_owner_or_admin(&user, &ad.owner_id)?;
    policy::ensure_owner_or_admin(&user, &outdoor.owner_id)?;

    storage.link_ad(&mut outdoor, &mut ad).await?;

    Ok(Json(MessageResponse {
        message: "Ad linked successfully".to_string(),
    }))
}

/// Unlink an ad from an outdoor (mirror of the outdoor-side route)
pub async fn unlink_outdoor_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path((id, outdoor_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut storage = state.storage.lock().await;

    let mut ad = storage
        .get_ad(&id)
        .await?
        .ok_or_else(|| Error::NotFound("ad or outdoor not found".to_string()))?;
    let mut outdoor = storage
        .get_outdoor(&outdoor_id)
        .await?
        .ok_or_else(|| Error::NotFound("ad or outdoor not found".to_string()))?;

    policy::ensure_owner_or_admin(&user, &ad.owner_id)?;
    policy::ensure_owner_or_admin(&user, &outdoor.owner_id)?;

    storage.unlink_ad(&mut outdoor, &mut ad).await?;

    Ok(Json(MessageResponse {
        message: "Ad unlinked successfully".to_string(),
    }))
}

/// Serve a stored media file by its reference; no authentication,
/// playback clients fetch media through this route.
pub async fn get_file_handler(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let (data, content_type) = state.media.retrieve(&filename).await?;

    let response = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(data))
        .map_err(|e| Error::Other(anyhow::anyhow!("failed to build response: {}", e)))?;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_valid_image_upload_fields() {
        let fields =
            validate_ad_fields(some("Sale"), some("image"), some("15"), "image/png").unwrap();
        assert_eq!(fields.title, "Sale");
        assert_eq!(fields.kind, MediaKind::Image);
        assert_eq!(fields.duration_secs, 15);
    }

    #[test]
    fn test_missing_fields_rejected() {
        let err = validate_ad_fields(None, some("image"), some("15"), "image/png").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = validate_ad_fields(some("Sale"), None, some("15"), "image/png").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = validate_ad_fields(some("Sale"), some("image"), None, "image/png").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_kind_mime_mismatch_rejected() {
        // Declared video, but the file is an image.
        let err = validate_ad_fields(some("Sale"), some("video"), some("15"), "image/png")
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = validate_ad_fields(some("Sale"), some("image"), some("15"), "video/mp4")
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_invalid_duration_rejected() {
        for bad in ["0", "-3", "abc", "1.5"] {
            let err = validate_ad_fields(some("Sale"), some("image"), some(bad), "image/png")
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "duration {:?}", bad);
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = validate_ad_fields(some("Sale"), some("audio"), some("15"), "image/png")
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
