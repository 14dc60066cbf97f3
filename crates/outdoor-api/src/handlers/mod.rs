//! API request handlers

pub mod ads;
pub mod auth;
pub mod clients;
pub mod outdoors;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use outdoor_common::Error;
use tracing::error;

/// Wrapper turning the shared error taxonomy into JSON error responses.
///
/// Needed because `IntoResponse` cannot be implemented for the foreign
/// `outdoor_common::Error` type directly.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_)
        | Error::DuplicateEmail
        | Error::UnsupportedMediaType(_)
        | Error::PayloadTooLarge => StatusCode::BAD_REQUEST,
        Error::InvalidCredentials
        | Error::Unauthorized(_)
        | Error::TokenExpired
        | Error::TokenInvalid => StatusCode::UNAUTHORIZED,
        Error::Forbidden(_) => StatusCode::FORBIDDEN,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Redis(_) | Error::Json(_) | Error::Io(_) | Error::Other(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);

        // Internal details are logged, never sent to the client.
        let message = if status.is_server_error() {
            error!("Internal error: {:#}", self.0);
            "internal server error".to_string()
        } else {
            self.0.to_string()
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "outdoor-api"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::DuplicateEmail), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&Error::TokenExpired), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_for(&Error::Forbidden("x".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_for(&Error::NotFound("x".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&Error::Redis("down".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
