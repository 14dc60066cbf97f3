//! Outdoor API Service
//!
//! REST backend for managing outdoor (billboard) displays and advertisement
//! content: user accounts, ad upload and linking, and unauthenticated lookup
//! of a display's active ads by public code.
//!
//! ## Endpoints
//!
//! - `POST /api/auth/register`, `POST /api/auth/login` - account + token
//! - `GET /api/auth/me` - caller's profile
//! - `POST /api/auth/recover-password`, `POST /api/auth/reset-password`
//! - `GET|PUT|DELETE /api/clientes/...` - account management
//! - `POST /api/outdoors`, `GET /api/outdoors/meus|todos` - displays
//! - `GET|PUT|DELETE /api/outdoors/{id}` - one display
//! - `POST|DELETE /api/outdoors/{id}/anuncios/{ad_id}` - link/unlink
//! - `GET /api/outdoors/publico/{codigo}[/anuncios]` - public playback
//! - `POST /api/anuncios` (multipart), `GET /api/anuncios/meus|todos`
//! - `DELETE /api/anuncios/{id}` - delete ad and stored file
//! - `GET /api/anuncios/arquivo/{filename}` - stored media
//! - `GET /health` - health check

pub mod auth;
pub mod config;
pub mod handlers;
pub mod media;
pub mod policy;
pub mod storage;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use auth::TokenIssuer;
pub use config::Config;
pub use media::MediaStore;
pub use storage::Storage;

/// Shared application state, constructed once at startup
pub struct AppState {
    pub storage: Mutex<Storage>,
    pub media: MediaStore,
    pub tokens: TokenIssuer,
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        // Accounts and sessions
        .route("/api/auth/register", post(handlers::auth::register_handler))
        .route("/api/auth/login", post(handlers::auth::login_handler))
        .route("/api/auth/me", get(handlers::auth::me_handler))
        .route(
            "/api/auth/recover-password",
            post(handlers::auth::recover_password_handler),
        )
        .route(
            "/api/auth/reset-password",
            post(handlers::auth::reset_password_handler),
        )
        // Client administration
        .route("/api/clientes", get(handlers::clients::list_clients_handler))
        .route(
            "/api/clientes/{id}",
            get(handlers::clients::get_client_handler)
                .put(handlers::clients::update_client_handler)
                .delete(handlers::clients::delete_client_handler),
        )
        // Outdoors
        .route("/api/outdoors", post(handlers::outdoors::create_outdoor_handler))
        .route(
            "/api/outdoors/meus",
            get(handlers::outdoors::list_my_outdoors_handler),
        )
        .route(
            "/api/outdoors/todos",
            get(handlers::outdoors::list_all_outdoors_handler),
        )
        .route(
            "/api/outdoors/publico/{codigo}",
            get(handlers::outdoors::public_outdoor_handler),
        )
        .route(
            "/api/outdoors/publico/{codigo}/anuncios",
            get(handlers::outdoors::public_ads_handler),
        )
        .route(
            "/api/outdoors/{id}",
            get(handlers::outdoors::get_outdoor_handler)
                .put(handlers::outdoors::update_outdoor_handler)
                .delete(handlers::outdoors::delete_outdoor_handler),
        )
        .route(
            "/api/outdoors/{id}/anuncios",
            get(handlers::outdoors::list_outdoor_ads_handler),
        )
        .route(
            "/api/outdoors/{id}/anuncios/{ad_id}",
            post(handlers::outdoors::link_ad_handler)
                .delete(handlers::outdoors::unlink_ad_handler),
        )
        // Ads
        .route("/api/anuncios", post(handlers::ads::create_ad_handler))
        .route("/api/anuncios/meus", get(handlers::ads::list_my_ads_handler))
        .route("/api/anuncios/todos", get(handlers::ads::list_all_ads_handler))
        .route(
            "/api/anuncios/arquivo/{filename}",
            get(handlers::ads::get_file_handler),
        )
        .route("/api/anuncios/{id}", delete(handlers::ads::delete_ad_handler))
        .route(
            "/api/anuncios/{id}/outdoor/{outdoor_id}",
            post(handlers::ads::link_outdoor_handler)
                .delete(handlers::ads::unlink_outdoor_handler),
        )
        .with_state(shared_state)
        // Leave headroom over the media cap for the other multipart fields.
        .layer(DefaultBodyLimit::max(media::MAX_UPLOAD_BYTES + 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
