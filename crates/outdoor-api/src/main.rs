//! Outdoor API Service
//!
//! REST backend for outdoor displays, advertisements and playback lookup

use anyhow::{Context, Result};
use outdoor_api::{create_router, AppState, Config, MediaStore, Storage, TokenIssuer};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "outdoor_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Outdoor API Service");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .ensure_directories()
        .context("Failed to create upload directory")?;

    info!("Redis URL: {}", config.redis_url);
    info!("Upload directory: {}", config.upload_dir.display());

    // Initialize storage
    let storage = Storage::new(&config.redis_url)
        .await
        .context("Failed to initialize storage")?;

    // Create application state
    let state = AppState {
        storage: Mutex::new(storage),
        media: MediaStore::new(config.upload_dir.clone()),
        tokens: TokenIssuer::new(&config.jwt_secret),
    };

    // Create router
    let app = create_router(state);

    // Bind and serve
    let listener = TcpListener::bind(&config.api_address())
        .await
        .with_context(|| format!("Failed to bind to {}", config.api_address()))?;

    info!("Outdoor API Service running on http://{}", config.api_address());

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
