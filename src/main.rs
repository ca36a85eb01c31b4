use qr_logo::{ Config, Result };
use std::sync::Arc;
use tracing_subscriber::{ layer::SubscriberExt, util::SubscriberInitExt };

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber
        ::registry()
        .with(
            tracing_subscriber::EnvFilter
                ::try_from_default_env()
                .unwrap_or_else(|_| "qr_logo=debug,tower_http=debug".into())
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| qr_logo::AppError::Config(e.to_string()))?;

    tracing::info!(
        "Starting qr-logo (box size {}, border {}, upload limit {} bytes)",
        config.box_size,
        config.border,
        config.max_upload_bytes
    );
    if config.cors_allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS is empty; the API only accepts same-origin requests");
    }

    let config = Arc::new(config);
    let qr_service = Arc::new(qr_logo::services::QrService::new(&config));

    let app_state = qr_logo::api::AppState::new(config.clone(), qr_service);
    let app = qr_logo::api::router(app_state)?;

    // Start server
    let addr = config.bind_addr();
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener
        ::bind(&addr).await
        .map_err(|e| qr_logo::AppError::Internal(e.to_string()))?;

    axum::serve(listener, app).await.map_err(|e| qr_logo::AppError::Internal(e.to_string()))?;

    Ok(())
}
