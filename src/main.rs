use std::sync::Arc;

use parcel_tracker::config::{self, LogFormat};
use parcel_tracker::error::AppError;
use parcel_tracker::{api, state};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = config::Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Compact => subscriber.compact().init(),
        LogFormat::Json => subscriber.json().init(),
    }

    let app_state = state::AppState::initialize(&config).await?;
    tracing::info!(
        database = %config.database_url,
        upload_dir = %config.upload_dir.display(),
        "storage ready"
    );

    let app = api::rest::router(Arc::new(app_state));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
