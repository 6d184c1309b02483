pub mod deliveries;
pub mod packages;
pub mod tokens;
pub mod users;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::db;
use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let photos = ServeDir::new(state.photos.root());
    let photo_prefix = state.photos.url_prefix().to_string();

    Router::new()
        .merge(tokens::router())
        .merge(users::router())
        .merge(packages::router())
        .merge(deliveries::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .nest_service(&photo_prefix, photos)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(cors_layer(&state.cors_allow_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin = %origin, error = %err, "ignoring invalid cors origin");
                None
            }
        })
        .collect();

    layer.allow_origin(allowed)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    users: i64,
    pending_packages: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    let counts = db::counts(&state.db).await?;

    Ok(Json(HealthResponse {
        status: "ok",
        users: counts.users,
        pending_packages: counts.pending_packages,
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
