use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::CurrentAgent;
use crate::engine::delivery::{self, Confirmation};
use crate::engine::packages;
use crate::error::AppError;
use crate::models::location::GeoPoint;
use crate::models::package::PackageSummary;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/deliveries/assigned", get(list_assigned))
        .route("/deliveries/:package_id/confirm", post(confirm_delivery))
}

#[derive(Serialize)]
pub struct ConfirmResponse {
    pub msg: &'static str,
    pub timestamp: DateTime<Utc>,
    pub proof_photo_url: String,
    pub distance_from_destination_km: f64,
}

async fn list_assigned(
    State(state): State<Arc<AppState>>,
    CurrentAgent(agent): CurrentAgent,
) -> Result<Json<Vec<PackageSummary>>, AppError> {
    let assigned = packages::list_assigned(&state, &agent)
        .await?
        .into_iter()
        .map(PackageSummary::from)
        .collect();

    Ok(Json(assigned))
}

async fn confirm_delivery(
    State(state): State<Arc<AppState>>,
    CurrentAgent(agent): CurrentAgent,
    Path(package_id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<ConfirmResponse>, AppError> {
    let confirmation = read_confirmation(multipart).await?;
    let receipt = delivery::confirm_delivery(&state, &agent, package_id, confirmation).await?;

    Ok(Json(ConfirmResponse {
        msg: "delivery recorded",
        timestamp: receipt.delivered_at,
        proof_photo_url: receipt.proof_photo_url,
        distance_from_destination_km: receipt.distance_from_destination_km,
    }))
}

/// Expects a `file` part plus `lat` and `lng` text parts; unknown parts are skipped.
async fn read_confirmation(mut multipart: Multipart) -> Result<Confirmation, AppError> {
    let mut photo = None;
    let mut filename_hint = None;
    let mut lat = None;
    let mut lng = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                filename_hint = field.file_name().map(str::to_string);
                photo = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
            }
            Some("lat") => {
                let raw = field.text().await.map_err(multipart_error)?;
                lat = Some(parse_coordinate("lat", &raw)?);
            }
            Some("lng") => {
                let raw = field.text().await.map_err(multipart_error)?;
                lng = Some(parse_coordinate("lng", &raw)?);
            }
            _ => {}
        }
    }

    let photo = photo.ok_or_else(|| AppError::BadRequest("missing file part".to_string()))?;
    let lat = lat.ok_or_else(|| AppError::BadRequest("missing lat field".to_string()))?;
    let lng = lng.ok_or_else(|| AppError::BadRequest("missing lng field".to_string()))?;

    Ok(Confirmation {
        photo,
        filename_hint,
        location: GeoPoint::new(lat, lng)?,
    })
}

fn parse_coordinate(name: &str, raw: &str) -> Result<f64, AppError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|err| AppError::BadRequest(format!("invalid {name}: {err}")))
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::BadRequest(format!("invalid multipart body: {err}"))
}
