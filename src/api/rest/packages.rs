use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::engine::packages;
use crate::error::AppError;
use crate::models::location::GeoPoint;
use crate::models::package::NewPackage;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/packages/create", post(create_package))
}

#[derive(Deserialize)]
pub struct CreatePackageParams {
    pub tracking: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    pub agent_username: String,
}

#[derive(Serialize)]
pub struct PackageCreatedResponse {
    pub msg: &'static str,
    pub id: i64,
}

async fn create_package(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CreatePackageParams>,
) -> Result<Json<PackageCreatedResponse>, AppError> {
    let package = packages::create_package(
        &state,
        NewPackage {
            tracking_number: params.tracking,
            destination_address: params.address,
            destination: GeoPoint::new(params.lat, params.lng)?,
            agent_username: params.agent_username,
        },
    )
    .await?;

    Ok(Json(PackageCreatedResponse {
        msg: "package assigned",
        id: package.id,
    }))
}
