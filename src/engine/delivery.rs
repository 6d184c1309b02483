use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::db;
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::location::GeoPoint;
use crate::models::package::{DeliveryProof, PackageStatus};
use crate::models::user::User;
use crate::state::AppState;

/// What an agent submits at the door.
#[derive(Debug, Clone)]
pub struct Confirmation {
    pub photo: Vec<u8>,
    pub filename_hint: Option<String>,
    pub location: GeoPoint,
}

#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    pub delivered_at: DateTime<Utc>,
    pub proof_photo_url: String,
    pub distance_from_destination_km: f64,
}

pub async fn confirm_delivery(
    state: &AppState,
    agent: &User,
    package_id: i64,
    confirmation: Confirmation,
) -> Result<DeliveryReceipt, AppError> {
    let start = Instant::now();
    let result = confirm(state, agent, package_id, confirmation).await;

    let outcome = match &result {
        Ok(_) => "confirmed",
        Err(AppError::NotFound(_)) => "not_found",
        Err(AppError::AlreadyDelivered) => "already_delivered",
        Err(_) => "error",
    };
    state
        .metrics
        .delivery_confirmation_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .deliveries_total
        .with_label_values(&[outcome])
        .inc();

    result
}

async fn confirm(
    state: &AppState,
    agent: &User,
    package_id: i64,
    confirmation: Confirmation,
) -> Result<DeliveryReceipt, AppError> {
    let package = db::packages::find_owned(&state.db, package_id, agent.id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("package not found or not assigned to this agent".to_string())
        })?;

    if package.status == PackageStatus::Delivered {
        return Err(AppError::AlreadyDelivered);
    }

    if confirmation.photo.is_empty() {
        return Err(AppError::BadRequest("photo file is empty".to_string()));
    }

    let delivered_at = Utc::now();
    let mut tx = state.db.begin().await?;

    let photo = state
        .photos
        .save(
            &package.tracking_number,
            confirmation.filename_hint.as_deref(),
            &confirmation.photo,
            delivered_at,
        )
        .await?;

    let proof = DeliveryProof {
        photo_url: photo.url.clone(),
        location: confirmation.location,
        delivered_at,
    };

    // The row only commits once the photo is on disk; every failure path
    // below removes the photo again.
    match db::packages::mark_delivered(&mut tx, package.id, agent.id, &proof).await {
        Ok(true) => {}
        Ok(false) => {
            drop(tx);
            state.photos.remove(&photo).await;
            warn!(package_id, agent_id = agent.id, "lost race to confirm delivery");
            return Err(AppError::AlreadyDelivered);
        }
        Err(err) => {
            drop(tx);
            state.photos.remove(&photo).await;
            return Err(err);
        }
    }

    if let Err(err) = tx.commit().await {
        state.photos.remove(&photo).await;
        error!(package_id, error = %err, "failed to commit delivery");
        return Err(err.into());
    }

    let distance_from_destination_km = haversine_km(&package.destination, &proof.location);
    info!(
        package_id,
        tracking_number = %package.tracking_number,
        agent_id = agent.id,
        distance_km = distance_from_destination_km,
        "delivery confirmed"
    );

    Ok(DeliveryReceipt {
        delivered_at,
        proof_photo_url: proof.photo_url,
        distance_from_destination_km,
    })
}
