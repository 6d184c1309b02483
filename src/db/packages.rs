use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::db::is_unique_violation;
use crate::error::AppError;
use crate::models::package::{DeliveryProof, Package, PackageStatus};
use crate::models::location::GeoPoint;

const PACKAGE_COLUMNS: &str = "id, tracking_number, destination_address, dest_lat, dest_lng, \
     status, assigned_agent_id, proof_photo_url, delivery_lat, delivery_lng, delivered_at";

pub async fn insert(
    pool: &SqlitePool,
    tracking_number: &str,
    destination_address: &str,
    destination: GeoPoint,
    agent_id: i64,
) -> Result<Package, AppError> {
    let sql = format!(
        "INSERT INTO packages \
         (tracking_number, destination_address, dest_lat, dest_lng, status, assigned_agent_id) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING {PACKAGE_COLUMNS}"
    );

    sqlx::query_as::<_, Package>(&sql)
        .bind(tracking_number)
        .bind(destination_address)
        .bind(destination.lat)
        .bind(destination.lng)
        .bind(PackageStatus::Pending.as_str())
        .bind(agent_id)
        .fetch_one(pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::Conflict(format!("tracking number {tracking_number} already exists"))
            } else {
                err.into()
            }
        })
}

/// Ownership is part of the lookup: another agent's package is indistinguishable
/// from a missing one.
pub async fn find_owned(
    pool: &SqlitePool,
    package_id: i64,
    agent_id: i64,
) -> Result<Option<Package>, AppError> {
    let sql = format!(
        "SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = ? AND assigned_agent_id = ?"
    );

    let package = sqlx::query_as::<_, Package>(&sql)
        .bind(package_id)
        .bind(agent_id)
        .fetch_optional(pool)
        .await?;

    Ok(package)
}

#[cfg(test)]
pub async fn find_by_id(pool: &SqlitePool, package_id: i64) -> Result<Option<Package>, AppError> {
    let sql = format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = ?");

    let package = sqlx::query_as::<_, Package>(&sql)
        .bind(package_id)
        .fetch_optional(pool)
        .await?;

    Ok(package)
}

pub async fn list_pending_for_agent(
    pool: &SqlitePool,
    agent_id: i64,
) -> Result<Vec<Package>, AppError> {
    let sql = format!(
        "SELECT {PACKAGE_COLUMNS} FROM packages \
         WHERE assigned_agent_id = ? AND status = ? ORDER BY id ASC"
    );

    let packages = sqlx::query_as::<_, Package>(&sql)
        .bind(agent_id)
        .bind(PackageStatus::Pending.as_str())
        .fetch_all(pool)
        .await?;

    Ok(packages)
}

/// Moves a pending package owned by `agent_id` to delivered. Returns `false`
/// when no row matched, i.e. the package was already delivered (or is not
/// the agent's).
pub async fn mark_delivered(
    tx: &mut Transaction<'_, Sqlite>,
    package_id: i64,
    agent_id: i64,
    proof: &DeliveryProof,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        "UPDATE packages \
         SET status = ?, proof_photo_url = ?, delivery_lat = ?, delivery_lng = ?, delivered_at = ? \
         WHERE id = ? AND assigned_agent_id = ? AND status = ?",
    )
    .bind(PackageStatus::Delivered.as_str())
    .bind(&proof.photo_url)
    .bind(proof.location.lat)
    .bind(proof.location.lng)
    .bind(proof.delivered_at)
    .bind(package_id)
    .bind(agent_id)
    .bind(PackageStatus::Pending.as_str())
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}
