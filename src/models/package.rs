use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::models::location::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    Pending,
    Delivered,
}

impl PackageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PackageStatus::Pending => "pending",
            PackageStatus::Delivered => "delivered",
        }
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "pending" => Ok(PackageStatus::Pending),
            "delivered" => Ok(PackageStatus::Delivered),
            other => Err(format!("unknown package status {other:?}")),
        }
    }
}

/// Proof of delivery. Present on a package only once it is delivered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryProof {
    pub photo_url: String,
    pub location: GeoPoint,
    pub delivered_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Package {
    pub id: i64,
    pub tracking_number: String,
    pub destination_address: String,
    pub destination: GeoPoint,
    pub status: PackageStatus,
    pub assigned_agent_id: Option<i64>,
    pub proof: Option<DeliveryProof>,
}

#[derive(Debug, Clone)]
pub struct NewPackage {
    pub tracking_number: String,
    pub destination_address: String,
    pub destination: GeoPoint,
    pub agent_username: String,
}

/// Row shape returned by `GET /deliveries/assigned`.
#[derive(Debug, Clone, Serialize)]
pub struct PackageSummary {
    pub id: i64,
    pub tracking_number: String,
    pub destination_address: String,
    pub dest_lat: f64,
    pub dest_lng: f64,
    pub status: PackageStatus,
}

impl From<Package> for PackageSummary {
    fn from(package: Package) -> Self {
        Self {
            id: package.id,
            tracking_number: package.tracking_number,
            destination_address: package.destination_address,
            dest_lat: package.destination.lat,
            dest_lng: package.destination.lng,
            status: package.status,
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Package {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let raw_status: String = row.try_get("status")?;
        let status = raw_status
            .parse::<PackageStatus>()
            .map_err(|err| sqlx::Error::ColumnDecode {
                index: "status".to_string(),
                source: err.into(),
            })?;

        let photo_url: Option<String> = row.try_get("proof_photo_url")?;
        let delivery_lat: Option<f64> = row.try_get("delivery_lat")?;
        let delivery_lng: Option<f64> = row.try_get("delivery_lng")?;
        let delivered_at: Option<DateTime<Utc>> = row.try_get("delivered_at")?;

        let proof = match (photo_url, delivery_lat, delivery_lng, delivered_at) {
            (Some(photo_url), Some(lat), Some(lng), Some(delivered_at)) => Some(DeliveryProof {
                photo_url,
                location: GeoPoint { lat, lng },
                delivered_at,
            }),
            _ => None,
        };

        Ok(Self {
            id: row.try_get("id")?,
            tracking_number: row.try_get("tracking_number")?,
            destination_address: row.try_get("destination_address")?,
            destination: GeoPoint {
                lat: row.try_get("dest_lat")?,
                lng: row.try_get("dest_lng")?,
            },
            status,
            assigned_agent_id: row.try_get("assigned_agent_id")?,
            proof,
        })
    }
}
