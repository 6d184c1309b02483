use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, AppError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::BadRequest(format!(
                "latitude {lat} is outside [-90, 90]"
            )));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::BadRequest(format!(
                "longitude {lng} is outside [-180, 180]"
            )));
        }
        Ok(Self { lat, lng })
    }
}

#[cfg(test)]
mod tests {
    use super::GeoPoint;

    #[test]
    fn accepts_boundaries() {
        assert!(GeoPoint::new(90.0, -180.0).is_ok());
        assert!(GeoPoint::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn rejects_out_of_range_and_nan() {
        assert!(GeoPoint::new(90.5, 0.0).is_err());
        assert!(GeoPoint::new(0.0, 181.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }
}
