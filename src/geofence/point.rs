use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "latitude": 14.7167, "longitude": -17.4677 }))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Display)]
#[display(fmt = "invalid coordinates ({}, {})", latitude, longitude)]
pub struct InvalidCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl std::error::Error for InvalidCoordinates {}

impl GeoPoint {
    /// Builds a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinates> {
        let point = Self::raw(latitude, longitude);
        if point.is_valid() {
            Ok(point)
        } else {
            Err(InvalidCoordinates {
                latitude,
                longitude,
            })
        }
    }

    /// Builds a point without validation. NaN coordinates propagate through
    /// [`super::distance_meters`].
    pub const fn raw(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Builds a point from optional parts, as they arrive from forms and rows.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lng)) => Self::new(lat, lng).ok(),
            _ => None,
        }
    }
}

/// Swaps latitude and longitude when a device reports them inverted
/// (latitude out of range while the longitude would be a valid latitude).
/// Non-finite input is returned as is.
pub fn normalize_coords(latitude: f64, longitude: f64) -> (f64, f64) {
    if !latitude.is_finite() || !longitude.is_finite() {
        return (latitude, longitude);
    }
    if latitude.abs() > 90.0 && longitude.abs() <= 90.0 {
        (longitude, latitude)
    } else {
        (latitude, longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(GeoPoint::new(14.7167, -17.4677).is_ok());
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.5).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_from_parts_requires_both() {
        assert!(GeoPoint::from_parts(Some(1.0), None).is_none());
        assert!(GeoPoint::from_parts(None, Some(1.0)).is_none());
        assert_eq!(
            GeoPoint::from_parts(Some(1.0), Some(2.0)),
            Some(GeoPoint::raw(1.0, 2.0))
        );
    }

    #[test]
    fn test_normalize_swaps_inverted_pair() {
        assert_eq!(normalize_coords(-117.16, 32.71), (32.71, -117.16));
        assert_eq!(normalize_coords(14.7167, -17.4677), (14.7167, -17.4677));
        // both out of range: nothing sensible to swap
        assert_eq!(normalize_coords(120.0, 150.0), (120.0, 150.0));

        let (lat, lng) = normalize_coords(f64::NAN, 10.0);
        assert!(lat.is_nan());
        assert_eq!(lng, 10.0);

        assert_eq!(normalize_coords(f64::INFINITY, 10.0), (f64::INFINITY, 10.0));
        assert_eq!(
            normalize_coords(-100.0, f64::NEG_INFINITY),
            (-100.0, f64::NEG_INFINITY)
        );
    }
}
