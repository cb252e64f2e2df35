use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::geofence::GeoPoint;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ZoneKind {
    #[default]
    Office,
    Worksite,
}

/// A circular work area. Center and radius stay optional until an
/// administrator finishes locating the zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "name": "Head office",
        "latitude": 14.7167,
        "longitude": -17.4677,
        "radius_m": 100.0,
        "zone_kind": "office",
        "address": "Avenue Cheikh Anta Diop, Dakar",
        "created_at": "2026-01-01T08:00:00Z",
        "updated_at": "2026-01-01T08:00:00Z"
    })
)]
pub struct WorkZone {
    pub id: u64,
    pub name: String,
    #[schema(nullable = true)]
    pub latitude: Option<f64>,
    #[schema(nullable = true)]
    pub longitude: Option<f64>,
    #[schema(nullable = true)]
    pub radius_m: Option<f64>,
    #[serde(default)]
    pub zone_kind: ZoneKind,
    #[schema(nullable = true)]
    pub address: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkZone {
    /// Center of the zone, if both coordinates are set and valid.
    pub fn center(&self) -> Option<GeoPoint> {
        GeoPoint::from_parts(self.latitude, self.longitude)
    }

    /// A zone can be checked against only with a full center and a finite radius.
    pub fn is_usable(&self) -> bool {
        self.center().is_some() && self.radius_m.is_some_and(f64::is_finite)
    }
}

#[derive(Debug, FromRow)]
pub struct WorkZoneRow {
    pub id: u64,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_m: Option<f64>,
    pub zone_kind: String,
    pub address: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<WorkZoneRow> for WorkZone {
    type Error = strum::ParseError;

    fn try_from(row: WorkZoneRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            latitude: row.latitude,
            longitude: row.longitude,
            radius_m: row.radius_m,
            zone_kind: row.zone_kind.parse()?,
            address: row.address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str) -> WorkZoneRow {
        WorkZoneRow {
            id: 7,
            name: "Chantier Almadies".to_string(),
            latitude: Some(14.745),
            longitude: Some(-17.52),
            radius_m: Some(250.0),
            zone_kind: kind.to_string(),
            address: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_row_conversion_parses_kind() {
        let zone = WorkZone::try_from(row("worksite")).unwrap();
        assert_eq!(zone.zone_kind, ZoneKind::Worksite);
        assert!(zone.is_usable());
        assert!(WorkZone::try_from(row("garage")).is_err());
    }

    #[test]
    fn test_usable_needs_center_and_radius() {
        let mut zone = WorkZone::try_from(row("office")).unwrap();
        zone.radius_m = Some(f64::NAN);
        assert!(!zone.is_usable());
        zone.radius_m = Some(10.0);
        zone.latitude = Some(120.0);
        assert!(zone.center().is_none());
        assert!(!zone.is_usable());
    }

    #[test]
    fn test_deserializes_partial_zone() {
        let zone: WorkZone = serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "Nouveau site",
            "latitude": null,
            "longitude": null,
            "radius_m": 80.0,
            "address": null
        }))
        .unwrap();
        assert_eq!(zone.zone_kind, ZoneKind::Office);
        assert!(zone.center().is_none());
    }
}
