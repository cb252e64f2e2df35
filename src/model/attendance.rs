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
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckKind {
    CheckIn,
    CheckOut,
}

/// One clock-in or clock-out event. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 42,
        "user_id": 5,
        "username": "awa.ndiaye",
        "timestamp": "2026-03-02T08:58:12Z",
        "check_kind": "check_in",
        "latitude": 14.7168,
        "longitude": -17.4676,
        "work_zone_id": 1,
        "zone_name": "Head office",
        "zone_kind": "office",
        "note": null
    })
)]
pub struct AttendanceRecord {
    pub id: u64,
    pub user_id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
    pub check_kind: CheckKind,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub work_zone_id: Option<u64>,
    #[serde(default)]
    pub zone_name: Option<String>,
    #[serde(default)]
    pub zone_kind: Option<crate::model::work_zone::ZoneKind>,
    #[serde(default)]
    pub note: Option<String>,
}

impl AttendanceRecord {
    pub fn point(&self) -> Option<GeoPoint> {
        GeoPoint::from_parts(self.latitude, self.longitude)
    }
}

/// Body of a create-record request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "check_kind": "check_in",
        "latitude": 14.7168,
        "longitude": -17.4676,
        "note": "Arrived with the delivery truck"
    })
)]
pub struct CreateAttendance {
    pub check_kind: CheckKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Ignored for clock-ins: the server resolves the zone from the position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_zone_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(max_length = 255)]
    pub note: Option<String>,
}

#[derive(Debug, FromRow)]
pub struct AttendanceRow {
    pub id: u64,
    pub user_id: u64,
    pub username: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub check_kind: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub work_zone_id: Option<u64>,
    pub zone_name: Option<String>,
    pub zone_kind: Option<String>,
    pub note: Option<String>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = strum::ParseError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            timestamp: row.timestamp,
            check_kind: row.check_kind.parse()?,
            latitude: row.latitude,
            longitude: row.longitude,
            work_zone_id: row.work_zone_id,
            zone_name: row.zone_name,
            zone_kind: row.zone_kind.as_deref().map(str::parse).transpose()?,
            note: row.note,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_kind_wire_names() {
        assert_eq!(CheckKind::CheckIn.as_ref(), "check_in");
        assert_eq!("check_out".parse::<CheckKind>().unwrap(), CheckKind::CheckOut);
        assert_eq!(serde_json::to_value(CheckKind::CheckIn).unwrap(), "check_in");
    }

    #[test]
    fn test_create_body_omits_missing_position() {
        let body = CreateAttendance {
            check_kind: CheckKind::CheckOut,
            latitude: None,
            longitude: None,
            work_zone_id: None,
            note: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({ "check_kind": "check_out" })
        );
    }

    #[test]
    fn test_row_conversion() {
        let row = AttendanceRow {
            id: 1,
            user_id: 9,
            username: Some("moussa".to_string()),
            timestamp: Utc::now(),
            check_kind: "check_in".to_string(),
            latitude: Some(14.7),
            longitude: None,
            work_zone_id: None,
            zone_name: None,
            zone_kind: Some("worksite".to_string()),
            note: None,
        };
        let record = AttendanceRecord::try_from(row).unwrap();
        assert_eq!(record.check_kind, CheckKind::CheckIn);
        assert_eq!(record.zone_kind, Some(crate::model::work_zone::ZoneKind::Worksite));
        assert!(record.point().is_none());
    }
}
