use derive_more::Display;
use serde::Serialize;
use utoipa::ToSchema;

use super::state::DayState;
use crate::geofence::{GeoPoint, distance_meters, is_inside_zone};
use crate::model::attendance::{CheckKind, CreateAttendance};
use crate::model::work_zone::WorkZone;

/// A check action that passed every client-side gate.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Authorization {
    pub check_kind: CheckKind,
    pub point: GeoPoint,
    pub work_zone_id: u64,
    pub zone_name: String,
    /// Distance from the point to the zone center, for audit display.
    pub distance_m: f64,
}

impl Authorization {
    pub fn to_request(&self, note: Option<String>) -> CreateAttendance {
        CreateAttendance {
            check_kind: self.check_kind,
            latitude: Some(self.point.latitude),
            longitude: Some(self.point.longitude),
            work_zone_id: Some(self.work_zone_id),
            note,
        }
    }
}

/// Why a check action was refused. Each variant renders its own message.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum Denial {
    #[display(fmt = "You have already checked in today or your day is complete.")]
    AlreadyCheckedInOrDayComplete,
    #[display(fmt = "You have not checked in today.")]
    NotCheckedIn,
    #[display(fmt = "Your position is unavailable. Allow location access and try again.")]
    PositionUnavailable,
    #[display(fmt = "No work zone is configured. An administrator must set a center and radius.")]
    NoZoneConfigured,
    #[display(
        fmt = "You are outside the work zone \"{}\": {:.0} m from its center (allowed radius {:.0} m).",
        zone_name,
        distance_m,
        radius_m
    )]
    OutsideZone {
        zone_name: String,
        distance_m: f64,
        radius_m: f64,
    },
}

/// What the user has to do before trying again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    WaitForPosition,
    ContactAdministrator,
    MoveIntoZone,
    WaitForNextState,
}

impl Denial {
    /// Stable machine-readable code, shared with the HTTP service.
    pub fn code(&self) -> &'static str {
        match self {
            Denial::AlreadyCheckedInOrDayComplete => "ALREADY_CHECKED_IN_OR_DAY_COMPLETE",
            Denial::NotCheckedIn => "NOT_CHECKED_IN",
            Denial::PositionUnavailable => "POSITION_UNAVAILABLE",
            Denial::NoZoneConfigured => "NO_ZONE_CONFIGURED",
            Denial::OutsideZone { .. } => "OUTSIDE_ZONE",
        }
    }

    pub fn recovery(&self) -> Recovery {
        match self {
            Denial::AlreadyCheckedInOrDayComplete | Denial::NotCheckedIn => {
                Recovery::WaitForNextState
            }
            Denial::PositionUnavailable => Recovery::WaitForPosition,
            Denial::NoZoneConfigured => Recovery::ContactAdministrator,
            Denial::OutsideZone { .. } => Recovery::MoveIntoZone,
        }
    }

    /// State denials stem from the day's records rather than the request.
    pub fn is_state_conflict(&self) -> bool {
        matches!(self, Denial::AlreadyCheckedInOrDayComplete | Denial::NotCheckedIn)
    }
}

impl std::error::Error for Denial {}

/// Gate in front of record creation. Checks run in a fixed order and the
/// first failure wins: day state, position, zone configuration, fence.
pub fn authorize_check(
    kind: CheckKind,
    point: Option<GeoPoint>,
    zone: Option<&WorkZone>,
    state: DayState,
) -> Result<Authorization, Denial> {
    match kind {
        CheckKind::CheckIn if !state.can_check_in() => {
            return Err(Denial::AlreadyCheckedInOrDayComplete);
        }
        CheckKind::CheckOut if !state.can_check_out() => return Err(Denial::NotCheckedIn),
        _ => {}
    }

    let point = point.ok_or(Denial::PositionUnavailable)?;

    let zone = zone.filter(|z| z.is_usable()).ok_or(Denial::NoZoneConfigured)?;
    let center = zone.center().ok_or(Denial::NoZoneConfigured)?;
    let radius_m = zone.radius_m.unwrap_or(0.0);
    let distance_m = distance_meters(point, center);

    if !is_inside_zone(Some(point), zone) {
        return Err(Denial::OutsideZone {
            zone_name: zone.name.clone(),
            distance_m,
            radius_m,
        });
    }

    Ok(Authorization {
        check_kind: kind,
        point,
        work_zone_id: zone.id,
        zone_name: zone.name.clone(),
        distance_m,
    })
}
