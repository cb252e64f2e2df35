//! Client-side time clock: local snapshot, authorization and submission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use derive_more::Display;
use serde::Serialize;
use tracing::{info, warn};

use super::authorize::{Authorization, Denial, authorize_check};
use super::position::{PositionProvider, current_point};
use super::state::{DayState, derive_day_state};
use crate::client::{ClientError, ClientResult};
use crate::geofence::{GeoPoint, distance_meters, is_inside_zone, predefined_zone, select_zone};
use crate::model::attendance::{AttendanceRecord, CheckKind, CreateAttendance};
use crate::model::work_zone::WorkZone;

/// The attendance service as seen by a client.
#[async_trait]
pub trait AttendanceBackend: Send + Sync {
    /// The current user's records from `since` (local date) onwards.
    async fn list_records(&self, since: NaiveDate) -> ClientResult<Vec<AttendanceRecord>>;
    async fn list_zones(&self) -> ClientResult<Vec<WorkZone>>;
    async fn create_record(&self, body: &CreateAttendance) -> ClientResult<AttendanceRecord>;
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a submission may stay in flight before it is reported as failed.
    pub submit_timeout: Duration,
    /// Older position readings are treated as unavailable.
    pub max_position_age: chrono::Duration,
    /// Offset defining the local calendar day.
    pub utc_offset: FixedOffset,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            submit_timeout: Duration::from_secs(20),
            max_position_age: chrono::Duration::minutes(2),
            utc_offset: Utc.fix(),
        }
    }
}

#[derive(Debug, Display)]
pub enum SessionError {
    #[display(fmt = "a check is already being submitted")]
    Busy,
    #[display(fmt = "{}", _0)]
    Denied(Denial),
    #[display(fmt = "could not reach the attendance service: {}", _0)]
    Backend(ClientError),
    #[display(fmt = "the attendance service did not answer in time")]
    Timeout,
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Denied(d) => Some(d),
            SessionError::Backend(e) => Some(e),
            _ => None,
        }
    }
}

/// Everything the time-clock screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockStatus {
    pub state: DayState,
    pub can_check_in: bool,
    pub can_check_out: bool,
    pub in_flight: bool,
    pub position: Option<GeoPoint>,
    pub zone_id: Option<u64>,
    pub zone_name: Option<String>,
    pub distance_m: Option<f64>,
    pub inside_zone: bool,
}

#[derive(Debug, Default)]
struct Snapshot {
    records: Vec<AttendanceRecord>,
    zones: Vec<WorkZone>,
}

/// Zone a check at `position` is judged against: the one the service would
/// pick (containing, else nearest), or the first usable zone without a fix.
fn resolve_zone(zones: &[WorkZone], position: Option<GeoPoint>) -> Option<&WorkZone> {
    position
        .and_then(|p| select_zone(p, zones))
        .map(|m| m.zone)
        .or_else(|| predefined_zone(zones))
}

/// Held while a submission is in flight; clears the flag on drop.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CheckSession<B, P> {
    backend: B,
    positions: P,
    config: SessionConfig,
    snapshot: Mutex<Snapshot>,
    in_flight: AtomicBool,
}

impl<B: AttendanceBackend, P: PositionProvider> CheckSession<B, P> {
    pub fn new(backend: B, positions: P, config: SessionConfig) -> Self {
        Self {
            backend,
            positions,
            config,
            snapshot: Mutex::new(Snapshot::default()),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn positions(&self) -> &P {
        &self.positions
    }

    fn snapshot(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn local(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.config.utc_offset)
    }

    /// Replaces zones and records with what the service currently holds.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<(), SessionError> {
        let today = self.local(now).date_naive();
        let since = today.pred_opt().unwrap_or(today);

        let (zones, records) =
            futures::try_join!(self.backend.list_zones(), self.backend.list_records(since))
                .map_err(SessionError::Backend)?;

        *self.snapshot() = Snapshot { records, zones };
        Ok(())
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.snapshot().records.clone()
    }

    pub fn day_state(&self, now: DateTime<Utc>) -> DayState {
        derive_day_state(&self.snapshot().records, &self.local(now))
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn status(&self, now: DateTime<Utc>) -> ClockStatus {
        let position = current_point(&self.positions, now, self.config.max_position_age);
        let snapshot = self.snapshot();
        let state = derive_day_state(&snapshot.records, &self.local(now));
        let zone = resolve_zone(&snapshot.zones, position);

        let distance_m = match (position, zone.and_then(WorkZone::center)) {
            (Some(p), Some(c)) => Some(distance_meters(p, c)),
            _ => None,
        };

        ClockStatus {
            state,
            can_check_in: state.can_check_in(),
            can_check_out: state.can_check_out(),
            in_flight: self.is_in_flight(),
            position,
            zone_id: zone.map(|z| z.id),
            zone_name: zone.map(|z| z.name.clone()),
            distance_m,
            inside_zone: zone.is_some_and(|z| is_inside_zone(position, z)),
        }
    }

    /// Runs the authorization gate against the current snapshot.
    pub fn authorize(&self, kind: CheckKind, now: DateTime<Utc>) -> Result<Authorization, Denial> {
        let point = current_point(&self.positions, now, self.config.max_position_age);
        let snapshot = self.snapshot();
        let state = derive_day_state(&snapshot.records, &self.local(now));

        authorize_check(kind, point, resolve_zone(&snapshot.zones, point), state)
    }

    /// Authorizes and submits a check. Only one submission may be in flight;
    /// the day state moves only once the service confirms the record.
    pub async fn submit(
        &self,
        kind: CheckKind,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord, SessionError> {
        let _guard = InFlight::acquire(&self.in_flight).ok_or(SessionError::Busy)?;

        let authorization = self.authorize(kind, now).map_err(SessionError::Denied)?;
        let body = authorization.to_request(note);

        info!(
            check_kind = %kind,
            zone = %authorization.zone_name,
            distance_m = authorization.distance_m,
            "Submitting check"
        );

        let pending = self.backend.create_record(&body);
        let created = match tokio::time::timeout(self.config.submit_timeout, pending).await {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                warn!(error = %e, check_kind = %kind, "Check rejected");
                return Err(SessionError::Backend(e));
            }
            Err(_) => {
                warn!(check_kind = %kind, "Check submission timed out");
                return Err(SessionError::Timeout);
            }
        };

        self.snapshot().records.push(created.clone());

        if let Err(e) = self.refresh(now).await {
            warn!(error = %e, "Refresh after check failed");
        }

        Ok(created)
    }
}
