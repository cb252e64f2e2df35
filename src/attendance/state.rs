use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

use crate::model::attendance::{AttendanceRecord, CheckKind};

/// Where a user stands for the current calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DayState {
    NotStarted,
    CheckedIn,
    Completed,
}

impl DayState {
    pub fn can_check_in(self) -> bool {
        self == DayState::NotStarted
    }

    pub fn can_check_out(self) -> bool {
        self == DayState::CheckedIn
    }

    /// State reached by a successful `kind` action, or `None` if the
    /// action is not allowed from here.
    pub fn next(self, kind: CheckKind) -> Option<DayState> {
        match (self, kind) {
            (DayState::NotStarted, CheckKind::CheckIn) => Some(DayState::CheckedIn),
            (DayState::CheckedIn, CheckKind::CheckOut) => Some(DayState::Completed),
            _ => None,
        }
    }
}

/// Calendar day of `ts` as seen from `tz`.
pub fn local_day<Tz: TimeZone>(ts: &DateTime<chrono::Utc>, tz: &Tz) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

/// Derives the day state from an unsorted record list.
///
/// Only records falling on `now`'s calendar day (in `now`'s time zone)
/// count; the latest of them decides. Equal timestamps are ordered by id.
pub fn derive_day_state<Tz: TimeZone>(
    records: &[AttendanceRecord],
    now: &DateTime<Tz>,
) -> DayState {
    let tz = now.timezone();
    let today = now.date_naive();

    records
        .iter()
        .filter(|r| local_day(&r.timestamp, &tz) == today)
        .max_by_key(|r| (r.timestamp, r.id))
        .map_or(DayState::NotStarted, |latest| match latest.check_kind {
            CheckKind::CheckIn => DayState::CheckedIn,
            CheckKind::CheckOut => DayState::Completed,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn record(id: u64, kind: CheckKind, ts: &str) -> AttendanceRecord {
        AttendanceRecord {
            id,
            user_id: 1,
            username: None,
            timestamp: ts.parse::<DateTime<Utc>>().unwrap(),
            check_kind: kind,
            latitude: None,
            longitude: None,
            work_zone_id: None,
            zone_name: None,
            zone_kind: None,
            note: None,
        }
    }

    fn at(ts: &str) -> DateTime<Utc> {
        ts.parse().unwrap()
    }

    #[test]
    fn test_progression_through_the_day() {
        let now = at("2026-03-02T12:00:00Z");
        let mut records = Vec::new();

        let state = derive_day_state(&records, &now);
        assert_eq!(state, DayState::NotStarted);
        assert!(state.can_check_in());
        assert!(!state.can_check_out());

        records.push(record(1, CheckKind::CheckIn, "2026-03-02T08:55:00Z"));
        let state = derive_day_state(&records, &now);
        assert_eq!(state, DayState::CheckedIn);
        assert!(!state.can_check_in());
        assert!(state.can_check_out());

        records.push(record(2, CheckKind::CheckOut, "2026-03-02T11:30:00Z"));
        let state = derive_day_state(&records, &now);
        assert_eq!(state, DayState::Completed);
        assert!(!state.can_check_in());
        assert!(!state.can_check_out());
    }

    #[test]
    fn test_completed_resets_next_day() {
        let records = vec![
            record(1, CheckKind::CheckIn, "2026-03-02T08:55:00Z"),
            record(2, CheckKind::CheckOut, "2026-03-02T17:01:00Z"),
        ];
        assert_eq!(
            derive_day_state(&records, &at("2026-03-02T23:59:59Z")),
            DayState::Completed
        );
        assert_eq!(
            derive_day_state(&records, &at("2026-03-03T00:00:00Z")),
            DayState::NotStarted
        );
    }

    #[test]
    fn test_open_check_in_does_not_carry_over() {
        let records = vec![record(1, CheckKind::CheckIn, "2026-03-01T08:00:00Z")];
        assert_eq!(
            derive_day_state(&records, &at("2026-03-02T09:00:00Z")),
            DayState::NotStarted
        );
    }

    #[test]
    fn test_order_of_input_does_not_matter() {
        let records = vec![
            record(2, CheckKind::CheckOut, "2026-03-02T17:00:00Z"),
            record(1, CheckKind::CheckIn, "2026-03-02T08:00:00Z"),
        ];
        assert_eq!(
            derive_day_state(&records, &at("2026-03-02T18:00:00Z")),
            DayState::Completed
        );
    }

    #[test]
    fn test_equal_timestamps_ordered_by_id() {
        let records = vec![
            record(5, CheckKind::CheckOut, "2026-03-02T09:00:00Z"),
            record(4, CheckKind::CheckIn, "2026-03-02T09:00:00Z"),
        ];
        assert_eq!(
            derive_day_state(&records, &at("2026-03-02T10:00:00Z")),
            DayState::Completed
        );
    }

    #[test]
    fn test_calendar_day_follows_local_time() {
        // 23:30 UTC on the 1st is 01:30 on the 2nd at UTC+2
        let records = vec![record(1, CheckKind::CheckIn, "2026-03-01T23:30:00Z")];
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();

        let local_now = at("2026-03-02T06:00:00Z").with_timezone(&plus_two);
        assert_eq!(derive_day_state(&records, &local_now), DayState::CheckedIn);

        let utc_now = at("2026-03-02T06:00:00Z");
        assert_eq!(derive_day_state(&records, &utc_now), DayState::NotStarted);
    }

    #[test]
    fn test_transitions_do_not_skip_states() {
        assert_eq!(DayState::NotStarted.next(CheckKind::CheckIn), Some(DayState::CheckedIn));
        assert_eq!(DayState::CheckedIn.next(CheckKind::CheckOut), Some(DayState::Completed));
        assert_eq!(DayState::NotStarted.next(CheckKind::CheckOut), None);
        assert_eq!(DayState::CheckedIn.next(CheckKind::CheckIn), None);
        assert_eq!(DayState::Completed.next(CheckKind::CheckIn), None);
        assert_eq!(DayState::Completed.next(CheckKind::CheckOut), None);
    }

    #[test]
    fn test_records_of_other_days_ignored() {
        let records = vec![
            record(1, CheckKind::CheckOut, "2026-03-03T09:00:00Z"),
            record(2, CheckKind::CheckIn, "2026-03-01T09:00:00Z"),
        ];
        let state = derive_day_state(&records, &at("2026-03-02T12:00:00Z"));
        assert_eq!(state, DayState::NotStarted);
    }
}
