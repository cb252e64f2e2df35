use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::state::local_day;
use crate::model::attendance::{AttendanceRecord, CheckKind};
use crate::model::work_zone::ZoneKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Present,
    InProgress,
}

/// One line per user and local day.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailySummary {
    pub user_id: u64,
    pub username: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub first_check_in: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_check_out: Option<DateTime<Utc>>,
    pub zone_kind: ZoneKind,
    pub place: Option<String>,
    /// Hours between first check-in and last check-out, one decimal.
    pub duration_hours: Option<f64>,
    pub status: DayStatus,
}

fn round_hours(from: DateTime<Utc>, to: DateTime<Utc>) -> Option<f64> {
    if to < from {
        return None;
    }
    let hours = (to - from).num_seconds() as f64 / 3600.0;
    Some((hours * 10.0).round() / 10.0)
}

/// Groups records by user and local calendar day. Newest day first, then
/// by username.
pub fn daily_summaries<Tz: TimeZone>(records: &[AttendanceRecord], tz: &Tz) -> Vec<DailySummary> {
    let mut days: BTreeMap<(u64, NaiveDate), DailySummary> = BTreeMap::new();

    for record in records {
        let date = local_day(&record.timestamp, tz);
        let row = days.entry((record.user_id, date)).or_insert_with(|| DailySummary {
            user_id: record.user_id,
            username: record.username.clone(),
            date,
            first_check_in: None,
            last_check_out: None,
            zone_kind: record.zone_kind.unwrap_or_default(),
            place: record.zone_name.clone(),
            duration_hours: None,
            status: DayStatus::InProgress,
        });

        match record.check_kind {
            CheckKind::CheckIn => {
                if row.first_check_in.is_none_or(|ts| record.timestamp < ts) {
                    row.first_check_in = Some(record.timestamp);
                    if let Some(kind) = record.zone_kind {
                        row.zone_kind = kind;
                    }
                    if record.zone_name.is_some() {
                        row.place = record.zone_name.clone();
                    }
                }
            }
            CheckKind::CheckOut => {
                if row.last_check_out.is_none_or(|ts| record.timestamp > ts) {
                    row.last_check_out = Some(record.timestamp);
                }
            }
        }
        if row.username.is_none() {
            row.username = record.username.clone();
        }
    }

    let mut rows: Vec<DailySummary> = days
        .into_values()
        .map(|mut row| {
            if let (Some(from), Some(to)) = (row.first_check_in, row.last_check_out) {
                row.duration_hours = round_hours(from, to);
                row.status = DayStatus::Present;
            }
            row
        })
        .collect();

    rows.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.username.cmp(&b.username)));
    rows
}
