use crate::attendance::authorize::{Denial, Recovery, authorize_check};
use crate::attendance::report::{DailySummary, daily_summaries};
use crate::attendance::state::{DayState, derive_day_state};
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::geofence::{GeoPoint, select_zone};
use crate::model::attendance::{AttendanceRecord, AttendanceRow, CheckKind, CreateAttendance};
use crate::utils::zone_cache;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{MySql, MySqlPool};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

const MAX_NOTE_CHARS: usize = 255;
const MAX_SUMMARY_RECORDS: u64 = 5_000;

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AttendanceFilter {
    /// Filter by user (admins only; others always see themselves)
    pub user_id: Option<u64>,
    /// Case-insensitive username fragment (admins only)
    pub username: Option<String>,
    pub work_zone_id: Option<u64>,
    pub check_kind: Option<CheckKind>,
    /// First local day included
    pub date_after: Option<NaiveDate>,
    /// Last local day included
    pub date_before: Option<NaiveDate>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<AttendanceRecord>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct TodayResponse {
    pub state: DayState,
    pub can_check_in: bool,
    pub can_check_out: bool,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Serialize, ToSchema)]
pub struct DailySummaryResponse {
    pub data: Vec<DailySummary>,
}

/// Body of every refused check.
#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "code": "OUTSIDE_ZONE",
    "message": "You are outside the work zone \"Head office\": 367 m from its center (allowed radius 50 m).",
    "recovery": "move_into_zone",
    "distance_m": 367.4,
    "radius_m": 50.0
}))]
pub struct DenialResponse {
    pub code: String,
    pub message: String,
    pub recovery: Recovery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius_m: Option<f64>,
}

impl From<&Denial> for DenialResponse {
    fn from(denial: &Denial) -> Self {
        let (distance_m, radius_m) = match denial {
            Denial::OutsideZone {
                distance_m,
                radius_m,
                ..
            } => (Some(*distance_m), Some(*radius_m)),
            _ => (None, None),
        };

        Self {
            code: denial.code().to_string(),
            message: denial.to_string(),
            recovery: denial.recovery(),
            distance_m,
            radius_m,
        }
    }
}

fn denial_response(denial: &Denial) -> HttpResponse {
    let body = DenialResponse::from(denial);
    if denial.is_state_conflict() {
        HttpResponse::Conflict().json(body)
    } else {
        HttpResponse::BadRequest().json(body)
    }
}

/// Start of a local calendar day, in UTC.
fn day_start_utc(date: NaiveDate, offset: FixedOffset) -> actix_web::Result<DateTime<Utc>> {
    date.and_time(NaiveTime::MIN)
        .and_local_timezone(offset)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| actix_web::error::ErrorBadRequest("Date out of range"))
}

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(String),
    Time(DateTime<Utc>),
}

struct RecordQuery {
    where_sql: String,
    args: Vec<FilterValue>,
}

impl RecordQuery {
    fn new() -> Self {
        Self {
            where_sql: String::from(" WHERE 1=1"),
            args: Vec::new(),
        }
    }

    fn push(&mut self, clause: &str, value: FilterValue) {
        self.where_sql.push_str(clause);
        self.args.push(value);
    }

    fn from_filter(
        auth: &AuthUser,
        filter: &AttendanceFilter,
        offset: FixedOffset,
    ) -> actix_web::Result<Self> {
        let mut q = Self::new();

        if auth.is_admin() {
            if let Some(user_id) = filter.user_id {
                q.push(" AND a.user_id = ?", FilterValue::U64(user_id));
            }
            let username = filter
                .username
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty());
            if let Some(username) = username {
                q.push(
                    " AND LOWER(u.username) LIKE ?",
                    FilterValue::Str(format!("%{}%", username.to_lowercase())),
                );
            }
        } else {
            q.push(" AND a.user_id = ?", FilterValue::U64(auth.user_id));
        }

        if let Some(zone_id) = filter.work_zone_id {
            q.push(" AND a.work_zone_id = ?", FilterValue::U64(zone_id));
        }
        if let Some(kind) = filter.check_kind {
            q.push(" AND a.check_kind = ?", FilterValue::Str(kind.to_string()));
        }
        if let Some(after) = filter.date_after {
            q.push(" AND a.`timestamp` >= ?", FilterValue::Time(day_start_utc(after, offset)?));
        }
        if let Some(before) = filter.date_before {
            let next = before
                .succ_opt()
                .ok_or_else(|| actix_web::error::ErrorBadRequest("Date out of range"))?;
            q.push(" AND a.`timestamp` < ?", FilterValue::Time(day_start_utc(next, offset)?));
        }

        Ok(q)
    }
}

const RECORD_SELECT: &str = r#"
    SELECT a.id, a.user_id, u.username, a.`timestamp`, a.check_kind, a.latitude, a.longitude,
           a.work_zone_id, z.name AS zone_name, z.zone_kind AS zone_kind, a.note
    FROM attendance_records a
    JOIN users u ON u.id = a.user_id
    LEFT JOIN work_zones z ON z.id = a.work_zone_id
"#;

async fn fetch_records<'c, E>(
    executor: E,
    query: &RecordQuery,
    limit: u64,
    offset: u64,
) -> actix_web::Result<Vec<AttendanceRecord>>
where
    E: sqlx::Executor<'c, Database = MySql>,
{
    let sql = format!(
        "{}{} ORDER BY a.`timestamp` DESC, a.id DESC LIMIT ? OFFSET ?",
        RECORD_SELECT, query.where_sql
    );

    let mut data_q = sqlx::query_as::<_, AttendanceRow>(&sql);
    for arg in &query.args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(*v),
            FilterValue::Str(s) => data_q.bind(s.as_str()),
            FilterValue::Time(t) => data_q.bind(*t),
        };
    }

    let rows = data_q
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch attendance records");
            ErrorInternalServerError("Internal Server Error")
        })?;

    rows.into_iter()
        .map(|row| {
            AttendanceRecord::try_from(row).map_err(|e| {
                error!(error = %e, "Corrupt attendance row");
                ErrorInternalServerError("Internal Server Error")
            })
        })
        .collect()
}

/// List attendance records
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceFilter),
    responses(
        (
            status = 200,
            description = "Paginated attendance records, newest first",
            body = AttendanceListResponse
        ),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_records(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    filter: web::Query<AttendanceFilter>,
) -> actix_web::Result<impl Responder> {
    let per_page = filter.per_page.unwrap_or(20).clamp(1, 100);
    let page = filter.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    let query = RecordQuery::from_filter(&auth, &filter, config.day_offset())?;

    let count_sql = format!(
        "SELECT COUNT(*) FROM attendance_records a JOIN users u ON u.id = a.user_id{}",
        query.where_sql
    );
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &query.args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(s.as_str()),
            FilterValue::Time(t) => count_q.bind(*t),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count attendance records");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let data = fetch_records(pool.get_ref(), &query, per_page, offset).await?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}

/// The caller's state for the current local day
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Day state and today's records", body = TodayResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let offset = config.day_offset();
    let now = Utc::now().with_timezone(&offset);

    let mut query = RecordQuery::new();
    query.push(" AND a.user_id = ?", FilterValue::U64(auth.user_id));
    query.push(
        " AND a.`timestamp` >= ?",
        FilterValue::Time(day_start_utc(now.date_naive(), offset)?),
    );

    let records = fetch_records(pool.get_ref(), &query, 100, 0).await?;
    let state = derive_day_state(&records, &now);

    Ok(HttpResponse::Ok().json(TodayResponse {
        state,
        can_check_in: state.can_check_in(),
        can_check_out: state.can_check_out(),
        records,
    }))
}

/// One summary line per user and day
#[utoipa::path(
    get,
    path = "/api/attendance/daily",
    params(AttendanceFilter),
    responses(
        (
            status = 200,
            description = "Daily summaries, newest day first",
            body = DailySummaryResponse
        ),
        (status = 400, description = "Date range holds too many records"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn daily(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    filter: web::Query<AttendanceFilter>,
) -> actix_web::Result<impl Responder> {
    let offset = config.day_offset();
    let query = RecordQuery::from_filter(&auth, &filter, offset)?;
    let records = fetch_records(pool.get_ref(), &query, MAX_SUMMARY_RECORDS + 1, 0).await?;

    let Some(records) = whole_window(records, MAX_SUMMARY_RECORDS) else {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Too many records to summarise; narrow the date range"
        })));
    };

    Ok(HttpResponse::Ok().json(DailySummaryResponse {
        data: daily_summaries(&records, &offset),
    }))
}

/// `None` when the window holds more records than `cap`: a cut would split
/// the oldest day.
fn whole_window(records: Vec<AttendanceRecord>, cap: u64) -> Option<Vec<AttendanceRecord>> {
    (records.len() as u64 <= cap).then_some(records)
}

/// Clock in or out
///
/// The zone is resolved from the reported position against the configured
/// zones; a client-supplied `work_zone_id` is ignored.
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = CreateAttendance,
    responses(
        (status = 201, description = "Record created", body = AttendanceRecord),
        (
            status = 400,
            description = "Position missing, no zone configured, or outside the zone",
            body = DenialResponse
        ),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Administrators do not clock in"),
        (
            status = 409,
            description = "Already checked in / day complete, or not checked in",
            body = DenialResponse
        ),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn create_record(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateAttendance>,
) -> actix_web::Result<impl Responder> {
    if !auth.role.clocks_in() {
        return Err(actix_web::error::ErrorForbidden("Administrators do not clock in"));
    }

    let payload = payload.into_inner();
    let user_id = auth.user_id;

    let note = payload
        .note
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    if note.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTE_CHARS) {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "message": "Note must be at most 255 characters"
        })));
    }

    let zones = zone_cache::zones(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, user_id, "Failed to load work zones");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let offset = config.day_offset();
    let now = Utc::now().with_timezone(&offset);

    let db_err = |e: sqlx::Error| {
        error!(error = %e, user_id, "Check failed");
        ErrorInternalServerError("Internal Server Error")
    };

    let mut tx = pool.begin().await.map_err(db_err)?;

    // serialises concurrent checks of the same user
    sqlx::query("SELECT id FROM users WHERE id = ? FOR UPDATE")
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

    let mut today = RecordQuery::new();
    today.push(" AND a.user_id = ?", FilterValue::U64(user_id));
    today.push(
        " AND a.`timestamp` >= ?",
        FilterValue::Time(day_start_utc(now.date_naive(), offset)?),
    );
    let records = fetch_records(&mut *tx, &today, 100, 0).await?;
    let state = derive_day_state(&records, &now);

    let point = GeoPoint::from_parts(payload.latitude, payload.longitude);
    let matched = point.and_then(|p| select_zone(p, &zones));

    let authorization = match authorize_check(
        payload.check_kind,
        point,
        matched.as_ref().map(|m| m.zone),
        state,
    ) {
        Ok(a) => a,
        Err(denial) => {
            info!(user_id, code = denial.code(), state = %state, "Check denied");
            return Ok(denial_response(&denial));
        }
    };

    let inserted = sqlx::query(
        r#"
        INSERT INTO attendance_records
            (user_id, `timestamp`, check_kind, latitude, longitude, work_zone_id, note)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(now.with_timezone(&Utc))
    .bind(authorization.check_kind.to_string())
    .bind(authorization.point.latitude)
    .bind(authorization.point.longitude)
    .bind(authorization.work_zone_id)
    .bind(note.as_deref())
    .execute(&mut *tx)
    .await
    .map_err(db_err)?;

    let mut created = RecordQuery::new();
    created.push(" AND a.id = ?", FilterValue::U64(inserted.last_insert_id()));
    let record = fetch_records(&mut *tx, &created, 1, 0)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ErrorInternalServerError("Internal Server Error"))?;

    tx.commit().await.map_err(db_err)?;

    info!(
        user_id,
        record_id = record.id,
        check_kind = %record.check_kind,
        zone = %authorization.zone_name,
        distance_m = authorization.distance_m,
        "Check recorded"
    );

    Ok(HttpResponse::Created().json(record))
}
