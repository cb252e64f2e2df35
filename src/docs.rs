use crate::api::attendance::{
    AttendanceFilter, AttendanceListResponse, DailySummaryResponse, DenialResponse, TodayResponse,
};
use crate::api::work_zone::{CreateWorkZone, UpdateWorkZone, ZoneListResponse, ZoneQuery};
use crate::attendance::authorize::Recovery;
use crate::attendance::report::{DailySummary, DayStatus};
use crate::attendance::state::DayState;
use crate::auth::handlers::TokenPair;
use crate::geofence::GeoPoint;
use crate::model::attendance::{AttendanceRecord, CheckKind, CreateAttendance};
use crate::model::work_zone::{WorkZone, ZoneKind};
use crate::models::LoginReqDto;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pointage API",
        version = "1.0.0",
        description = r#"
## Geofenced attendance

Field staff clock in and out from their phones. A check is accepted only when
the reported position lies inside a configured work zone and the user's day
allows it (one check-in, then one check-out, per local calendar day).

### Security
Every endpoint under the API prefix requires a **JWT Bearer** access token.
Zone administration is restricted to administrators, who do not clock in.

### Refusals
A refused check answers `400` (position or zone) or `409` (day state) with
`{ "code", "message", "recovery" }`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::attendance::list_records,
        crate::api::attendance::today,
        crate::api::attendance::daily,
        crate::api::attendance::create_record,

        crate::api::work_zone::list_zones,
        crate::api::work_zone::get_zone,
        crate::api::work_zone::create_zone,
        crate::api::work_zone::update_zone,
        crate::api::work_zone::delete_zone
    ),
    components(
        schemas(
            LoginReqDto,
            TokenPair,
            GeoPoint,
            CheckKind,
            AttendanceRecord,
            CreateAttendance,
            AttendanceFilter,
            AttendanceListResponse,
            TodayResponse,
            DayState,
            DailySummary,
            DayStatus,
            DailySummaryResponse,
            DenialResponse,
            Recovery,
            ZoneKind,
            WorkZone,
            ZoneQuery,
            ZoneListResponse,
            CreateWorkZone,
            UpdateWorkZone
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token rotation"),
        (name = "Attendance", description = "Clock-in / clock-out records"),
        (name = "Zones", description = "Work zone administration"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_attendance_and_zone_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/attendance"));
        assert!(paths.contains_key("/api/zones/{zone_id}"));
        assert!(paths.contains_key("/auth/login"));
        assert!(doc.components.unwrap().security_schemes.contains_key("bearer_auth"));
    }
}
