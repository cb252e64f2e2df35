use crate::{
    auth::auth::AuthUser,
    model::work_zone::{WorkZone, WorkZoneRow, ZoneKind},
    utils::{
        db_utils::{SqlValue, UpdateBuilder, execute_update},
        zone_cache,
    },
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct ZoneQuery {
    pub zone_kind: Option<ZoneKind>,
    /// Search by name or address
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ZoneListResponse {
    pub data: Vec<WorkZone>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "Chantier Almadies",
    "latitude": 14.745,
    "longitude": -17.52,
    "radius_m": 250.0,
    "zone_kind": "worksite",
    "address": "Route des Almadies"
}))]
pub struct CreateWorkZone {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_m: Option<f64>,
    #[serde(default)]
    pub zone_kind: ZoneKind,
    pub address: Option<String>,
}

/// Partial update. An absent field is left alone; an explicit `null`
/// clears a nullable column.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateWorkZone {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub radius_m: Option<Option<f64>>,
    pub zone_kind: Option<ZoneKind>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn check_latitude(value: Option<f64>) -> Result<(), &'static str> {
    match value {
        Some(v) if !(-90.0..=90.0).contains(&v) => Err("Latitude must be between -90 and 90"),
        _ => Ok(()),
    }
}

fn check_longitude(value: Option<f64>) -> Result<(), &'static str> {
    match value {
        Some(v) if !(-180.0..=180.0).contains(&v) => Err("Longitude must be between -180 and 180"),
        _ => Ok(()),
    }
}

fn check_radius(value: Option<f64>) -> Result<(), &'static str> {
    match value {
        Some(v) if !(v.is_finite() && v >= 0.0) => {
            Err("Radius must be a non-negative number of meters")
        }
        _ => Ok(()),
    }
}

fn check_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        Err("Name is required")
    } else {
        Ok(())
    }
}

impl CreateWorkZone {
    fn validate(&self) -> Result<(), &'static str> {
        check_name(&self.name)?;
        check_latitude(self.latitude)?;
        check_longitude(self.longitude)?;
        check_radius(self.radius_m)
    }
}

impl UpdateWorkZone {
    fn validate(&self) -> Result<(), &'static str> {
        if let Some(name) = &self.name {
            check_name(name)?;
        }
        check_latitude(self.latitude.flatten())?;
        check_longitude(self.longitude.flatten())?;
        check_radius(self.radius_m.flatten())
    }

    fn into_update(self) -> UpdateBuilder {
        let mut builder = UpdateBuilder::new();
        if let Some(name) = self.name {
            builder.set("name", SqlValue::String(name.trim().to_string()));
        }
        if let Some(latitude) = self.latitude {
            builder.set("latitude", latitude);
        }
        if let Some(longitude) = self.longitude {
            builder.set("longitude", longitude);
        }
        if let Some(radius_m) = self.radius_m {
            builder.set("radius_m", radius_m);
        }
        if let Some(kind) = self.zone_kind {
            builder.set("zone_kind", SqlValue::String(kind.to_string()));
        }
        if let Some(address) = self.address {
            builder.set("address", address);
        }
        builder
    }
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "message": message }))
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "message": "Work zone not found" }))
}

/// List work zones
#[utoipa::path(
    get,
    path = "/api/zones",
    params(ZoneQuery),
    responses(
        (status = 200, description = "Work zones in id order", body = ZoneListResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Zones",
    security(("bearer_auth" = []))
)]
pub async fn list_zones(
    pool: web::Data<MySqlPool>,
    query: web::Query<ZoneQuery>,
) -> actix_web::Result<impl Responder> {
    let zones = zone_cache::zones(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to list work zones");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let search = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let data = zones
        .iter()
        .filter(|z| query.zone_kind.is_none_or(|k| z.zone_kind == k))
        .filter(|z| {
            search.as_deref().is_none_or(|s| {
                z.name.to_lowercase().contains(s)
                    || z.address.as_deref().is_some_and(|a| a.to_lowercase().contains(s))
            })
        })
        .cloned()
        .collect();

    Ok(HttpResponse::Ok().json(ZoneListResponse { data }))
}

async fn fetch_zone(pool: &MySqlPool, zone_id: u64) -> actix_web::Result<Option<WorkZone>> {
    let row = sqlx::query_as::<_, WorkZoneRow>(
        r#"
        SELECT id, name, latitude, longitude, radius_m, zone_kind, address, created_at, updated_at
        FROM work_zones
        WHERE id = ?
        "#,
    )
    .bind(zone_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        error!(error = %e, zone_id, "Failed to fetch work zone");
        ErrorInternalServerError("Internal Server Error")
    })?;

    row.map(WorkZone::try_from).transpose().map_err(|e| {
        error!(error = %e, zone_id, "Corrupt work zone row");
        ErrorInternalServerError("Internal Server Error")
    })
}

/// Get work zone by ID
#[utoipa::path(
    get,
    path = "/api/zones/{zone_id}",
    params(("zone_id", Path, description = "Work zone ID")),
    responses(
        (status = 200, description = "Work zone found", body = WorkZone),
        (status = 404, description = "Work zone not found", body = Object, example = json!({
            "message": "Work zone not found"
        }))
    ),
    tag = "Zones",
    security(("bearer_auth" = []))
)]
pub async fn get_zone(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    match fetch_zone(pool.get_ref(), path.into_inner()).await? {
        Some(zone) => Ok(HttpResponse::Ok().json(zone)),
        None => Ok(not_found()),
    }
}

/// Create work zone
#[utoipa::path(
    post,
    path = "/api/zones",
    request_body = CreateWorkZone,
    responses(
        (status = 201, description = "Work zone created", body = WorkZone),
        (status = 400, description = "Invalid coordinates or radius"),
        (status = 403, description = "Admin only")
    ),
    tag = "Zones",
    security(("bearer_auth" = []))
)]
pub async fn create_zone(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateWorkZone>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    if let Err(message) = payload.validate() {
        return Ok(bad_request(message));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO work_zones (name, latitude, longitude, radius_m, zone_kind, address)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.name.trim())
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.radius_m)
    .bind(payload.zone_kind.to_string())
    .bind(payload.address.as_deref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create work zone");
        ErrorInternalServerError("Internal Server Error")
    })?;

    zone_cache::invalidate().await;

    let zone_id = result.last_insert_id();
    info!(zone_id, admin = %auth.username, "Work zone created");

    match fetch_zone(pool.get_ref(), zone_id).await? {
        Some(zone) => Ok(HttpResponse::Created().json(zone)),
        None => Err(ErrorInternalServerError("Internal Server Error")),
    }
}

/// Update work zone
#[utoipa::path(
    put,
    path = "/api/zones/{zone_id}",
    params(("zone_id", Path, description = "Work zone ID")),
    request_body = UpdateWorkZone,
    responses(
        (status = 200, description = "Work zone updated", body = WorkZone),
        (status = 400, description = "Invalid coordinates or radius"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Work zone not found")
    ),
    tag = "Zones",
    security(("bearer_auth" = []))
)]
pub async fn update_zone(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateWorkZone>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let zone_id = path.into_inner();

    let payload = payload.into_inner();
    if let Err(message) = payload.validate() {
        return Ok(bad_request(message));
    }

    let update = payload.into_update().build("work_zones", zone_id)?;
    execute_update(pool.get_ref(), update).await.map_err(|e| {
        error!(error = %e, zone_id, "Failed to update work zone");
        ErrorInternalServerError("Internal Server Error")
    })?;

    zone_cache::invalidate().await;

    // MySQL reports zero affected rows for a no-op update, so existence is read back
    match fetch_zone(pool.get_ref(), zone_id).await? {
        Some(zone) => {
            info!(zone_id, admin = %auth.username, usable = zone.is_usable(), "Work zone updated");
            Ok(HttpResponse::Ok().json(zone))
        }
        None => Ok(not_found()),
    }
}

/// Delete work zone
///
/// Records keep their coordinates; their zone reference is cleared.
#[utoipa::path(
    delete,
    path = "/api/zones/{zone_id}",
    params(("zone_id", Path, description = "Work zone ID")),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Work zone not found")
    ),
    tag = "Zones",
    security(("bearer_auth" = []))
)]
pub async fn delete_zone(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let zone_id = path.into_inner();

    let result = sqlx::query("DELETE FROM work_zones WHERE id = ?")
        .bind(zone_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, zone_id, "Failed to delete work zone");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(not_found());
    }

    zone_cache::invalidate().await;
    info!(zone_id, admin = %auth.username, "Work zone deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let body: UpdateWorkZone = serde_json::from_value(json!({
            "radius_m": null,
            "name": "Depot"
        }))
        .unwrap();

        assert_eq!(body.radius_m, Some(None));
        assert_eq!(body.latitude, None);

        let update = body.into_update().build("work_zones", 2).unwrap();
        assert_eq!(update.sql, "UPDATE work_zones SET name = ?, radius_m = ? WHERE id = ?");
        assert_eq!(update.values[1], SqlValue::Null);
    }

    #[test]
    fn test_create_validation() {
        let mut body: CreateWorkZone = serde_json::from_value(json!({
            "name": "Siège",
            "latitude": 14.7167,
            "longitude": -17.4677,
            "radius_m": 100.0
        }))
        .unwrap();
        assert_eq!(body.zone_kind, ZoneKind::Office);
        assert!(body.validate().is_ok());

        body.radius_m = Some(-5.0);
        assert!(body.validate().is_err());

        body.radius_m = None;
        body.latitude = Some(95.0);
        assert!(body.validate().is_err());

        body.latitude = None;
        body.name = "  ".to_string();
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_update_validation() {
        let body = UpdateWorkZone {
            longitude: Some(Some(200.0)),
            ..Default::default()
        };
        assert!(body.validate().is_err());

        let cleared = UpdateWorkZone {
            latitude: Some(None),
            longitude: Some(None),
            ..Default::default()
        };
        assert!(cleared.validate().is_ok());
    }
}
