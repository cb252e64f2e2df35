//! Great-circle distance and work-zone membership.

mod point;

pub use point::{GeoPoint, InvalidCoordinates, normalize_coords};

use crate::model::work_zone::WorkZone;

/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters. NaN coordinates yield NaN.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push h just past 1 for antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// `true` when `point` lies within the zone's circle, boundary included.
///
/// A missing point is never inside. A zone without a valid center, or with
/// a negative radius, counts as "no geofence configured" and lets every
/// point through.
pub fn is_inside_zone(point: Option<GeoPoint>, zone: &WorkZone) -> bool {
    let Some(point) = point else {
        return false;
    };
    let Some(center) = zone.center() else {
        return true;
    };
    let radius = zone.radius_m.unwrap_or(0.0);
    if !(radius >= 0.0) {
        return true;
    }

    distance_meters(point, center) <= radius
}

/// First zone with a complete center and radius, in list order.
pub fn predefined_zone(zones: &[WorkZone]) -> Option<&WorkZone> {
    zones.iter().find(|z| z.is_usable())
}

/// Result of resolving a position against the configured zones.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneMatch<'a> {
    pub zone: &'a WorkZone,
    pub distance_m: f64,
    pub inside: bool,
}

/// Picks the first usable zone containing `point`, falling back to the
/// nearest usable zone. `None` when no zone is usable.
pub fn select_zone(point: GeoPoint, zones: &[WorkZone]) -> Option<ZoneMatch<'_>> {
    let mut nearest: Option<ZoneMatch<'_>> = None;

    for zone in zones.iter().filter(|z| z.is_usable()) {
        let Some(center) = zone.center() else {
            continue;
        };
        let distance_m = distance_meters(point, center);

        if is_inside_zone(Some(point), zone) {
            return Some(ZoneMatch {
                zone,
                distance_m,
                inside: true,
            });
        }

        if nearest.as_ref().is_none_or(|n| distance_m < n.distance_m) {
            nearest = Some(ZoneMatch {
                zone,
                distance_m,
                inside: false,
            });
        }
    }

    nearest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::work_zone::ZoneKind;

    const DAKAR: GeoPoint = GeoPoint::raw(14.7167, -17.4677);

    fn zone(id: u64, center: Option<GeoPoint>, radius_m: Option<f64>) -> WorkZone {
        WorkZone {
            id,
            name: format!("zone-{id}"),
            latitude: center.map(|c| c.latitude),
            longitude: center.map(|c| c.longitude),
            radius_m,
            zone_kind: ZoneKind::Office,
            address: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance_meters(DAKAR, DAKAR), 0.0);
        let p = GeoPoint::raw(-33.8688, 151.2093);
        assert_eq!(distance_meters(p, p), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let pairs = [
            (DAKAR, GeoPoint::raw(14.72, -17.4677)),
            (GeoPoint::raw(48.8566, 2.3522), GeoPoint::raw(40.7128, -74.006)),
            (GeoPoint::raw(0.0, 179.9), GeoPoint::raw(0.0, -179.9)),
        ];
        for (a, b) in pairs {
            let ab = distance_meters(a, b);
            let ba = distance_meters(b, a);
            assert!((ab - ba).abs() < 1e-6, "{ab} != {ba}");
            assert!(ab >= 0.0);
        }
    }

    #[test]
    fn test_distance_known_values() {
        // 0.0033 degrees of latitude
        let d = distance_meters(DAKAR, GeoPoint::raw(14.72, -17.4677));
        assert!((d - 366.9).abs() < 1.0, "got {d}");

        // Paris to London, roughly 344 km
        let d = distance_meters(GeoPoint::raw(48.8566, 2.3522), GeoPoint::raw(51.5074, -0.1278));
        assert!((d - 343_556.0).abs() < 1_000.0, "got {d}");

        // across the antimeridian the short way round
        let d = distance_meters(GeoPoint::raw(0.0, 179.9), GeoPoint::raw(0.0, -179.9));
        assert!(d < 25_000.0, "got {d}");
    }

    #[test]
    fn test_antipodal_distance_is_half_circumference() {
        let half = std::f64::consts::PI * EARTH_RADIUS_M;
        let mut lat = -90.0;
        while lat <= 90.0 {
            let mut lng = -180.0;
            while lng <= 0.0 {
                let a = GeoPoint::raw(lat, lng);
                let b = GeoPoint::raw(-lat, lng + 180.0);
                let d = distance_meters(a, b);
                assert!(d.is_finite(), "({lat}, {lng}) gave {d}");
                assert!((d - half).abs() < 1.0, "({lat}, {lng}) gave {d}");
                lng += 15.0;
            }
            lat += 2.0;
        }

        // a zone covering the whole planet admits its antipode
        let z = zone(1, Some(GeoPoint::raw(82.0, 0.0)), Some(30_000_000.0));
        assert!(is_inside_zone(Some(GeoPoint::raw(-82.0, -180.0)), &z));
    }

    #[test]
    fn test_distance_propagates_nan() {
        assert!(distance_meters(GeoPoint::raw(f64::NAN, 0.0), DAKAR).is_nan());
    }

    #[test]
    fn test_inside_matches_distance_comparison() {
        let z = zone(1, Some(DAKAR), Some(100.0));
        let points = [
            DAKAR,
            GeoPoint::raw(14.7170, -17.4677),
            GeoPoint::raw(14.7200, -17.4677),
            GeoPoint::raw(14.7167, -17.4690),
        ];
        for p in points {
            assert_eq!(
                is_inside_zone(Some(p), &z),
                distance_meters(p, DAKAR) <= 100.0
            );
        }
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let p = GeoPoint::raw(14.7200, -17.4677);
        let exact = distance_meters(p, DAKAR);
        assert!(is_inside_zone(Some(p), &zone(1, Some(DAKAR), Some(exact))));
        assert!(!is_inside_zone(Some(p), &zone(1, Some(DAKAR), Some(exact - 0.001))));
    }

    #[test]
    fn test_missing_point_is_outside() {
        assert!(!is_inside_zone(None, &zone(1, Some(DAKAR), Some(100.0))));
        assert!(!is_inside_zone(None, &zone(2, None, None)));
    }

    #[test]
    fn test_unconfigured_zone_fails_open() {
        let far = GeoPoint::raw(-33.8688, 151.2093);
        assert!(is_inside_zone(Some(far), &zone(1, None, Some(100.0))));
        assert!(is_inside_zone(Some(far), &zone(2, Some(DAKAR), Some(-1.0))));

        let mut half = zone(3, Some(DAKAR), Some(10.0));
        half.longitude = None;
        assert!(is_inside_zone(Some(far), &half));
    }

    #[test]
    fn test_missing_radius_counts_as_zero() {
        let z = zone(1, Some(DAKAR), None);
        assert!(is_inside_zone(Some(DAKAR), &z));
        assert!(!is_inside_zone(Some(GeoPoint::raw(14.7168, -17.4677)), &z));
    }

    #[test]
    fn test_predefined_zone_skips_incomplete() {
        let zones = vec![
            zone(1, None, Some(50.0)),
            zone(2, Some(DAKAR), None),
            zone(3, Some(DAKAR), Some(50.0)),
        ];
        assert_eq!(predefined_zone(&zones).map(|z| z.id), Some(3));
        assert!(predefined_zone(&zones[..2]).is_none());
    }

    #[test]
    fn test_select_zone_prefers_containing_zone() {
        let far_office = zone(1, Some(GeoPoint::raw(14.80, -17.40)), Some(100.0));
        let site = zone(2, Some(DAKAR), Some(500.0));
        let zones = vec![far_office, site];

        let m = select_zone(GeoPoint::raw(14.7190, -17.4677), &zones).unwrap();
        assert_eq!(m.zone.id, 2);
        assert!(m.inside);
    }

    #[test]
    fn test_select_zone_reports_nearest_when_outside() {
        let zones = vec![
            zone(1, Some(GeoPoint::raw(15.0, -17.0)), Some(50.0)),
            zone(2, Some(DAKAR), Some(50.0)),
            zone(3, None, None),
        ];

        let m = select_zone(GeoPoint::raw(14.7200, -17.4677), &zones).unwrap();
        assert_eq!(m.zone.id, 2);
        assert!(!m.inside);
        assert!(m.distance_m > 50.0);
    }

    #[test]
    fn test_select_zone_none_without_usable_zone() {
        let zones = vec![zone(1, None, Some(50.0))];
        assert!(select_zone(DAKAR, &zones).is_none());
        assert!(select_zone(DAKAR, &[]).is_none());
    }
}
