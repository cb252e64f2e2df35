//! Position readings and how they are acquired.
//!
//! The authorization gate only ever sees a [`GeoPoint`]; everything about
//! accuracy, staleness and platform retries lives here.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::Display;
use tracing::{debug, warn};

use crate::geofence::{GeoPoint, normalize_coords};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionReading {
    pub point: GeoPoint,
    /// Reported accuracy radius, when the platform gives a positive one.
    pub accuracy_m: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl PositionReading {
    /// Builds a reading from raw platform coordinates, fixing swapped
    /// latitude/longitude and discarding non-positive accuracies.
    pub fn from_platform(
        latitude: f64,
        longitude: f64,
        accuracy_m: Option<f64>,
        observed_at: DateTime<Utc>,
    ) -> Option<Self> {
        let (lat, lng) = normalize_coords(latitude, longitude);
        let point = GeoPoint::new(lat, lng).ok()?;
        Some(Self {
            point,
            accuracy_m: accuracy_m.filter(|a| a.is_finite() && *a > 0.0),
            observed_at,
        })
    }

    pub fn is_stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now - self.observed_at > max_age
    }
}

/// Source of the latest known position.
pub trait PositionProvider: Send + Sync {
    fn latest(&self) -> Option<PositionReading>;
}

/// Latest reading no older than `max_age`; stale readings count as missing.
pub fn current_point(
    provider: &dyn PositionProvider,
    now: DateTime<Utc>,
    max_age: chrono::Duration,
) -> Option<GeoPoint> {
    provider
        .latest()
        .filter(|r| !r.is_stale(now, max_age))
        .map(|r| r.point)
}

/// Latest-wins snapshot fed by a watcher or periodic refresh.
#[derive(Debug, Default)]
pub struct LatestPosition {
    reading: RwLock<Option<PositionReading>>,
}

impl LatestPosition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `reading` unless a newer one is already held. Returns whether
    /// it was kept.
    pub fn record(&self, reading: PositionReading) -> bool {
        let mut slot = self.reading.write().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(current) if current.observed_at > reading.observed_at => false,
            _ => {
                *slot = Some(reading);
                true
            }
        }
    }

    pub fn clear(&self) {
        *self.reading.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl PositionProvider for LatestPosition {
    fn latest(&self) -> Option<PositionReading> {
        *self.reading.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PositionError {
    #[display(fmt = "location permission denied")]
    PermissionDenied,
    #[display(fmt = "position unavailable")]
    Unavailable,
    #[display(fmt = "position request timed out")]
    Timeout,
}

impl std::error::Error for PositionError {}

/// One acquisition attempt's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireRequest {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the platform may answer with.
    pub max_age: Duration,
}

impl AcquireRequest {
    pub const CACHE_FIRST: Self = Self {
        high_accuracy: false,
        timeout: Duration::from_secs(4),
        max_age: Duration::from_secs(300),
    };
    pub const NETWORK: Self = Self {
        high_accuracy: false,
        timeout: Duration::from_secs(8),
        max_age: Duration::from_secs(60),
    };
    pub const GPS: Self = Self {
        high_accuracy: true,
        timeout: Duration::from_secs(12),
        max_age: Duration::ZERO,
    };
}

/// A platform location service.
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn acquire(&self, request: AcquireRequest) -> Result<PositionReading, PositionError>;
}

/// Tries progressively slower, more accurate requests until one answers:
/// a cached fix, then a network fix, then GPS.
pub struct TieredPositionSource<S> {
    source: S,
    tiers: Vec<AcquireRequest>,
}

impl<S: PositionSource> TieredPositionSource<S> {
    pub fn new(source: S) -> Self {
        Self::with_tiers(
            source,
            vec![AcquireRequest::CACHE_FIRST, AcquireRequest::NETWORK, AcquireRequest::GPS],
        )
    }

    pub fn with_tiers(source: S, tiers: Vec<AcquireRequest>) -> Self {
        Self { source, tiers }
    }

    pub async fn acquire(&self) -> Result<PositionReading, PositionError> {
        let mut last_error = PositionError::Unavailable;

        for (tier, request) in self.tiers.iter().enumerate() {
            match tokio::time::timeout(request.timeout, self.source.acquire(*request)).await {
                Ok(Ok(reading)) => {
                    debug!(tier, accuracy_m = ?reading.accuracy_m, "position acquired");
                    return Ok(reading);
                }
                Ok(Err(e)) => {
                    debug!(tier, error = %e, "position tier failed");
                    last_error = e;
                }
                Err(_) => {
                    debug!(tier, "position tier timed out");
                    last_error = PositionError::Timeout;
                }
            }
        }

        warn!(error = %last_error, "all position tiers failed");
        Err(last_error)
    }

    /// Acquires a reading and stores it in `sink`. A failed refresh clears
    /// the sink: the last known position no longer counts.
    pub async fn refresh_into(
        &self,
        sink: &LatestPosition,
    ) -> Result<PositionReading, PositionError> {
        match self.acquire().await {
            Ok(reading) => {
                sink.record(reading);
                Ok(reading)
            }
            Err(e) => {
                sink.clear();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn reading(lat: f64, observed_at: &str) -> PositionReading {
        PositionReading {
            point: GeoPoint::raw(lat, -17.4677),
            accuracy_m: Some(12.0),
            observed_at: observed_at.parse().unwrap(),
        }
    }

    #[test]
    fn test_latest_wins() {
        let latest = LatestPosition::new();
        assert!(latest.latest().is_none());

        assert!(latest.record(reading(14.71, "2026-03-02T09:00:05Z")));
        assert!(!latest.record(reading(14.72, "2026-03-02T09:00:00Z")));
        assert_eq!(latest.latest().unwrap().point.latitude, 14.71);

        assert!(latest.record(reading(14.73, "2026-03-02T09:00:10Z")));
        assert_eq!(latest.latest().unwrap().point.latitude, 14.73);

        latest.clear();
        assert!(latest.latest().is_none());
    }

    #[test]
    fn test_stale_reading_is_unavailable() {
        let latest = LatestPosition::new();
        latest.record(reading(14.71, "2026-03-02T09:00:00Z"));
        let max_age = chrono::Duration::seconds(60);

        let fresh = "2026-03-02T09:00:30Z".parse().unwrap();
        assert!(current_point(&latest, fresh, max_age).is_some());

        let late = "2026-03-02T09:05:00Z".parse().unwrap();
        assert!(current_point(&latest, late, max_age).is_none());
    }

    #[test]
    fn test_from_platform_normalizes() {
        let now = Utc::now();
        let r = PositionReading::from_platform(-117.16, 32.71, Some(0.0), now).unwrap();
        assert_eq!(r.point, GeoPoint::raw(32.71, -117.16));
        assert_eq!(r.accuracy_m, None);
        assert!(PositionReading::from_platform(f64::NAN, 1.0, None, now).is_none());
    }

    struct ScriptedSource {
        answers: Mutex<Vec<Option<Result<PositionReading, PositionError>>>>,
        seen: Mutex<Vec<AcquireRequest>>,
    }

    #[async_trait]
    impl PositionSource for ScriptedSource {
        async fn acquire(&self, request: AcquireRequest) -> Result<PositionReading, PositionError> {
            self.seen.lock().unwrap().push(request);
            let next = self.answers.lock().unwrap().remove(0);
            match next {
                Some(answer) => answer,
                // never answers: exercise the tier timeout
                None => std::future::pending().await,
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_tiers_fall_through_until_success() {
        let source = ScriptedSource {
            answers: Mutex::new(vec![
                Some(Err(PositionError::Unavailable)),
                None,
                Some(Ok(reading(14.7167, "2026-03-02T09:00:00Z"))),
            ]),
            seen: Mutex::new(Vec::new()),
        };
        let tiered = TieredPositionSource::new(source);
        let sink = LatestPosition::new();

        let got = tiered.refresh_into(&sink).await.unwrap();
        assert_eq!(got.point.latitude, 14.7167);
        assert_eq!(sink.latest(), Some(got));

        let seen = tiered.source.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![AcquireRequest::CACHE_FIRST, AcquireRequest::NETWORK, AcquireRequest::GPS]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_tiers_failing_reports_last_error() {
        let source = ScriptedSource {
            answers: Mutex::new(vec![Some(Err(PositionError::PermissionDenied)), None]),
            seen: Mutex::new(Vec::new()),
        };
        let tiered = TieredPositionSource::with_tiers(
            source,
            vec![AcquireRequest::CACHE_FIRST, AcquireRequest::NETWORK],
        );

        assert_eq!(tiered.acquire().await, Err(PositionError::Timeout));
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_sink() {
        let source = ScriptedSource {
            answers: Mutex::new(vec![Some(Err(PositionError::PermissionDenied))]),
            seen: Mutex::new(Vec::new()),
        };
        let tiered = TieredPositionSource::with_tiers(source, vec![AcquireRequest::GPS]);
        let sink = LatestPosition::new();
        sink.record(reading(14.7167, "2026-03-02T09:00:00Z"));

        assert_eq!(
            tiered.refresh_into(&sink).await,
            Err(PositionError::PermissionDenied)
        );
        assert!(sink.latest().is_none());
    }
}
