use anyhow::{Context, Result};
use futures_util::TryStreamExt;
use moka::future::Cache;
use once_cell::sync::OnceCell;
use sqlx::MySqlPool;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::model::work_zone::{WorkZone, WorkZoneRow};

const SNAPSHOT_KEY: &str = "zones";

/// Bumped by every zone write. A snapshot loaded under an older generation
/// is never served, even if its load finished after the write.
static GENERATION: AtomicU64 = AtomicU64::new(0);

#[derive(Clone)]
struct Snapshot {
    generation: u64,
    zones: Arc<Vec<WorkZone>>,
}

impl Snapshot {
    fn is_current(&self) -> bool {
        self.generation == GENERATION.load(Ordering::Acquire)
    }
}

/// Current zone list, read on every check. A single-entry cache: zones are
/// few and always read together, in id order.
static ZONE_CACHE: OnceCell<Cache<&'static str, Snapshot>> = OnceCell::new();

pub fn init(ttl: Duration) {
    let _ = ZONE_CACHE.set(Cache::builder().max_capacity(1).time_to_live(ttl).build());
}

fn cache() -> &'static Cache<&'static str, Snapshot> {
    ZONE_CACHE.get_or_init(|| {
        Cache::builder()
            .max_capacity(1)
            .time_to_live(Duration::from_secs(300))
            .build()
    })
}

pub async fn load_zones(pool: &MySqlPool) -> Result<Vec<WorkZone>> {
    let rows: Vec<WorkZoneRow> = sqlx::query_as::<_, WorkZoneRow>(
        r#"
        SELECT id, name, latitude, longitude, radius_m, zone_kind, address, created_at, updated_at
        FROM work_zones
        ORDER BY id
        "#,
    )
    .fetch(pool)
    .try_collect()
    .await
    .context("failed to load work zones")?;

    rows.into_iter()
        .map(|row| WorkZone::try_from(row).context("unknown zone kind in work_zones"))
        .collect()
}

/// Zone snapshot, from cache when fresh.
pub async fn zones(pool: &MySqlPool) -> Result<Arc<Vec<WorkZone>>> {
    if let Some(snapshot) = cache().get(SNAPSHOT_KEY).await {
        if snapshot.is_current() {
            return Ok(snapshot.zones);
        }
    }

    // read before loading so a write racing the load invalidates its result
    let generation = GENERATION.load(Ordering::Acquire);
    let zones = Arc::new(load_zones(pool).await?);

    let snapshot = Snapshot {
        generation,
        zones: zones.clone(),
    };
    if snapshot.is_current() {
        cache().insert(SNAPSHOT_KEY, snapshot).await;
    }
    Ok(zones)
}

/// Drops the snapshot after a zone write.
pub async fn invalidate() {
    GENERATION.fetch_add(1, Ordering::AcqRel);
    cache().invalidate(SNAPSHOT_KEY).await;
}

pub async fn warmup_zone_cache(pool: &MySqlPool) -> Result<()> {
    let zones = zones(pool).await?;
    let usable = zones.iter().filter(|z| z.is_usable()).count();

    log::info!(
        "Zone cache warmup complete: {} zones ({} usable for checks)",
        zones.len(),
        usable
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_retires_snapshot_loaded_before_it() {
        let loaded = Snapshot {
            generation: GENERATION.load(Ordering::Acquire),
            zones: Arc::new(Vec::new()),
        };
        assert!(loaded.is_current());

        invalidate().await;
        assert!(!loaded.is_current());

        // a late insert of the old snapshot is not served
        cache().insert(SNAPSHOT_KEY, loaded).await;
        let cached = cache().get(SNAPSHOT_KEY).await;
        assert!(cached.is_some_and(|s| !s.is_current()));
    }
}
