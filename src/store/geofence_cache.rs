use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use super::GeofenceSource;
use crate::model::geofence::Geofence;

/// Caches the geofence list so check-in bursts at the start of the day
/// don't each hit the database. Admin edits show up after `ttl`.
pub struct CachedGeofenceSource {
    inner: Arc<dyn GeofenceSource>,
    cache: Cache<(), Arc<Vec<Geofence>>>,
}

impl CachedGeofenceSource {
    pub fn new(inner: Arc<dyn GeofenceSource>, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }
}

#[async_trait]
impl GeofenceSource for CachedGeofenceSource {
    async fn list_geofences(&self) -> anyhow::Result<Vec<Geofence>> {
        let fences = self
            .cache
            .try_get_with((), async {
                self.inner.list_geofences().await.map(Arc::new)
            })
            .await
            .map_err(|e| anyhow::anyhow!("failed to load geofences: {e}"))?;

        Ok(fences.as_ref().clone())
    }
}
