//! Byte-level cache facade consumed by the API layer.
//!
//! `AssetCache` is constructed once at startup and handed to whoever owns the
//! routes. It exposes the lookup/store/clear/stats calls over raw keys and
//! image bytes, plus the producer-wrapping `generate` path.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use super::coalesce::Coalescer;
use super::keys::CacheKey;
use super::models::{CacheStats, StatsRecord};
use super::registry::GenerationalCache;
use crate::config::CacheSettings;
use crate::error::{CacheError, Result};
use bytes::Bytes;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct AssetCache {
    registry: Arc<GenerationalCache<Bytes>>,
    coalescer: Coalescer<Bytes>,
}

impl AssetCache {
    pub fn new(settings: CacheSettings) -> Result<Self> {
        let registry = Arc::new(GenerationalCache::new(settings)?);
        let coalescer = Coalescer::new(Arc::clone(&registry));
        Ok(Self {
            registry,
            coalescer,
        })
    }

    pub fn registry(&self) -> &Arc<GenerationalCache<Bytes>> {
        &self.registry
    }

    /// Returns `(found, value)`; `value` is empty when nothing was found.
    ///
    /// A generation that was never stored into is a miss and is not created.
    pub fn lookup(&self, generation: &str, key: &[u8]) -> Result<(bool, Bytes)> {
        let key = CacheKey::try_from(key)?;
        Ok(match self.registry.get_existing(generation, &key) {
            Some(value) => (true, value),
            None => (false, Bytes::new()),
        })
    }

    /// Store `value`. A zero or negative `ttl_seconds` stores an already-expired entry.
    pub fn store(
        &self,
        generation: &str,
        key: &[u8],
        value: Bytes,
        ttl_seconds: Option<f64>,
    ) -> Result<()> {
        let key = CacheKey::try_from(key)?;
        let ttl = ttl_seconds.map(ttl_from_seconds).transpose()?;
        debug!(generation, key = %key.short(), bytes = value.len(), "Storing asset");
        self.registry.set(generation, key, value, ttl)
    }

    /// Empty one generation, or every generation when `generation` is `None`.
    pub fn clear(&self, generation: Option<&str>) {
        match generation {
            Some(generation) => self.registry.clear(generation),
            None => self.registry.clear_all(),
        }
    }

    /// Single-generation stats, or the aggregate across all generations.
    ///
    /// Asking about a generation that was never used reports an empty cache
    /// with the configuration it would be created with.
    pub fn stats(&self, generation: Option<&str>) -> StatsRecord {
        match generation {
            Some(generation) => {
                let stats = self.registry.stats(generation).unwrap_or_else(|| {
                    let config = self.registry.configured(generation);
                    CacheStats {
                        max_size: config.capacity,
                        default_ttl_seconds: config.default_ttl().as_secs_f64(),
                        ..Default::default()
                    }
                });
                StatsRecord::Generation {
                    generation: generation.to_string(),
                    stats,
                }
            }
            None => StatsRecord::Aggregate(self.registry.aggregate_stats()),
        }
    }

    /// Serve `params` from cache or run `producer` and cache its output.
    pub async fn generate<P, F, Fut, E>(
        &self,
        generation: &str,
        params: &P,
        producer: F,
    ) -> std::result::Result<Bytes, E>
    where
        P: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<Bytes, E>>,
        E: From<CacheError>,
    {
        self.coalescer
            .get_or_generate(generation, params, producer)
            .await
    }

    pub fn purge_expired(&self) -> usize {
        self.registry.purge_expired()
    }

    /// Periodically drop expired entries so idle generations release memory.
    pub fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let period = self.registry.settings().sweep_interval()?;
        let cache = Arc::clone(self);

        info!(interval_seconds = period.as_secs(), "Starting expiry sweeper");
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // Skip the first immediate tick
            loop {
                interval.tick().await;
                let purged = cache.purge_expired();
                if purged > 0 {
                    debug!(purged, "Expiry sweep removed entries");
                }
            }
        }))
    }
}

fn ttl_from_seconds(seconds: f64) -> Result<Duration> {
    if seconds.is_nan() {
        return Err(CacheError::InvalidRequest("ttl_seconds must be a number".to_string()));
    }
    if seconds <= 0.0 {
        return Ok(Duration::ZERO);
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| CacheError::InvalidRequest(format!("ttl_seconds out of range: {}", e)))
}
