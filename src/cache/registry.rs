//! Generational cache registry.
//!
//! Routes each asset generation to its own [`BoundedCache`], created lazily
//! from the configured `(capacity, default_ttl)` table. Generations never share
//! state: eviction or expiry in one cannot touch another.
//!
//! The outer lock only guards the map of caches. Delegated `get`/`set` calls
//! clone the generation's `Arc` and release it before touching the cache.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use super::bounded::BoundedCache;
use super::entry::ApproxSize;
use super::keys::CacheKey;
use super::models::{AggregateStats, CacheStats};
use crate::config::{is_reserved_generation, CacheSettings, GenerationConfig};
use crate::error::{CacheError, Result};
use crate::metrics;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub type GenerationHandle<V> = Arc<BoundedCache<CacheKey, V>>;

pub struct GenerationalCache<V> {
    settings: CacheSettings,
    caches: RwLock<HashMap<String, GenerationHandle<V>>>,
    /// Generations created from the fallback pair
    fallbacks: RwLock<BTreeSet<String>>,
}

impl<V> GenerationalCache<V>
where
    V: Clone + ApproxSize,
{
    /// Build a registry from validated settings.
    ///
    /// Fails with a configuration error when any configured generation (or
    /// the fallback pair) has a zero capacity or a negative TTL.
    pub fn new(settings: CacheSettings) -> Result<Self> {
        settings.validate()?;
        info!(
            generations = settings.generations.len(),
            fallback_capacity = settings.default.capacity,
            fallback_ttl_seconds = settings.default.default_ttl_seconds,
            "Generational cache configured"
        );
        Ok(Self {
            settings,
            caches: RwLock::new(HashMap::new()),
            fallbacks: RwLock::new(BTreeSet::new()),
        })
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    /// Cache for `generation`, constructing it on first use.
    ///
    /// Fails with `InvalidRequest` for reserved names, and for unconfigured
    /// names once `max_fallback_generations` fallback caches already exist.
    pub fn get_cache(&self, generation: &str) -> Result<GenerationHandle<V>> {
        if let Some(cache) = self.caches.read().get(generation) {
            return Ok(Arc::clone(cache));
        }

        let mut caches = self.caches.write();
        // Another caller may have won the race while we waited for the write lock
        if let Some(cache) = caches.get(generation) {
            return Ok(Arc::clone(cache));
        }

        let config = self.resolve(generation)?;
        debug!(
            generation,
            capacity = config.capacity,
            ttl_seconds = config.default_ttl_seconds,
            "Creating generation cache"
        );
        let cache = Arc::new(
            BoundedCache::new(config.capacity, config.default_ttl()).with_name(generation),
        );
        caches.insert(generation.to_string(), Arc::clone(&cache));
        Ok(cache)
    }

    // Called with the `caches` write lock held
    fn resolve(&self, generation: &str) -> Result<GenerationConfig> {
        if is_reserved_generation(generation) {
            return Err(CacheError::InvalidRequest(format!(
                "generation name '{}' is reserved",
                generation
            )));
        }
        if let Some(config) = self.settings.lookup(generation) {
            return Ok(config);
        }

        let mut fallbacks = self.fallbacks.write();
        if fallbacks.len() >= self.settings.max_fallback_generations {
            warn!(
                generation,
                limit = self.settings.max_fallback_generations,
                "Rejecting unknown generation, fallback limit reached"
            );
            return Err(CacheError::InvalidRequest(format!(
                "unknown generation '{}': fallback limit of {} reached",
                generation, self.settings.max_fallback_generations
            )));
        }

        warn!(
            generation,
            capacity = self.settings.default.capacity,
            ttl_seconds = self.settings.default.default_ttl_seconds,
            "Unknown generation, using fallback cache configuration"
        );
        metrics::record_fallback_generation(generation);
        fallbacks.insert(generation.to_string());
        Ok(self.settings.default)
    }

    /// The pair `generation` would be built with, without creating it.
    pub fn configured(&self, generation: &str) -> GenerationConfig {
        self.settings
            .lookup(generation)
            .unwrap_or(self.settings.default)
    }

    fn existing(&self, generation: &str) -> Option<GenerationHandle<V>> {
        self.caches.read().get(generation).cloned()
    }

    fn snapshot(&self) -> Vec<(String, GenerationHandle<V>)> {
        self.caches
            .read()
            .iter()
            .map(|(name, cache)| (name.clone(), Arc::clone(cache)))
            .collect()
    }

    pub fn get(&self, generation: &str, key: &CacheKey) -> Result<Option<V>> {
        Ok(self.get_cache(generation)?.get(key))
    }

    /// Like [`get`](Self::get), but a generation that was never constructed
    /// is a plain miss and stays uncreated.
    pub fn get_existing(&self, generation: &str, key: &CacheKey) -> Option<V> {
        self.existing(generation)?.get(key)
    }

    /// Store `value`; `ttl` of `None` uses the generation's default TTL.
    pub fn set(
        &self,
        generation: &str,
        key: CacheKey,
        value: V,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let cache = self.get_cache(generation)?;
        match ttl {
            Some(ttl) => cache.set_with_ttl(key, value, ttl),
            None => cache.set(key, value),
        }
        Ok(())
    }

    pub fn remove(&self, generation: &str, key: &CacheKey) -> Option<V> {
        self.existing(generation)?.remove(key)
    }

    /// Empty one generation. Unknown generations are left uncreated.
    pub fn clear(&self, generation: &str) {
        if let Some(cache) = self.existing(generation) {
            cache.clear();
        }
    }

    /// Empty every constructed generation, keeping the registry structure.
    pub fn clear_all(&self) {
        let caches = self.snapshot();
        for (_, cache) in &caches {
            cache.clear();
        }
        info!(generations = caches.len(), "Cleared all generation caches");
    }

    /// Sweep expired entries from every generation.
    pub fn purge_expired(&self) -> usize {
        self.snapshot()
            .iter()
            .map(|(_, cache)| cache.purge_expired())
            .sum()
    }

    pub fn reset_stats(&self) {
        for (_, cache) in self.snapshot() {
            cache.reset_stats();
        }
    }

    /// Names of the generations constructed so far, sorted.
    pub fn generations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Stats for one generation, or `None` if it was never used.
    pub fn stats(&self, generation: &str) -> Option<CacheStats> {
        self.existing(generation).map(|cache| cache.stats())
    }

    pub fn aggregate_stats(&self) -> AggregateStats {
        let per_generation = self
            .snapshot()
            .into_iter()
            .map(|(name, cache)| (name, cache.stats()));
        let fallbacks = self.fallbacks.read().iter().cloned().collect();
        AggregateStats::from_generations(per_generation, fallbacks)
    }
}

impl<V> Default for GenerationalCache<V>
where
    V: Clone + ApproxSize,
{
    fn default() -> Self {
        Self {
            settings: CacheSettings::default(),
            caches: RwLock::new(HashMap::new()),
            fallbacks: RwLock::new(BTreeSet::new()),
        }
    }
}
