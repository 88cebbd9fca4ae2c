// Request-coalescing wrapper around the asset producer
// Author: kelexine (https://github.com/kelexine)
//
// The only place the producer is invoked. A per-key async lock makes
// concurrent misses for the same fingerprint wait for the first caller, which
// then finds the stored value. The producer always runs outside any cache lock.

use super::entry::ApproxSize;
use super::keys::CacheKey;
use super::registry::GenerationalCache;
use crate::error::CacheError;
use crate::metrics;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

type Slot = (String, CacheKey);

pub struct Coalescer<V> {
    registry: Arc<GenerationalCache<V>>,
    in_flight: Mutex<HashMap<Slot, Arc<AsyncMutex<()>>>>,
    dedupe: bool,
}

/// Membership in a slot's in-flight queue. The last member out removes the slot.
struct Flight<'a, V> {
    owner: &'a Coalescer<V>,
    slot: Slot,
    lock: Arc<AsyncMutex<()>>,
}

impl<V> Drop for Flight<'_, V> {
    fn drop(&mut self) {
        let mut table = self.owner.in_flight.lock();
        let last = table
            .get(&self.slot)
            .map(|current| Arc::ptr_eq(current, &self.lock) && Arc::strong_count(&self.lock) == 2)
            .unwrap_or(false);
        if last {
            table.remove(&self.slot);
        }
    }
}

impl<V> Coalescer<V>
where
    V: Clone + ApproxSize,
{
    pub fn new(registry: Arc<GenerationalCache<V>>) -> Self {
        let dedupe = registry.settings().dedupe_in_flight;
        Self {
            registry,
            in_flight: Mutex::new(HashMap::new()),
            dedupe,
        }
    }

    /// Toggle waiting on an in-progress producer call for the same key.
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn registry(&self) -> &Arc<GenerationalCache<V>> {
        &self.registry
    }

    /// Number of keys with a producer call pending or queued.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Return the cached asset for `params`, producing and storing it on a miss.
    ///
    /// Key derivation failures are converted into `E`. Producer errors are
    /// returned exactly as produced and never cached.
    pub async fn get_or_generate<P, F, Fut, E>(
        &self,
        generation: &str,
        params: &P,
        producer: F,
    ) -> Result<V, E>
    where
        P: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: From<CacheError>,
    {
        let key = CacheKey::derive(generation, params)?;

        if !self.dedupe {
            return self.lookup_or_produce(generation, key, producer).await;
        }

        let flight = self.join(generation, key);
        let _turn = flight.lock.lock().await;
        self.lookup_or_produce(generation, key, producer).await
    }

    fn join(&self, generation: &str, key: CacheKey) -> Flight<'_, V> {
        let slot = (generation.to_string(), key);
        let lock = Arc::clone(
            self.in_flight
                .lock()
                .entry(slot.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        );
        Flight {
            owner: self,
            slot,
            lock,
        }
    }

    async fn lookup_or_produce<F, Fut, E>(
        &self,
        generation: &str,
        key: CacheKey,
        producer: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: From<CacheError>,
    {
        // Rejected generations fail here, before the producer runs
        if let Some(value) = self.registry.get(generation, &key)? {
            debug!(generation, key = %key.short(), "Serving cached asset");
            return Ok(value);
        }

        debug!(generation, key = %key.short(), "Cache miss, invoking producer");
        let started = Instant::now();
        let outcome = producer().await;
        metrics::record_producer_call(
            generation,
            outcome.is_ok(),
            started.elapsed().as_secs_f64(),
        );

        match outcome {
            Ok(value) => {
                self.registry.set(generation, key, value.clone(), None)?;
                Ok(value)
            }
            Err(e) => {
                warn!(generation, key = %key.short(), "Producer failed; result not cached");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde::ser::Error as _;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    enum RenderError {
        Cache(String),
        Failed(&'static str),
    }

    impl From<CacheError> for RenderError {
        fn from(e: CacheError) -> Self {
            RenderError::Cache(e.to_string())
        }
    }

    #[derive(Serialize)]
    struct SigilParams {
        glyph: &'static str,
        size: u32,
    }

    fn coalescer() -> Coalescer<Bytes> {
        Coalescer::new(Arc::new(GenerationalCache::default()))
    }

    async fn render(calls: &AtomicUsize, delay_ms: u64) -> Result<Bytes, RenderError> {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        Ok(Bytes::from_static(b"\x89PNG"))
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let coalescer = coalescer();
        let calls = AtomicUsize::new(0);
        let params = SigilParams {
            glyph: "ansuz",
            size: 256,
        };

        let first = coalescer
            .get_or_generate("sigil", &params, || render(&calls, 0))
            .await
            .unwrap();
        let second = coalescer
            .get_or_generate("sigil", &params, || render(&calls, 0))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = coalescer.registry().stats("sigil").unwrap();
        assert_eq!((stats.hits, stats.misses, stats.total_set), (1, 1, 1));
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_producer_error_propagates_and_is_not_cached() {
        let coalescer = coalescer();
        let params = SigilParams {
            glyph: "broken",
            size: 8,
        };

        let result: Result<Bytes, RenderError> = coalescer
            .get_or_generate("sigil", &params, || async { Err(RenderError::Failed("kiln cold")) })
            .await;
        assert_eq!(result, Err(RenderError::Failed("kiln cold")));

        let stats = coalescer.registry().stats("sigil").unwrap();
        assert_eq!(stats.total_set, 0);
        assert_eq!(stats.size, 0);

        let calls = AtomicUsize::new(0);
        coalescer
            .get_or_generate("sigil", &params, || render(&calls, 0))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_key_error_skips_producer() {
        struct Unhashable;
        impl Serialize for Unhashable {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(S::Error::custom("opaque handle"))
            }
        }

        let coalescer = coalescer();
        let calls = AtomicUsize::new(0);
        let result = coalescer
            .get_or_generate("enso", &Unhashable, || render(&calls, 0))
            .await;

        assert!(matches!(result, Err(RenderError::Cache(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_generation_skips_producer() {
        let settings = crate::config::CacheSettings {
            max_fallback_generations: 0,
            ..Default::default()
        };
        let coalescer = Coalescer::new(Arc::new(GenerationalCache::new(settings).unwrap()));
        let calls = AtomicUsize::new(0);
        let params = SigilParams {
            glyph: "wunjo",
            size: 32,
        };

        let result = coalescer
            .get_or_generate("watercolor", &params, || render(&calls, 0))
            .await;

        assert!(matches!(result, Err(RenderError::Cache(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(coalescer.registry().generations().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_producer_call() {
        let coalescer = coalescer();
        let calls = AtomicUsize::new(0);
        let params = SigilParams {
            glyph: "kenaz",
            size: 512,
        };

        let (a, b) = tokio::join!(
            coalescer.get_or_generate("sigil", &params, || render(&calls, 30)),
            coalescer.get_or_generate("sigil", &params, || render(&calls, 30)),
        );

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_without_dedupe_both_misses_produce() {
        let coalescer = coalescer().with_dedupe(false);
        let calls = AtomicUsize::new(0);
        let params = SigilParams {
            glyph: "kenaz",
            size: 512,
        };

        let (a, b) = tokio::join!(
            coalescer.get_or_generate("sigil", &params, || render(&calls, 30)),
            coalescer.get_or_generate("sigil", &params, || render(&calls, 30)),
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(coalescer.registry().stats("sigil").unwrap().size, 1);
    }

    #[tokio::test]
    async fn test_waiter_retries_after_failed_leader() {
        let coalescer = coalescer();
        let calls = AtomicUsize::new(0);
        let params = SigilParams {
            glyph: "hagalaz",
            size: 64,
        };

        let counter = &calls;
        let failing = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err::<Bytes, _>(RenderError::Failed("crack"))
        };

        let (leader, waiter) = tokio::join!(
            coalescer.get_or_generate("sigil", &params, failing),
            coalescer.get_or_generate("sigil", &params, || render(&calls, 0)),
        );

        assert_eq!(leader, Err(RenderError::Failed("crack")));
        assert!(waiter.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_distinct_generations_do_not_share_results() {
        let coalescer = coalescer();
        let calls = AtomicUsize::new(0);
        let params = SigilParams {
            glyph: "same",
            size: 1,
        };

        coalescer
            .get_or_generate("enso", &params, || render(&calls, 0))
            .await
            .unwrap();
        coalescer
            .get_or_generate("directed_enso", &params, || render(&calls, 0))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
