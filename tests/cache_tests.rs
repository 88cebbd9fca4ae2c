// Cache behavior tests - testing only public APIs
// Author: kelexine (https://github.com/kelexine)

use bytes::Bytes;
use glyphcache::cache::{BoundedCache, CacheKey, GenerationalCache};
use glyphcache::config::{CacheSettings, GenerationConfig};
use proptest::prelude::*;
use std::time::Duration;

fn png(tag: &'static [u8]) -> Bytes {
    Bytes::from_static(tag)
}

#[test]
fn test_two_slot_scenario() {
    let cache = BoundedCache::new(2, Duration::from_secs(100));

    cache.set("a", png(b"imgA"));
    cache.set("b", png(b"imgB"));
    cache.set("c", png(b"imgC"));
    assert_eq!(cache.stats().evictions, 1);

    assert_eq!(cache.get(&"a"), None);
    assert_eq!(cache.get(&"b"), Some(png(b"imgB")));
    assert_eq!(cache.get(&"c"), Some(png(b"imgC")));

    let stats = cache.stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.size, 2);
    assert_eq!(stats.max_size, 2);
    assert!((stats.hit_rate - 2.0 / 3.0).abs() < 1e-12);
}

#[test]
fn test_fresh_cache_stats() {
    let cache: BoundedCache<CacheKey, Bytes> = BoundedCache::new(8, Duration::from_secs(10));
    let stats = cache.stats();

    assert_eq!(stats.hits, 0);
    assert_eq!(stats.misses, 0);
    assert_eq!(stats.size, 0);
    assert_eq!(stats.hit_rate, 0.0);
}

#[test]
fn test_filling_one_generation_leaves_another_untouched() {
    let mut settings = CacheSettings::default();
    settings
        .generations
        .insert("parchment".to_string(), GenerationConfig::new(2, 3600));
    let registry: GenerationalCache<Bytes> = GenerationalCache::new(settings).unwrap();

    let enso_key = CacheKey::derive("enso", &("circle", 1)).unwrap();
    registry.set("enso", enso_key, png(b"enso"), None).unwrap();
    let enso_before = registry.stats("enso").unwrap();

    for i in 0..5u32 {
        let key = CacheKey::derive("parchment", &i).unwrap();
        registry.set("parchment", key, png(b"sheet"), None).unwrap();
    }

    assert_eq!(registry.stats("parchment").unwrap().evictions, 3);
    assert_eq!(registry.stats("enso").unwrap(), enso_before);
    assert_eq!(registry.get("enso", &enso_key).unwrap(), Some(png(b"enso")));
}

proptest! {
    #[test]
    fn prop_capacity_never_exceeded(
        capacity in 0usize..8,
        keys in prop::collection::vec(0u8..32, 0..64),
    ) {
        let cache = BoundedCache::new(capacity, Duration::from_secs(60));
        for key in keys {
            cache.set(key, vec![key]);
            prop_assert!(cache.len() <= capacity);
        }
    }

    #[test]
    fn prop_matches_reference_lru(
        capacity in 1usize..6,
        ops in prop::collection::vec((any::<bool>(), 0u8..10), 0..80),
    ) {
        let cache = BoundedCache::new(capacity, Duration::from_secs(60));
        // Front is least recently used
        let mut model: Vec<(u8, Vec<u8>)> = Vec::new();

        for (step, (is_set, key)) in ops.into_iter().enumerate() {
            let position = model.iter().position(|(k, _)| *k == key);
            if is_set {
                let value = vec![key, step as u8];
                if let Some(position) = position {
                    model.remove(position);
                }
                model.push((key, value.clone()));
                if model.len() > capacity {
                    model.remove(0);
                }
                cache.set(key, value);
            } else {
                let expected = position.map(|position| {
                    let entry = model.remove(position);
                    let value = entry.1.clone();
                    model.push(entry);
                    value
                });
                prop_assert_eq!(cache.get(&key), expected);
            }
            prop_assert_eq!(cache.len(), model.len());
        }
    }
}
