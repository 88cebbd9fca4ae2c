//! Cache statistics models.

// Author: kelexine (https://github.com/kelexine)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics for one generation's bounded cache.
///
/// Counters are cumulative for the cache's lifetime; `clear` empties the
/// cache but leaves them untouched.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that returned a live entry.
    pub hits: u64,
    /// Lookups that found nothing (including expired entries).
    pub misses: u64,
    /// Live entries dropped to honor the capacity.
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed.
    pub expired: u64,
    /// Every store, including overwrites.
    pub total_set: u64,
    /// Current number of entries.
    pub size: usize,
    /// Configured capacity.
    pub max_size: usize,
    /// TTL applied when a store does not supply one.
    pub default_ttl_seconds: f64,
    /// Sum of entry size estimates.
    pub approx_bytes: usize,
    /// `hits / (hits + misses)`, or 0 before the first lookup.
    pub hit_rate: f64,
}

/// Counters summed across every generation.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub total_hits: u64,
    pub total_misses: u64,
    pub total_evictions: u64,
    pub total_expired: u64,
    pub total_set: u64,
    pub total_size: usize,
    pub total_approx_bytes: usize,
    /// Computed from the summed hits and misses, not averaged per generation.
    pub overall_hit_rate: f64,
    /// Lazily created generations that used the fallback configuration.
    pub fallback_generations: Vec<String>,
    pub per_generation: BTreeMap<String, CacheStats>,
}

/// Either statistics shape, as returned by the external stats call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum StatsRecord {
    Generation {
        generation: String,
        #[serde(flatten)]
        stats: CacheStats,
    },
    Aggregate(AggregateStats),
}

pub fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits + misses;
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

impl AggregateStats {
    pub fn from_generations<I>(generations: I, fallback_generations: Vec<String>) -> Self
    where
        I: IntoIterator<Item = (String, CacheStats)>,
    {
        let mut aggregate = AggregateStats {
            fallback_generations,
            ..Default::default()
        };

        for (name, stats) in generations {
            aggregate.total_hits += stats.hits;
            aggregate.total_misses += stats.misses;
            aggregate.total_evictions += stats.evictions;
            aggregate.total_expired += stats.expired;
            aggregate.total_set += stats.total_set;
            aggregate.total_size += stats.size;
            aggregate.total_approx_bytes += stats.approx_bytes;
            aggregate.per_generation.insert(name, stats);
        }

        aggregate.overall_hit_rate = hit_rate(aggregate.total_hits, aggregate.total_misses);
        aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_guards_zero() {
        assert_eq!(hit_rate(0, 0), 0.0);
        assert_eq!(hit_rate(2, 1), 2.0 / 3.0);
    }

    #[test]
    fn test_overall_rate_uses_summed_counters() {
        let busy = CacheStats {
            hits: 90,
            misses: 10,
            ..Default::default()
        };
        let quiet = CacheStats {
            hits: 0,
            misses: 1,
            ..Default::default()
        };

        let aggregate = AggregateStats::from_generations(
            vec![("enso".to_string(), busy), ("sigil".to_string(), quiet)],
            Vec::new(),
        );

        assert_eq!(aggregate.total_hits, 90);
        assert_eq!(aggregate.total_misses, 11);
        // Averaging the per-generation rates would give 0.45
        assert!((aggregate.overall_hit_rate - 90.0 / 101.0).abs() < 1e-12);
    }

    #[test]
    fn test_generation_record_serializes_flat() {
        let record = StatsRecord::Generation {
            generation: "enso".to_string(),
            stats: CacheStats {
                hits: 3,
                max_size: 8,
                ..Default::default()
            },
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["scope"], "generation");
        assert_eq!(value["generation"], "enso");
        assert_eq!(value["hits"], 3);
        assert_eq!(value["max_size"], 8);
    }
}
