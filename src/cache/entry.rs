// Cached asset record
// Author: kelexine (https://github.com/kelexine)

use bytes::Bytes;
use std::time::{Duration, Instant};

/// Byte-size estimate of a cached value, used for reporting only.
pub trait ApproxSize {
    fn approx_size(&self) -> usize;
}

impl ApproxSize for Bytes {
    fn approx_size(&self) -> usize {
        self.len()
    }
}

impl ApproxSize for Vec<u8> {
    fn approx_size(&self) -> usize {
        self.len()
    }
}

impl ApproxSize for String {
    fn approx_size(&self) -> usize {
        self.len()
    }
}

impl ApproxSize for &str {
    fn approx_size(&self) -> usize {
        self.len()
    }
}

/// A single cached item with its timing metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub last_accessed_at: Instant,
    pub expires_at: Instant,
    pub approx_size: usize,
}

impl<V: ApproxSize> CacheEntry<V> {
    pub fn new(value: V, now: Instant, ttl: Duration) -> Self {
        let approx_size = value.approx_size();
        Self {
            value,
            created_at: now,
            last_accessed_at: now,
            // Saturate on absurd TTLs instead of panicking on overflow
            expires_at: now.checked_add(ttl).unwrap_or(now + Duration::from_secs(u32::MAX as u64)),
            approx_size,
        }
    }
}

impl<V> CacheEntry<V> {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn touch(&mut self, now: Instant) {
        self.last_accessed_at = now;
    }

    pub fn ttl(&self) -> Duration {
        self.expires_at.saturating_duration_since(self.created_at)
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}
