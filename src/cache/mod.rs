// Generational asset cache
// Author: kelexine (https://github.com/kelexine)

pub mod bounded;
pub mod coalesce;
pub mod entry;
pub mod keys;
pub mod models;
pub mod registry;
pub mod service;

pub use bounded::BoundedCache;
pub use coalesce::Coalescer;
pub use entry::{ApproxSize, CacheEntry};
pub use keys::{CacheKey, KEY_LEN};
pub use models::{AggregateStats, CacheStats, StatsRecord};
pub use registry::GenerationalCache;
pub use service::AssetCache;
