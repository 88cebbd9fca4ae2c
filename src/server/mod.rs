//! Axum-based admin HTTP server for the glyphcache daemon.
//!
//! Exposes the cache's lookup/store/clear/stats operations, health and
//! Prometheus metrics. Image generation itself lives elsewhere; this surface
//! is for operators and for services that share the daemon's cache.
//!
//! # Components
//!
//! - `handlers`: Implementation of individual endpoints.
//! - `middleware`: Request ID propagation and request metrics.
//! - `routes`: The router configuration that ties everything together.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod handlers;
mod middleware;
mod routes;

pub use handlers::StoreParams;
pub use routes::{create_router, AppState};
