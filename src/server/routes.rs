// HTTP routes configuration
// Author: kelexine (https://github.com/kelexine)

use super::handlers::{
    clear_all_handler, clear_generation_handler, generation_stats_handler, get_asset_handler,
    health_handler, metrics_handler, put_asset_handler, stats_handler,
};
use super::middleware::{request_id_layers, track_metrics};
use crate::cache::AssetCache;
use crate::config::AppConfig;
use crate::error::Result;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub cache: Arc<AssetCache>,
}

pub fn create_router(config: AppConfig, cache: Arc<AssetCache>) -> Result<Router> {
    let max_body_bytes = config.server.max_body_bytes;
    let state = AppState { config, cache };

    let (set_request_id, propagate_request_id) = request_id_layers();

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/cache", delete(clear_all_handler))
        .route("/cache/stats", get(stats_handler))
        .route("/cache/:generation", delete(clear_generation_handler))
        .route("/cache/:generation/stats", get(generation_stats_handler))
        .route(
            "/cache/:generation/:key",
            get(get_asset_handler).put(put_asset_handler),
        )
        .route_layer(middleware::from_fn(track_metrics))
        // Asset bodies are raw image bytes; lift axum's default extractor limit
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(tower_http::limit::RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id)
        .layer(set_request_id)
        .with_state(state);

    Ok(app)
}
