// HTTP request handlers
// Author: kelexine (https://github.com/kelexine)

use super::routes::AppState;
use crate::cache::{CacheKey, StatsRecord};
use crate::error::{CacheError, Result};
use crate::metrics::gather_metrics;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub checks: HashMap<String, HealthCheck>,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub message: String,
}

/// Query string accepted when storing an asset.
#[derive(Debug, Default, Deserialize)]
pub struct StoreParams {
    pub ttl_seconds: Option<f64>,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut checks = HashMap::new();
    let mut overall_status = HealthStatus::Healthy;

    let aggregate = state.cache.registry().aggregate_stats();
    checks.insert(
        "cache".to_string(),
        HealthCheck {
            status: "ok".to_string(),
            message: format!(
                "{} generations, {} entries, hit rate {:.3}",
                aggregate.per_generation.len(),
                aggregate.total_size,
                aggregate.overall_hit_rate
            ),
        },
    );

    // Unexpected generation names usually mean a caller and the config disagree
    let fallback_check = if aggregate.fallback_generations.is_empty() {
        HealthCheck {
            status: "ok".to_string(),
            message: "All generations configured".to_string(),
        }
    } else {
        overall_status = HealthStatus::Degraded;
        HealthCheck {
            status: "warning".to_string(),
            message: format!(
                "Using fallback configuration for: {}",
                aggregate.fallback_generations.join(", ")
            ),
        }
    };
    checks.insert("configuration".to_string(), fallback_check);

    Json(HealthResponse {
        status: overall_status,
        checks,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}

pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsRecord> {
    Json(state.cache.stats(None))
}

pub async fn generation_stats_handler(
    State(state): State<AppState>,
    Path(generation): Path<String>,
) -> Json<StatsRecord> {
    Json(state.cache.stats(Some(&generation)))
}

pub async fn clear_all_handler(State(state): State<AppState>) -> StatusCode {
    info!("Clearing all generation caches");
    state.cache.clear(None);
    StatusCode::NO_CONTENT
}

pub async fn clear_generation_handler(
    State(state): State<AppState>,
    Path(generation): Path<String>,
) -> StatusCode {
    info!(generation = %generation, "Clearing generation cache");
    state.cache.clear(Some(&generation));
    StatusCode::NO_CONTENT
}

pub async fn get_asset_handler(
    State(state): State<AppState>,
    Path((generation, key)): Path<(String, String)>,
) -> Result<Response> {
    let key: CacheKey = key.parse()?;
    let (found, value) = state.cache.lookup(&generation, key.as_bytes())?;

    if !found {
        debug!(generation = %generation, key = %key.short(), "Asset not cached");
        let body = json!({
            "type": "error",
            "error": {
                "type": "not_found_error",
                "message": format!("no cached asset for {} in '{}'", key, generation),
            }
        });
        return Ok((StatusCode::NOT_FOUND, Json(body)).into_response());
    }

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        value,
    )
        .into_response())
}

pub async fn put_asset_handler(
    State(state): State<AppState>,
    Path((generation, key)): Path<(String, String)>,
    Query(params): Query<StoreParams>,
    body: Bytes,
) -> Result<StatusCode> {
    if generation.trim().is_empty() {
        return Err(CacheError::InvalidRequest(
            "generation must not be empty".to_string(),
        ));
    }

    let key: CacheKey = key.parse()?;
    state
        .cache
        .store(&generation, key.as_bytes(), body, params.ttl_seconds)?;
    Ok(StatusCode::NO_CONTENT)
}
