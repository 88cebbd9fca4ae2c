// glyphcache - generational LRU+TTL cache for procedural image assets
// Author: kelexine (https://github.com/kelexine)

use anyhow::Result;
use clap::Parser;
use glyphcache::cache::AssetCache;
use glyphcache::cli::Args;
use glyphcache::config::AppConfig;
use glyphcache::server::create_router;
use glyphcache::utils::logging;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let config = AppConfig::load(args.config.as_deref())?;

    if args.print_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting glyphcache v{}", env!("CARGO_PKG_VERSION"));

    // Phase 3: Build the cache registry
    let cache = Arc::new(AssetCache::new(config.cache.clone())?);
    let mut generations: Vec<_> = config.cache.generations.keys().cloned().collect();
    generations.sort();
    info!("Configured generations: {}", generations.join(", "));

    let sweeper = cache.spawn_sweeper();

    // Phase 4: Build and start HTTP server
    let app = create_router(config.clone(), Arc::clone(&cache))?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 5: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }

    let stats = cache.registry().aggregate_stats();
    info!(
        hits = stats.total_hits,
        misses = stats.total_misses,
        evictions = stats.total_evictions,
        "Server shut down gracefully"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
