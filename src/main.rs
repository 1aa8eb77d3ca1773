mod api;
mod config;
mod core;
mod middleware;
mod state;
mod static_files;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::VisitorStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    // Load persisted sessions
    let store = match VisitorStore::open(&config.db_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("Failed to open visitor store: {}", e);
            std::process::exit(1);
        }
    };

    // Background persistence task
    {
        let store = store.clone();
        let interval = Duration::from_secs(config.save_interval);
        let prune_after = config.prune_after;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                if let Err(e) = store.clone().save_async(prune_after).await {
                    tracing::error!("Failed to save data: {}", e);
                }
            }
        });
    }

    // Graceful shutdown - save on exit
    let shutdown = {
        let store = store.clone();
        let prune_after = config.prune_after;
        async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down, saving data...");
            if let Err(e) = store.save_async(prune_after).await {
                tracing::error!("Failed to save on shutdown: {}", e);
            }
        }
    };

    // CORS
    let cors_layer = if config.cors == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any)
    } else {
        let origins: Vec<_> = config
            .cors
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any)
    };

    let addr: SocketAddr = config.web_addr.parse().expect("Invalid address");
    tracing::info!("Tracking listening on {}", addr);
    tracing::info!("Active window: {}s", config.active_timeout);
    tracing::info!("Visitor map enabled: {}", config.use_geoip);
    tracing::info!("Data saves every {}s", config.save_interval);

    let app = api::router(api::AppState::new(config, store))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .unwrap();
}
