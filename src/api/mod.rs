//! HTTP surface

pub mod analytics;
pub mod map;
pub mod refresh;
pub mod track;

use std::sync::Arc;

use axum::{
    http::HeaderMap,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};

use crate::config::Config;
use crate::middleware;
use crate::state::VisitorStore;
use crate::static_files;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<VisitorStore>,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config, store: Arc<VisitorStore>) -> Self {
        AppState {
            config: Arc::new(config),
            store,
            http: reqwest::Client::new(),
        }
    }
}

/// Pages driven by client script mark their requests with this header;
/// anything else asking for an AJAX-only endpoint is turned away.
pub fn is_ajax(headers: &HeaderMap) -> bool {
    headers
        .get("X-Requested-With")
        .and_then(|h| h.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
        .unwrap_or(false)
}

pub async fn ping_handler() -> &'static str {
    "pong"
}

/// Build the route table. The map page only exists when geolocation is
/// enabled in the configuration.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/track/", post(track::track_handler))
        .route("/refresh/", get(refresh::active_users_fragment))
        .route("/refresh/json/", get(refresh::active_users_json))
        .route("/analytics/", get(analytics::analytics_home))
        .route("/analytics/views/", get(analytics::page_views))
        .route("/analytics/visitors/", get(analytics::page_visitors))
        .route("/ping", get(ping_handler))
        .route("/static/*path", get(static_files::serve_static));

    if state.config.use_geoip {
        app = app.route("/map/", get(map::visitor_map));
    }

    app.layer(axum_middleware::from_fn_with_state(
        state.clone(),
        middleware::identity::identity_middleware,
    ))
    .with_state(state)
}
