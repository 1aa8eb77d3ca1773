//! Visitor map page
//!
//! Routed only when geolocation is enabled; see `api::router`.

use axum::{extract::State, response::Response};

use crate::api::AppState;
use crate::static_files;

/// GET /map/ - page embedding the map widget and API key
pub async fn visitor_map(State(state): State<AppState>) -> Response {
    static_files::serve_map_template(&state.config)
}
