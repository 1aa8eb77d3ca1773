//! Active-user refresh endpoints
//!
//! Both endpoints exist for AJAX polling from admin pages; plain navigation
//! to them is answered with a 404, the same as an unknown path.

use askama::Template;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;

use crate::api::{is_ajax, AppState};
use crate::core::time;
use crate::core::visitors::{self, ActiveFilter, SummaryError};
use crate::middleware::identity::CurrentVisitor;
use crate::state::Visitor;

const NEVER_CACHE: &str = "max-age=0, no-cache, no-store, must-revalidate";

#[derive(Template)]
#[template(path = "_active_users.html")]
struct ActiveUsersTemplate {
    active: Vec<Row>,
    registered: usize,
    guests: usize,
    user: String,
}

struct Row {
    name: String,
    url: String,
    friendly_time: String,
}

impl Row {
    fn from_visitor(v: &Visitor, now: DateTime<Utc>) -> Self {
        let elapsed = (now - v.last_update).num_seconds().max(0) as u64;
        Row {
            name: v.user.clone().unwrap_or_else(|| "guest".to_string()),
            url: v.url.clone(),
            friendly_time: time::friendly_time_string(elapsed),
        }
    }
}

/// GET /refresh/ - rendered list of active users, wrapped in a JSON envelope
/// for injection by client script
pub async fn active_users_fragment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentVisitor>,
    headers: HeaderMap,
) -> Response {
    if !is_ajax(&headers) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let window = state.config.active_timeout;
    let active = visitors::active(&state.store, window, ActiveFilter::All);
    let registered = visitors::active(&state.store, window, ActiveFilter::Registered);
    let guests = visitors::active(&state.store, window, ActiveFilter::Guests);

    let now = Utc::now();
    let template = ActiveUsersTemplate {
        active: active.iter().map(|v| Row::from_visitor(v, now)).collect(),
        registered: registered.len(),
        guests: guests.len(),
        user: current.user.unwrap_or_default(),
    };

    match template.render() {
        Ok(html) => Json(json!({ "users": html })).into_response(),
        Err(e) => {
            tracing::error!("failed to render active-users fragment: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /refresh/json/ - active users as plain JSON for easier manipulation
/// with JavaScript. Never cached.
pub async fn active_users_json(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    if !is_ajax(&headers) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let mut active = visitors::active(
        &state.store,
        state.config.active_timeout,
        ActiveFilter::All,
    );
    // polling clients take the list oldest-active first
    active.reverse();

    let body = match build_payload(&active, Utc::now()) {
        Ok(body) => body,
        Err(e) => {
            // a polling endpoint never fails the request; clients must
            // tolerate the empty object
            tracing::error!("could not assemble visitor data: {}", e);
            "{}".to_string()
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .header(header::CACHE_CONTROL, NEVER_CACHE)
        .body(body.into())
        .unwrap()
}

fn build_payload(active: &[Visitor], now: DateTime<Utc>) -> Result<String, SummaryError> {
    let users = active
        .iter()
        .map(|v| visitors::summarize(v, now))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(json!({ "users": users }).to_string())
}
