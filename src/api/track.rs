//! Visit ingestion
//!
//! Host pages embed `static/js/tracker.js`, which reports every page view
//! here. This is the only write path into the visitor store; the refresh and
//! analytics endpoints read.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension,
};
use url::Url;

use crate::api::AppState;
use crate::core::geoip;
use crate::middleware::identity::{client_ip, CurrentVisitor};
use crate::state::PageVisit;

fn tracked_url(headers: &HeaderMap) -> Result<String, &'static str> {
    let raw = headers
        .get("X-Track-Url")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if raw.is_empty() {
        return Err("missing page url");
    }

    let u = Url::parse(raw).map_err(|_| "unable to parse page url")?;
    if u.host_str().unwrap_or("").is_empty() {
        return Err("invalid page url");
    }

    Ok(u.path().to_string())
}

fn tracked_referrer(headers: &HeaderMap) -> String {
    headers
        .get("X-Track-Referrer")
        .and_then(|h| h.to_str().ok())
        .filter(|r| Url::parse(r).is_ok())
        .unwrap_or("")
        .to_string()
}

/// POST /track/ - record one page view
pub async fn track_handler(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentVisitor>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let url = match tracked_url(&headers) {
        Ok(u) => u,
        Err(_) => return StatusCode::BAD_REQUEST,
    };

    let ip = client_ip(&headers);
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
        .to_string();

    let session_key = current.session_key.clone();
    state.store.record_visit(PageVisit {
        session_key: session_key.clone(),
        ip_address: ip.clone(),
        user_agent,
        referrer: tracked_referrer(&headers),
        url,
        user: current.user.clone(),
    });

    if state.config.use_geoip {
        let pending = state
            .store
            .get(&session_key)
            .map(|v| v.geoip_data.is_none())
            .unwrap_or(false);

        if pending {
            let store = state.store.clone();
            let http = state.http.clone();
            let api = state.config.geoip_api.clone();
            tokio::spawn(async move {
                match geoip::lookup(&http, &api, &ip).await {
                    Ok(blob) => store.attach_geoip(&session_key, blob),
                    Err(e) => tracing::debug!("geoip lookup failed: {}", e),
                }
            });
        }
    }

    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{router, AppState};
    use crate::config::Config;
    use crate::state::VisitorStore;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        AppState::new(
            Config::default(),
            Arc::new(VisitorStore::open_in_memory().unwrap()),
        )
    }

    fn track_request(page: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/track/")
            .header("X-Track-Url", page)
            .header("X-Track-Referrer", "https://search.example/")
            .header("X-Forwarded-For", "203.0.113.9")
            .header("User-Agent", "Mozilla/5.0")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn records_a_page_view() {
        let state = test_state();
        let store = state.store.clone();
        let app = router(state);

        let response = app
            .oneshot(track_request("https://example.com/blog/"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(store.len(), 1);

        let v = store.snapshot().pop().unwrap();
        assert_eq!(v.url, "/blog/");
        assert_eq!(v.referrer, "https://search.example/");
        assert_eq!(v.page_views, 1);
    }

    #[tokio::test]
    async fn same_client_accumulates_page_views() {
        let state = test_state();
        let store = state.store.clone();
        let app = router(state);

        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(track_request("https://example.com/blog/"))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NO_CONTENT);
        }

        assert_eq!(store.len(), 1);
        assert_eq!(store.snapshot().pop().unwrap().page_views, 3);
    }

    #[tokio::test]
    async fn unparsable_page_url_is_rejected() {
        let app = router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/track/")
                    .header("X-Track-Url", "not a url")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_page_url_is_rejected() {
        let app = router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/track/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn authenticated_user_is_associated() {
        let state = test_state();
        let store = state.store.clone();
        let app = router(state);

        let mut req = track_request("https://example.com/");
        req.headers_mut()
            .insert("X-Tracking-User", "alice".parse().unwrap());
        app.oneshot(req).await.unwrap();

        assert_eq!(
            store.snapshot().pop().unwrap().user.as_deref(),
            Some("alice")
        );
    }

    #[tokio::test]
    async fn new_clients_get_an_identity_token() {
        let app = router(test_state());

        let response = app
            .oneshot(track_request("https://example.com/"))
            .await
            .unwrap();

        assert!(response.headers().contains_key("Set-Tracking-Identity"));
    }
}
