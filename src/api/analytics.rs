//! Analytics pages

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};

use crate::core::chart::Chart;

#[derive(Template)]
#[template(path = "analytics_home.html")]
struct AnalyticsHomeTemplate;

/// GET /analytics/ - landing page listing the available views
pub async fn analytics_home() -> Response {
    match AnalyticsHomeTemplate.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("failed to render analytics home: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /analytics/views/ - chart payload for page views
pub async fn page_views() -> impl IntoResponse {
    Json(Chart::new().title("Page Views"))
}

/// GET /analytics/visitors/ - chart payload for visitors
pub async fn page_visitors() -> impl IntoResponse {
    Json(Chart::new().title("Visitors"))
}

#[cfg(test)]
mod tests {
    use crate::api::{router, AppState};
    use crate::config::Config;
    use crate::state::VisitorStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> axum::Router {
        router(AppState::new(
            Config::default(),
            Arc::new(VisitorStore::open_in_memory().unwrap()),
        ))
    }

    async fn get_json(uri: &str) -> serde_json::Value {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn landing_page_links_both_views() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/analytics/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("/analytics/views/"));
        assert!(html.contains("/analytics/visitors/"));
    }

    #[tokio::test]
    async fn page_views_chart_is_titled() {
        let value = get_json("/analytics/views/").await;
        assert_eq!(value["title"]["text"], "Page Views");
        assert!(value["elements"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn visitors_chart_is_titled() {
        let value = get_json("/analytics/visitors/").await;
        assert_eq!(value["title"]["text"], "Visitors");
    }
}
