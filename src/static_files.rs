//! Static assets with external override support
//!
//! Priority: ./static/{file} > embedded default

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::Response,
};
use rust_embed::RustEmbed;
use std::path::PathBuf;

use crate::config::Config;

#[derive(RustEmbed)]
#[folder = "static/"]
struct Assets;

const STATIC_DIR: &str = "static";

fn mime_type(path: &str) -> String {
    let mime = mime_guess::from_path(path)
        .first_raw()
        .unwrap_or("application/octet-stream");

    // Add charset=utf-8 for text types
    if mime.starts_with("text/")
        || mime.contains("json")
        || mime.contains("xml")
        || mime.contains("javascript")
    {
        format!("{}; charset=utf-8", mime)
    } else {
        mime.to_string()
    }
}

/// Try to read from the external static dir first, fall back to embedded
fn read_file(path: &str) -> Option<Vec<u8>> {
    let external_path = PathBuf::from(STATIC_DIR).join(path);
    if external_path.exists() {
        if let Ok(content) = std::fs::read(&external_path) {
            tracing::debug!("Serving external: {}", external_path.display());
            return Some(content);
        }
    }

    Assets::get(path).map(|f| f.data.to_vec())
}

fn serve(path: &str) -> Response {
    match read_file(path) {
        Some(content) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, mime_type(path))
            .header(header::CACHE_CONTROL, "public, max-age=86400")
            .body(content.into())
            .unwrap(),
        None => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body("Not Found".into())
            .unwrap(),
    }
}

/// Render the configured map template, substituting config placeholders.
/// Operators can drop a replacement file into ./static to override the
/// embedded default.
pub fn serve_map_template(config: &Config) -> Response {
    match read_file(&config.map_template) {
        Some(content) => {
            let text = String::from_utf8_lossy(&content);
            let replaced = text
                .replace(
                    "{{MAP_API_KEY}}",
                    config.map_api_key.as_deref().unwrap_or(""),
                )
                .replace("{{ACTIVE_TIMEOUT}}", &config.active_timeout.to_string());

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, mime_type(&config.map_template))
                .body(replaced.into())
                .unwrap()
        }
        None => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body("Not Found".into())
            .unwrap(),
    }
}

pub async fn serve_static(Path(path): Path<String>) -> Response {
    serve(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_tracker_script_is_served() {
        let response = serve("js/tracker.js");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("javascript"));
    }

    #[test]
    fn unknown_asset_is_not_found() {
        let response = serve("js/no-such-file.js");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn map_template_substitutes_placeholders() {
        let config = Config {
            map_api_key: Some("k123".to_string()),
            ..Config::default()
        };

        let response = serve_map_template(&config);
        assert_eq!(response.status(), StatusCode::OK);
    }
}
