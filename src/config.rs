//! Configuration

use std::env;

/// Runtime configuration, built once in `main` and threaded through the
/// router state. Every option has a default so a bare `cargo run` works.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address (`WEB_ADDRESS`, default `0.0.0.0:8080`)
    pub web_addr: String,
    /// Allowed CORS origins, comma separated, `*` for any (`WEB_CORS`)
    pub cors: String,
    /// Secret for signing identity tokens (`TRACKING_SECRET`)
    pub secret: String,
    /// Recency window in seconds for "active" visitors (`ACTIVE_TIMEOUT`, default 600)
    pub active_timeout: u64,
    /// Enable geolocation lookups and the /map/ page (`TRACKING_USE_GEOIP`, default false)
    pub use_geoip: bool,
    /// Geolocation HTTP API base (`GEOIP_API`)
    pub geoip_api: String,
    /// API key embedded in the map page, if any (`MAP_API_KEY`)
    pub map_api_key: Option<String>,
    /// Template file for the map page, resolved via the static pipeline (`MAP_TEMPLATE`)
    pub map_template: String,
    /// SQLite file (`DB_FILE`, default `tracking.db`)
    pub db_path: String,
    /// Seconds between background saves (`SAVE_INTERVAL`, default 30)
    pub save_interval: u64,
    /// Visitors idle longer than this are dropped at save time (`PRUNE_AFTER`, default 86400)
    pub prune_after: u64,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Config {
            web_addr: env::var("WEB_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            cors: env::var("WEB_CORS").unwrap_or_else(|_| "*".to_string()),
            secret: env::var("TRACKING_SECRET").unwrap_or_else(|_| "tracking".to_string()),
            active_timeout: env::var("ACTIVE_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(600),
            use_geoip: env::var("TRACKING_USE_GEOIP")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            geoip_api: env::var("GEOIP_API")
                .unwrap_or_else(|_| "http://ip-api.com/json".to_string()),
            map_api_key: env::var("MAP_API_KEY").ok().filter(|k| !k.is_empty()),
            map_template: env::var("MAP_TEMPLATE")
                .unwrap_or_else(|_| "visitor_map.html".to_string()),
            db_path: env::var("DB_FILE").unwrap_or_else(|_| "tracking.db".to_string()),
            save_interval: env::var("SAVE_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            prune_after: env::var("PRUNE_AFTER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(86400),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            web_addr: "0.0.0.0:8080".to_string(),
            cors: "*".to_string(),
            secret: "tracking".to_string(),
            active_timeout: 600,
            use_geoip: false,
            geoip_api: "http://ip-api.com/json".to_string(),
            map_api_key: None,
            map_template: "visitor_map.html".to_string(),
            db_path: "tracking.db".to_string(),
            save_interval: 30,
            prune_after: 86400,
        }
    }
}
