//! Geolocation lookup over HTTP
//!
//! The payload is opaque to us: whatever the API returns is stored verbatim
//! on the visitor and handed through to clients as-is.

pub async fn lookup(
    client: &reqwest::Client,
    api: &str,
    ip: &str,
) -> Result<String, reqwest::Error> {
    let url = format!("{}/{}", api.trim_end_matches('/'), ip);
    let resp = client.get(&url).send().await?.error_for_status()?;
    resp.text().await
}
