use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, Response},
    middleware::Next,
};
use sha1::{Digest, Sha1};

use crate::api::AppState;

/// Identity of the requesting visitor, inserted as a request extension so
/// controllers can name the current user in rendered output.
#[derive(Debug, Clone)]
pub struct CurrentVisitor {
    pub session_key: String,
    pub user: Option<String>,
}

pub async fn identity_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response<Body> {
    // Returning clients present the signed token we handed out earlier
    let token = req
        .headers()
        .get("X-Tracking-Identity")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let mut session_key = String::new();
    let mut new_token = String::new();

    if let Some(t) = token {
        if let Some(key) = check_token(&t, &state.config.secret) {
            session_key = key;
        }
    }

    if session_key.is_empty() {
        let ip = client_ip(req.headers());
        let ua = req
            .headers()
            .get("User-Agent")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("");

        let raw = format!("{}{}", ip, ua);
        session_key = format!("{:x}", md5::compute(raw));
        new_token = generate_token(&session_key, &state.config.secret);
    }

    // Upstream auth proxies name the logged-in user in this header
    let user = req
        .headers()
        .get("X-Tracking-User")
        .and_then(|h| h.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(String::from);

    req.extensions_mut().insert(CurrentVisitor { session_key, user });

    let mut response = next.run(req).await;

    response.headers_mut().insert(
        "Access-Control-Expose-Headers",
        "Set-Tracking-Identity".parse().unwrap(),
    );

    if !new_token.is_empty() {
        if let Ok(value) = new_token.parse() {
            response.headers_mut().insert("Set-Tracking-Identity", value);
        }
    }

    response
}

/// Client address as reported by the reverse proxy.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("X-Forwarded-For")
        .or_else(|| headers.get("X-Real-IP"))
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .unwrap_or("127.0.0.1")
        .trim()
        .to_string()
}

pub fn generate_token(session_key: &str, secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(session_key.as_bytes());
    hasher.update(secret.as_bytes());
    let sign = hex::encode(hasher.finalize());
    format!("{}.{}", session_key, sign)
}

pub fn check_token(token: &str, secret: &str) -> Option<String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 2 {
        return None;
    }
    let session_key = parts[0];
    let sign = parts[1];

    let mut hasher = Sha1::new();
    hasher.update(session_key.as_bytes());
    hasher.update(secret.as_bytes());
    let calculated_sign = hex::encode(hasher.finalize());

    if sign == calculated_sign {
        Some(session_key.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let token = generate_token("deadbeef", "secret");
        assert_eq!(check_token(&token, "secret").as_deref(), Some("deadbeef"));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = generate_token("deadbeef", "secret");
        let forged = token.replace("deadbeef", "cafebabe");
        assert!(check_token(&forged, "secret").is_none());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_token("deadbeef", "secret");
        assert!(check_token(&token, "other").is_none());
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(check_token("no-dot-here", "secret").is_none());
        assert!(check_token("a.b.c", "secret").is_none());
    }
}
