use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::env;

/// Env var holding the bearer token for the protected routes.
pub const API_KEY_ENV: &str = "SCRIPTGEN_API_KEY";

/// Reject requests to the protected routes unless they carry
/// `Authorization: Bearer $SCRIPTGEN_API_KEY`. An unset key locks the routes.
pub async fn api_key_auth(req: Request<Body>, next: Next) -> Response {
    let expected = match env::var(API_KEY_ENV) {
        Ok(v) if !v.is_empty() => v,
        _ => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "ok": false,
                    "error": "API key not configured"
                })),
            )
                .into_response();
        }
    };

    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match auth_header {
        Some(value) if bearer_matches(value, &expected) => next.run(req).await,
        _ => {
            tracing::warn!(path = %req.uri().path(), "rejected request without valid API key");
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "ok": false,
                    "error": "Unauthorized"
                })),
            )
                .into_response()
        }
    }
}

fn bearer_matches(header: &str, expected: &str) -> bool {
    header
        .strip_prefix("Bearer ")
        .map(|token| token.trim() == expected)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_must_match_exactly() {
        assert!(bearer_matches("Bearer k1", "k1"));
        assert!(!bearer_matches("Bearer k2", "k1"));
        assert!(!bearer_matches("k1", "k1"));
        assert!(!bearer_matches("Basic k1", "k1"));
    }
}
