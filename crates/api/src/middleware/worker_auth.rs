//! Static-token authentication for `/worker/callback` (`spec.md` §4.10).

use axum::http::{HeaderMap, StatusCode};

const WORKER_TOKEN_HEADER: &str = "x-worker-token";

/// Accepts the token via `Authorization: Bearer <token>` or the dedicated
/// `x-worker-token` header (`spec.md` §6.1).
pub fn verify_worker_token(headers: &HeaderMap, expected: &str) -> Result<(), StatusCode> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let dedicated = headers.get(WORKER_TOKEN_HEADER).and_then(|v| v.to_str().ok());

    if bearer == Some(expected) || dedicated == Some(expected) {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn accepts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        assert!(verify_worker_token(&headers, "secret").is_ok());
    }

    #[test]
    fn accepts_dedicated_header() {
        let mut headers = HeaderMap::new();
        headers.insert(WORKER_TOKEN_HEADER, HeaderValue::from_static("secret"));
        assert!(verify_worker_token(&headers, "secret").is_ok());
    }

    #[test]
    fn rejects_missing_or_wrong_token() {
        let headers = HeaderMap::new();
        assert_eq!(verify_worker_token(&headers, "secret"), Err(StatusCode::UNAUTHORIZED));
    }
}
