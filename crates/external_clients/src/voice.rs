//! Client for voice-svc (`spec.md` §4.1, §6.2).
//!
//! REST `synthesize` plus the WebSocket session protocol used by
//! `SessionMediator`. HTTP client construction (connect timeout, idle pool)
//! follows the teacher's `OpenAiCompatibleBackend`
//! (`crates/inference_providers/src/external/openai_compatible.rs`).

use crate::errors::VoiceClientError;
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error};

type HmacSha256 = Hmac<Sha256>;

/// Mints a `VOICE_CLONE_AUTH-*` bearer token for the instant `now`
/// (`spec.md` §4.1): `HMAC-SHA256(secret, utf8(unix_seconds))`, hex-encoded,
/// joined to the timestamp with a `.`, then base64url-encoded.
pub fn mint_token(secret: &str, now: DateTime<Utc>) -> String {
    let unix_seconds = now.timestamp();
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(unix_seconds.to_string().as_bytes());
    let digest_hex = hex::encode(mac.finalize().into_bytes());
    let payload = format!("{digest_hex}.{unix_seconds}");
    let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(payload);
    format!("VOICE_CLONE_AUTH-{encoded}")
}

/// Re-derives the HMAC for a previously minted token's embedded timestamp
/// and compares. Used by tests; voice-svc itself is the actual verifier.
pub fn verify_token(secret: &str, token: &str) -> bool {
    let Some(encoded) = token.strip_prefix("VOICE_CLONE_AUTH-") else {
        return false;
    };
    let Ok(payload) = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(encoded) else {
        return false;
    };
    let Ok(payload) = String::from_utf8(payload) else {
        return false;
    };
    let Some((digest_hex, unix_seconds)) = payload.split_once('.') else {
        return false;
    };
    let expected = mint_token(
        secret,
        DateTime::from_timestamp(unix_seconds.parse().unwrap_or_default(), 0).unwrap_or_default(),
    );
    expected
        .strip_prefix("VOICE_CLONE_AUTH-")
        .and_then(|e| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(e).ok())
        .and_then(|p| String::from_utf8(p).ok())
        .map(|p| p.split_once('.').map(|(d, _)| d == digest_hex).unwrap_or(false))
        .unwrap_or(false)
}

#[async_trait]
pub trait VoiceClientTrait: Send + Sync {
    async fn synthesize(
        &self,
        voice_id: &str,
        clone_ref: Option<&str>,
        text: &str,
        language: &str,
    ) -> Result<Vec<u8>, VoiceClientError>;

    /// Opens the voice-svc session WebSocket, authenticated with a freshly
    /// minted `VOICE_CLONE_AUTH-*` token.
    async fn connect(
        &self,
    ) -> Result<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, VoiceClientError>;
}

pub struct VoiceClient {
    http: reqwest::Client,
    rest_base_url: String,
    ws_url: String,
    secret_key: String,
}

impl VoiceClient {
    pub fn new(cfg: &config::VoiceServiceConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build voice-svc HTTP client");

        Self {
            http,
            rest_base_url: cfg.rest_base_url.clone(),
            ws_url: cfg.ws_url.clone(),
            secret_key: cfg.secret_key.clone(),
        }
    }
}

#[async_trait]
impl VoiceClientTrait for VoiceClient {
    async fn synthesize(
        &self,
        voice_id: &str,
        clone_ref: Option<&str>,
        text: &str,
        language: &str,
    ) -> Result<Vec<u8>, VoiceClientError> {
        let token = mint_token(&self.secret_key, Utc::now());
        let url = format!("{}/synthesize", self.rest_base_url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {token}"))
            .json(&serde_json::json!({
                "voice_id": voice_id,
                "clone_ref": clone_ref,
                "text": text,
                "language": language,
            }))
            .send()
            .await
            .map_err(|e| VoiceClientError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!(status, %body, "voice-svc synthesize rejected");
            return Err(VoiceClientError::Http { status, body });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VoiceClientError::Unavailable(e.to_string()))?
            .to_vec();
        if bytes.is_empty() {
            return Err(VoiceClientError::EmptyBody);
        }
        debug!(bytes = bytes.len(), "voice-svc synthesize succeeded");
        Ok(bytes)
    }

    async fn connect(
        &self,
    ) -> Result<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, VoiceClientError> {
        let token = mint_token(&self.secret_key, Utc::now());
        let mut request = self
            .ws_url
            .clone()
            .into_client_request()
            .map_err(|e| VoiceClientError::WebSocket(e.to_string()))?;
        request.headers_mut().insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| VoiceClientError::WebSocket(e.to_string()))?,
        );

        let (stream, _response) = connect_async(request)
            .await
            .map_err(|e| VoiceClientError::WebSocket(e.to_string()))?;
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_minted_at_distinct_seconds_differ() {
        let secret = "shared-secret";
        let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let t1 = DateTime::from_timestamp(1_700_000_001, 0).unwrap();
        assert_ne!(mint_token(secret, t0), mint_token(secret, t1));
    }

    #[test]
    fn token_has_expected_prefix() {
        let token = mint_token("secret", Utc::now());
        assert!(token.starts_with("VOICE_CLONE_AUTH-"));
    }

    #[test]
    fn verify_token_accepts_a_token_it_minted() {
        let secret = "shared-secret";
        let token = mint_token(secret, Utc::now());
        assert!(verify_token(secret, &token));
    }

    #[test]
    fn verify_token_rejects_wrong_secret() {
        let token = mint_token("secret-a", Utc::now());
        assert!(!verify_token("secret-b", &token));
    }
}
