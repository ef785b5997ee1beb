//! Client for the conversational LLM backend (`spec.md` §4.1).
//!
//! `generate` is a single stateless call per turn. The rolling window of
//! prior turns lives on `services::session_mediator` rather than here (see
//! `DESIGN.md` for why that Open Question was resolved this way) — the
//! client only ever sees what the mediator hands it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::LlmClientError;

#[derive(Debug, Clone, Serialize)]
pub struct LlmTurn {
    pub role: &'static str,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

#[async_trait]
pub trait LlmClientTrait: Send + Sync {
    async fn generate(
        &self,
        session_id: &str,
        history: &[LlmTurn],
        user_text: &str,
        system_prompt: &str,
        language: &str,
    ) -> Result<String, LlmClientError>;
}

pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
}

impl LlmClient {
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build llm HTTP client");
        Self { http, base_url }
    }
}

#[async_trait]
impl LlmClientTrait for LlmClient {
    async fn generate(
        &self,
        session_id: &str,
        history: &[LlmTurn],
        user_text: &str,
        system_prompt: &str,
        language: &str,
    ) -> Result<String, LlmClientError> {
        let url = format!("{}/generate", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({
                "session_id": session_id,
                "history": history,
                "user_text": user_text,
                "system_prompt": system_prompt,
                "language": language,
            }))
            .send()
            .await
            .map_err(|e| LlmClientError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmClientError::Http { status, body });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmClientError::Http {
                status: 200,
                body: format!("failed to parse generate response: {e}"),
            })?;
        Ok(parsed.text)
    }
}
