//! Client for video-svc (`spec.md` §4.1, §6.2).

use crate::errors::VideoClientError;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct VideoStatusBody {
    pub status: String,
    pub error: Option<String>,
}

/// The two shapes `GET status(task_id)` can return, distinguished by the
/// response's `content-type` (`spec.md` §4.1): a finished render is the raw
/// mp4 body; anything else is status JSON.
#[derive(Debug, Clone)]
pub enum VideoStatusResult {
    Ready(Vec<u8>),
    Pending(VideoStatusBody),
}

#[async_trait]
pub trait VideoClientTrait: Send + Sync {
    async fn enqueue(
        &self,
        image_url: &str,
        audio_url: &str,
        quality: &str,
    ) -> Result<String, VideoClientError>;

    async fn status(&self, task_id: &str) -> Result<VideoStatusResult, VideoClientError>;

    async fn init_stream(&self, session_id: &str, image_url: &str) -> Result<(), VideoClientError>;

    async fn end_stream(&self, session_id: &str) -> Result<(), VideoClientError>;

    async fn connect_stream(
        &self,
        session_id: &str,
    ) -> Result<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, VideoClientError>;
}

pub struct VideoClient {
    http: reqwest::Client,
    rest_base_url: String,
    ws_url: String,
    api_key: String,
}

impl VideoClient {
    pub fn new(cfg: &config::VideoServiceConfig) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build video-svc HTTP client");

        Self {
            http,
            rest_base_url: cfg.rest_base_url.clone(),
            ws_url: cfg.ws_url.clone(),
            api_key: cfg.api_key.clone(),
        }
    }

    fn bearer(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header("Authorization", format!("Bearer {}", self.api_key))
    }
}

#[derive(Debug, Deserialize)]
struct EnqueueResponse {
    task_id: String,
}

#[async_trait]
impl VideoClientTrait for VideoClient {
    async fn enqueue(
        &self,
        image_url: &str,
        audio_url: &str,
        quality: &str,
    ) -> Result<String, VideoClientError> {
        let url = format!("{}/enqueue", self.rest_base_url);
        let request = self.bearer(self.http.post(&url)).json(&serde_json::json!({
            "image_url": image_url,
            "audio_url": audio_url,
            "quality": quality,
        }));

        let response = request
            .send()
            .await
            .map_err(|e| VideoClientError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VideoClientError::Http { status, body });
        }

        let parsed: EnqueueResponse = response
            .json()
            .await
            .map_err(|e| VideoClientError::Http {
                status: 200,
                body: format!("failed to parse enqueue response: {e}"),
            })?;
        Ok(parsed.task_id)
    }

    async fn status(&self, task_id: &str) -> Result<VideoStatusResult, VideoClientError> {
        let url = format!("{}/status/{task_id}", self.rest_base_url);
        let response = self
            .bearer(self.http.get(&url))
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| VideoClientError::Unavailable(e.to_string()))?;

        // A 404 mid-poll is transient, not an abort (`spec.md` §4.8 step 4).
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(VideoStatusResult::Pending(VideoStatusBody {
                status: "processing".to_string(),
                error: None,
            }));
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VideoClientError::Http { status, body });
        }

        let is_mp4 = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("video/mp4"))
            .unwrap_or(false);

        if is_mp4 {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| VideoClientError::Unavailable(e.to_string()))?
                .to_vec();
            debug!(bytes = bytes.len(), "video-svc status returned a finished artifact");
            return Ok(VideoStatusResult::Ready(bytes));
        }

        let body: VideoStatusBody = response
            .json()
            .await
            .map_err(|e| VideoClientError::Http {
                status: 200,
                body: format!("failed to parse status response: {e}"),
            })?;
        Ok(VideoStatusResult::Pending(body))
    }

    async fn init_stream(&self, session_id: &str, image_url: &str) -> Result<(), VideoClientError> {
        let url = format!("{}/init-stream", self.rest_base_url);
        let response = self
            .bearer(self.http.post(&url))
            .json(&serde_json::json!({ "session_id": session_id, "image_url": image_url }))
            .send()
            .await
            .map_err(|e| VideoClientError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VideoClientError::Http { status, body });
        }
        Ok(())
    }

    async fn end_stream(&self, session_id: &str) -> Result<(), VideoClientError> {
        let url = format!("{}/end-stream", self.rest_base_url);
        let response = self
            .bearer(self.http.post(&url))
            .json(&serde_json::json!({ "session_id": session_id }))
            .send()
            .await
            .map_err(|e| VideoClientError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(VideoClientError::Http { status, body });
        }
        Ok(())
    }

    async fn connect_stream(
        &self,
        session_id: &str,
    ) -> Result<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>, VideoClientError> {
        let url = format!("{}/stream/{session_id}", self.ws_url);
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| VideoClientError::WebSocket(e.to_string()))?;
        Ok(stream)
    }
}
