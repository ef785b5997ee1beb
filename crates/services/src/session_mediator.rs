//! `SessionMediator` (`spec.md` §4.9) — the hardest subsystem. Bridges one
//! browser-facing WebSocket to voice-svc (always) and video-svc (for video
//! sessions) and an LLM backend, coalescing everything into one framed
//! stream back to the client.
//!
//! The transport (axum's `WebSocket`) lives in `api`; this module only
//! knows about channels, so it can be exercised without an HTTP server —
//! grounded on the teacher's split between `RealtimeServiceImpl`
//! (`crates/services/src/realtime/mod.rs`, pure service logic) and
//! `handle_realtime_socket` (`crates/api/src/routes/realtime.rs`, the axum
//! glue that owns the actual socket).

use crate::error::MediatorError;
use crate::usage::UsageAccountant;
use chrono::Utc;
use database::SessionRepository;
use domain::session::{Session, SessionKind, SessionStatus, TranscriptRole, TranscriptTurn};
use domain::usage::UsageResource;
use external_clients::{LlmClientTrait, LlmTurn, VideoClientTrait, VoiceClientTrait};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

const READY_TIMEOUT_VOICE_ONLY: Duration = Duration::from_secs(20);
const READY_TIMEOUT_VIDEO: Duration = Duration::from_secs(30);
const MAX_LLM_HISTORY_TURNS: usize = 10;
const FALLBACK_RESPONSE: &str = "Sorry, I couldn't come up with a response. Could you say that again?";

/// Discriminator byte prefixing binary frames to the client (`spec.md` §4.9).
pub const FRAME_AUDIO: u8 = 0x01;
pub const FRAME_VIDEO: u8 = 0x02;

/// Frames the mediator sends toward the client. The transport layer turns
/// `Binary` into a one-byte-prefixed binary WebSocket frame and `Json` into
/// a text frame.
#[derive(Debug, Clone)]
pub enum ClientFrame {
    Binary(u8, Vec<u8>),
    Json(serde_json::Value),
}

/// Parsed inbound client messages (`spec.md` §4.9).
#[derive(Debug, Clone)]
pub enum ClientInbound {
    UserText(String),
    StopSpeaking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediatorState {
    Connecting,
    Ready,
    Active,
    Draining,
}

enum VoiceUpstreamMsg {
    Ready,
    Error(String),
    SpeechStart,
    SpeechEnd,
    Binary(Vec<u8>),
    Closed,
}

enum VideoUpstreamMsg {
    Ready,
    Binary(Vec<u8>),
    Closed,
}

enum Event {
    Client(ClientInbound),
    ClientClosed,
    Voice(VoiceUpstreamMsg),
    Video(VideoUpstreamMsg),
    ReadyWatchdog,
}

pub struct SessionMediatorDeps {
    pub llm: Arc<dyn LlmClientTrait>,
    pub usage: Arc<UsageAccountant>,
    pub sessions: Arc<SessionRepository>,
    pub video: Option<Arc<dyn VideoClientTrait>>,
}

pub struct SessionMediator {
    session_id: Uuid,
    owner_id: Uuid,
    avatar_id: Uuid,
    kind: SessionKind,
    language: String,
    system_prompt: String,
    deps: SessionMediatorDeps,
}

impl SessionMediator {
    pub fn new(
        session_id: Uuid,
        owner_id: Uuid,
        avatar_id: Uuid,
        kind: SessionKind,
        language: String,
        system_prompt: String,
        deps: SessionMediatorDeps,
    ) -> Self {
        Self {
            session_id,
            owner_id,
            avatar_id,
            kind,
            language,
            system_prompt,
            deps,
        }
    }

    /// Drives one session to completion. Owns the voice upstream socket
    /// (already connected by the caller) and, for video sessions, the video
    /// upstream socket plus the `image_url` used for `init-stream`. Reads
    /// client messages from `client_rx` and writes outbound frames to
    /// `client_tx`; returns once the session has fully drained.
    pub async fn run(
        mut self,
        mut voice_ws: tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        video_ws: Option<
            tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
        >,
        voice_clone_url: Option<String>,
        client_tx: mpsc::Sender<ClientFrame>,
        mut client_rx: mpsc::Receiver<ClientInbound>,
        cancel: CancellationToken,
    ) -> Result<(), MediatorError> {
        let started_at = Utc::now();
        let mut state = MediatorState::Connecting;
        let mut transcript: Vec<TranscriptTurn> = Vec::new();
        let mut history: Vec<LlmTurn> = Vec::new();
        let mut voice_ready = false;
        let mut video_ready = video_ws.is_none(); // video sessions need both; voice-only only needs voice

        self.send_json(&client_tx, serde_json::json!({ "type": "connecting" })).await;

        // init voice upstream
        let init_msg = serde_json::json!({
            "type": "init",
            "userId": self.owner_id,
            "avatarId": self.avatar_id,
            "voice_clone_url": voice_clone_url,
            "language": self.language,
        });
        if voice_ws
            .send(WsMessage::Text(init_msg.to_string().into()))
            .await
            .is_err()
        {
            return self.fail(&client_tx, "voice_init_failed", "failed to initialize voice upstream").await;
        }

        let (voice_tx, mut voice_rx) = mpsc::channel(64);
        let (mut voice_sink, voice_stream) = voice_ws.split();
        tokio::spawn(Self::voice_reader(voice_stream, voice_tx));

        let (video_tx, mut video_rx) = mpsc::channel(64);
        let mut video_sink = None;
        if let Some(video_ws) = video_ws {
            let (sink, stream) = video_ws.split();
            video_sink = Some(sink);
            tokio::spawn(Self::video_reader(stream, video_tx.clone()));
            // The WS handshake (and the `init-stream` REST call the caller
            // already made before handing us this socket) is video-svc's
            // only readiness signal (`spec.md` §4.9 Video upstream
            // protocol) — it never emits a JSON `ready` control frame the
            // way voice-svc does. Treat the already-open connection as
            // `videoReady` rather than waiting on the first lip-synced
            // frame, which a protocol-compliant client can never cause
            // (it waits for `ready` before sending `user_text`, and only a
            // user turn produces the audio video-svc lip-syncs against).
            let _ = video_tx.send(VideoUpstreamMsg::Ready).await;
        }

        let watchdog_timeout = if self.kind == SessionKind::Video {
            READY_TIMEOUT_VIDEO
        } else {
            READY_TIMEOUT_VOICE_ONLY
        };
        let watchdog = tokio::time::sleep(watchdog_timeout);
        tokio::pin!(watchdog);
        let mut watchdog_armed = true;

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = &mut watchdog, if watchdog_armed && state == MediatorState::Connecting => Event::ReadyWatchdog,
                maybe = client_rx.recv() => match maybe {
                    Some(inbound) => Event::Client(inbound),
                    None => Event::ClientClosed,
                },
                maybe = voice_rx.recv() => match maybe {
                    Some(msg) => Event::Voice(msg),
                    None => Event::Voice(VoiceUpstreamMsg::Closed),
                },
                maybe = video_rx.recv(), if video_sink.is_some() => match maybe {
                    Some(msg) => Event::Video(msg),
                    None => Event::Video(VideoUpstreamMsg::Closed),
                },
            };

            match event {
                Event::ReadyWatchdog => {
                    warn!(session_id = %self.session_id, "session readiness watchdog fired");
                    return self
                        .teardown(
                            &client_tx,
                            &mut voice_sink,
                            &mut video_sink,
                            started_at,
                            transcript,
                            Some(("timeout", "readiness timed out")),
                        )
                        .await;
                }
                Event::ClientClosed => {
                    state = MediatorState::Draining;
                    break;
                }
                Event::Voice(VoiceUpstreamMsg::Closed) => {
                    warn!(session_id = %self.session_id, "voice upstream closed unexpectedly");
                    return self
                        .teardown(
                            &client_tx,
                            &mut voice_sink,
                            &mut video_sink,
                            started_at,
                            transcript,
                            Some(("upstream_closed", "voice upstream closed")),
                        )
                        .await;
                }
                Event::Video(VideoUpstreamMsg::Closed) => {
                    warn!(session_id = %self.session_id, "video upstream closed unexpectedly");
                    return self
                        .teardown(
                            &client_tx,
                            &mut voice_sink,
                            &mut video_sink,
                            started_at,
                            transcript,
                            Some(("upstream_closed", "video upstream closed")),
                        )
                        .await;
                }
                Event::Voice(VoiceUpstreamMsg::Ready) => {
                    voice_ready = true;
                    self.maybe_enter_ready(&client_tx, &mut state, &mut watchdog_armed, voice_ready, video_ready)
                        .await;
                }
                Event::Voice(VoiceUpstreamMsg::Error(detail)) => {
                    return self
                        .teardown(
                            &client_tx,
                            &mut voice_sink,
                            &mut video_sink,
                            started_at,
                            transcript,
                            Some(("voice_error", &detail)),
                        )
                        .await;
                }
                Event::Voice(VoiceUpstreamMsg::SpeechStart) => {
                    self.send_json(&client_tx, serde_json::json!({ "type": "speech_start" })).await;
                }
                Event::Voice(VoiceUpstreamMsg::SpeechEnd) => {
                    self.send_json(&client_tx, serde_json::json!({ "type": "speech_end" })).await;
                }
                Event::Voice(VoiceUpstreamMsg::Binary(chunk)) => {
                    // forward as-is to video upstream for lip-sync, and to the client framed
                    if let Some(sink) = video_sink.as_mut() {
                        let _ = sink.send(WsMessage::Binary(chunk.clone().into())).await;
                    }
                    self.send_frame(&client_tx, ClientFrame::Binary(FRAME_AUDIO, chunk)).await;
                }
                Event::Video(VideoUpstreamMsg::Ready) => {
                    video_ready = true;
                    self.maybe_enter_ready(&client_tx, &mut state, &mut watchdog_armed, voice_ready, video_ready)
                        .await;
                }
                Event::Video(VideoUpstreamMsg::Binary(frame)) => {
                    self.send_frame(&client_tx, ClientFrame::Binary(FRAME_VIDEO, frame)).await;
                }
                Event::Client(ClientInbound::StopSpeaking) => {
                    let _ = voice_sink
                        .send(WsMessage::Text(serde_json::json!({ "type": "stop_speaking" }).to_string().into()))
                        .await;
                    if let Some(sink) = video_sink.as_mut() {
                        let _ = sink
                            .send(WsMessage::Text(serde_json::json!({ "type": "stop_speaking" }).to_string().into()))
                            .await;
                    }
                    // client UI must not hang on upstream ack (`spec.md` §4.9 Barge-in)
                    self.send_json(&client_tx, serde_json::json!({ "type": "speech_end" })).await;
                }
                Event::Client(ClientInbound::UserText(text)) => {
                    state = MediatorState::Active;
                    transcript.push(TranscriptTurn { role: TranscriptRole::User, text: text.clone() });

                    let reply = match self
                        .deps
                        .llm
                        .generate(&self.session_id.to_string(), &history, &text, &self.system_prompt, &self.language)
                        .await
                    {
                        Ok(reply) if !reply.trim().is_empty() => reply,
                        Ok(_) => FALLBACK_RESPONSE.to_string(),
                        Err(e) => {
                            warn!(session_id = %self.session_id, error = %e, "llm call failed, using fallback");
                            FALLBACK_RESPONSE.to_string()
                        }
                    };

                    transcript.push(TranscriptTurn { role: TranscriptRole::Model, text: reply.clone() });
                    history.push(LlmTurn { role: "user", text });
                    history.push(LlmTurn { role: "model", text: reply.clone() });
                    if history.len() > MAX_LLM_HISTORY_TURNS * 2 {
                        let overflow = history.len() - MAX_LLM_HISTORY_TURNS * 2;
                        history.drain(0..overflow);
                    }

                    self.send_json(
                        &client_tx,
                        serde_json::json!({ "type": "llm_response_text", "text": reply.clone() }),
                    )
                    .await;
                    let _ = voice_sink
                        .send(WsMessage::Text(
                            serde_json::json!({ "type": "text_to_speak", "text": reply }).to_string().into(),
                        ))
                        .await;
                }
            }
        }

        self.teardown(&client_tx, &mut voice_sink, &mut video_sink, started_at, transcript, None)
            .await
    }

    async fn voice_reader(
        mut stream: futures_util::stream::SplitStream<
            tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
        >,
        tx: mpsc::Sender<VoiceUpstreamMsg>,
    ) {
        while let Some(msg) = stream.next().await {
            let forwarded = match msg {
                Ok(WsMessage::Text(text)) => serde_json::from_str::<serde_json::Value>(&text)
                    .ok()
                    .and_then(|v| v.get("type").and_then(|t| t.as_str()).map(|s| s.to_string()))
                    .map(|t| match t.as_str() {
                        "ready" => VoiceUpstreamMsg::Ready,
                        "speech_start" => VoiceUpstreamMsg::SpeechStart,
                        "speech_end" => VoiceUpstreamMsg::SpeechEnd,
                        "error" => VoiceUpstreamMsg::Error(text.to_string()),
                        _ => VoiceUpstreamMsg::Error(format!("unrecognized voice event: {t}")),
                    }),
                Ok(WsMessage::Binary(bytes)) => Some(VoiceUpstreamMsg::Binary(bytes.to_vec())),
                Ok(WsMessage::Close(_)) => Some(VoiceUpstreamMsg::Closed),
                Ok(_) => None,
                Err(e) => {
                    error!(error = %e, "voice upstream read error");
                    Some(VoiceUpstreamMsg::Closed)
                }
            };
            if let Some(event) = forwarded {
                let is_closed = matches!(event, VoiceUpstreamMsg::Closed);
                if tx.send(event).await.is_err() || is_closed {
                    break;
                }
            }
        }
        let _ = tx.send(VoiceUpstreamMsg::Closed).await;
    }

    async fn video_reader(
        mut stream: futures_util::stream::SplitStream<
            tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
        >,
        tx: mpsc::Sender<VideoUpstreamMsg>,
    ) {
        while let Some(msg) = stream.next().await {
            match msg {
                Ok(WsMessage::Binary(bytes)) => {
                    if tx.send(VideoUpstreamMsg::Binary(bytes.to_vec())).await.is_err() {
                        break;
                    }
                }
                Ok(WsMessage::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
        let _ = tx.send(VideoUpstreamMsg::Closed).await;
    }

    async fn send_json(&self, tx: &mpsc::Sender<ClientFrame>, value: serde_json::Value) {
        if tx.send(ClientFrame::Json(value)).await.is_err() {
            debug!(session_id = %self.session_id, "client channel closed while sending json frame");
        }
    }

    async fn send_frame(&self, tx: &mpsc::Sender<ClientFrame>, frame: ClientFrame) {
        if tx.send(frame).await.is_err() {
            debug!(session_id = %self.session_id, "client channel closed while sending binary frame");
        }
    }

    /// Readiness composition (`spec.md` §4.9): transitions `Connecting ->
    /// Ready` only once both upstream-readiness flags are set, and emits
    /// the client-facing `ready` frame exactly once.
    async fn maybe_enter_ready(
        &self,
        client_tx: &mpsc::Sender<ClientFrame>,
        state: &mut MediatorState,
        watchdog_armed: &mut bool,
        voice_ready: bool,
        video_ready: bool,
    ) {
        if voice_ready && video_ready && *state == MediatorState::Connecting {
            *state = MediatorState::Ready;
            *watchdog_armed = false;
            self.send_json(client_tx, serde_json::json!({ "type": "ready" })).await;
        }
    }

    async fn fail(&self, client_tx: &mpsc::Sender<ClientFrame>, code: &str, message: &str) -> Result<(), MediatorError> {
        self.send_json(
            client_tx,
            serde_json::json!({ "type": "error", "code": code, "message": message }),
        )
        .await;
        Err(MediatorError::Internal(message.to_string()))
    }

    /// Runs every teardown step unconditionally (`spec.md` §4.9 Teardown):
    /// close upstream sockets, end the video stream, commit
    /// conversation-minutes if the session ran long enough, persist the
    /// transcript if non-empty, and tell the client why.
    #[allow(clippy::too_many_arguments)]
    async fn teardown(
        &self,
        client_tx: &mpsc::Sender<ClientFrame>,
        voice_sink: &mut futures_util::stream::SplitSink<
            tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
            WsMessage,
        >,
        video_sink: &mut Option<
            futures_util::stream::SplitSink<
                tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
                WsMessage,
            >,
        >,
        started_at: chrono::DateTime<Utc>,
        transcript: Vec<TranscriptTurn>,
        failure: Option<(&str, &str)>,
    ) -> Result<(), MediatorError> {
        let _ = voice_sink.send(WsMessage::Close(None)).await;
        if let Some(sink) = video_sink.as_mut() {
            let _ = sink.send(WsMessage::Close(None)).await;
        }
        if let Some(video) = &self.deps.video {
            if let Err(e) = video.end_stream(&self.session_id.to_string()).await {
                warn!(session_id = %self.session_id, error = %e, "failed to end video stream upstream");
            }
        }

        // Readiness never completed, so no conversation happened — the
        // watchdog firing after 20-30s already clears the 0.1-minute floor,
        // but `spec.md` §8/scenario 6 is explicit that a readiness timeout
        // commits no usage.
        let is_readiness_timeout = matches!(failure, Some(("timeout", _)));
        let minutes = (Utc::now() - started_at).num_milliseconds() as f64 / 60_000.0;
        if minutes > 0.1 && !is_readiness_timeout {
            self.deps.usage.commit(self.owner_id, UsageResource::ConversationMinutes, minutes).await;
        }

        if !transcript.is_empty() {
            let session = Session {
                id: self.session_id,
                owner_id: self.owner_id,
                avatar_id: self.avatar_id,
                kind: self.kind,
                language: self.language.clone(),
                started_at,
                status: if failure.is_some() { SessionStatus::Failed } else { SessionStatus::Ended },
                transcript,
            };
            if let Err(e) = self.deps.sessions.create(&session).await {
                warn!(session_id = %self.session_id, error = %e, "failed to persist session transcript");
            }
        }

        if let Some((code, message)) = failure {
            self.send_json(
                client_tx,
                serde_json::json!({ "type": "error", "code": code, "message": message }),
            )
            .await;
            Err(MediatorError::Internal(message.to_string()))
        } else {
            Ok(())
        }
    }
}
