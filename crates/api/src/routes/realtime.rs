//! `GET /voice-chat`, `GET /video-chat` (`spec.md` §6.2): upgrades a
//! browser WebSocket and bridges it to `services::SessionMediator`.
//!
//! This is the axum glue only — all state-machine logic lives in
//! `services::session_mediator`, following the teacher's split between
//! `handle_realtime_socket` (`crates/api/src/routes/realtime.rs`) and
//! `RealtimeServiceImpl` (`crates/services/src/realtime/mod.rs`).

use crate::middleware::auth::parse_ws_owner;
use crate::state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use services::{ClientFrame, ClientInbound, SessionMediator, SessionMediatorDeps};
use domain::session::SessionKind;
use tokio::sync::mpsc;
use tracing::{error, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    #[serde(rename = "avatarId")]
    avatar_id: Uuid,
    token: String,
    #[serde(rename = "voiceUrl")]
    voice_url: Option<String>,
    #[serde(default = "default_language")]
    language: String,
}

fn default_language() -> String {
    "en".to_string()
}

pub async fn voice_chat(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<ChatQuery>,
) -> impl IntoResponse {
    upgrade(ws, state, query, SessionKind::Voice).await
}

pub async fn video_chat(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<ChatQuery>,
) -> impl IntoResponse {
    upgrade(ws, state, query, SessionKind::Video).await
}

async fn upgrade(
    ws: WebSocketUpgrade,
    state: AppState,
    query: ChatQuery,
    kind: SessionKind,
) -> axum::response::Response {
    let owner_id = match parse_ws_owner(&query.token) {
        Ok(id) => id,
        Err(_) => return StatusCode::UNAUTHORIZED.into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, query, kind, owner_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, query: ChatQuery, kind: SessionKind, owner_id: Uuid) {
    let session_id = Uuid::new_v4();

    let avatar = match state.avatars.get(query.avatar_id).await {
        Ok(a) => a,
        Err(e) => {
            error!(session_id = %session_id, error = %e, "failed to load avatar for session");
            let _ = fail_before_upgrade(socket, "avatar_not_found", &e.to_string()).await;
            return;
        }
    };

    let voice_ws = match state.voice.connect().await {
        Ok(ws) => ws,
        Err(e) => {
            error!(session_id = %session_id, error = %e, "failed to connect voice upstream");
            let _ = fail_before_upgrade(socket, "voice_unavailable", &e.to_string()).await;
            return;
        }
    };

    let video_ws = if kind == SessionKind::Video {
        let Some(image_url) = avatar.image_url.clone() else {
            let _ = fail_before_upgrade(socket, "avatar_incomplete", "avatar has no image").await;
            return;
        };
        if let Err(e) = state.video.init_stream(&session_id.to_string(), &image_url).await {
            error!(session_id = %session_id, error = %e, "failed to init video upstream stream");
            let _ = fail_before_upgrade(socket, "video_unavailable", &e.to_string()).await;
            return;
        }
        match state.video.connect_stream(&session_id.to_string()).await {
            Ok(ws) => Some(ws),
            Err(e) => {
                error!(session_id = %session_id, error = %e, "failed to connect video upstream");
                let _ = fail_before_upgrade(socket, "video_unavailable", &e.to_string()).await;
                return;
            }
        }
    } else {
        None
    };

    let (mut ws_sink, mut ws_stream) = socket.split();
    let (client_tx, mut client_out_rx) = mpsc::channel::<ClientFrame>(64);
    let (client_in_tx, client_in_rx) = mpsc::channel::<ClientInbound>(64);

    tokio::spawn(async move {
        while let Some(frame) = client_out_rx.recv().await {
            let msg = match frame {
                ClientFrame::Binary(prefix, bytes) => {
                    let mut framed = Vec::with_capacity(bytes.len() + 1);
                    framed.push(prefix);
                    framed.extend(bytes);
                    Message::Binary(framed.into())
                }
                ClientFrame::Json(value) => Message::Text(value.to_string().into()),
            };
            if ws_sink.send(msg).await.is_err() {
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) {
                        let inbound = match value.get("type").and_then(|t| t.as_str()) {
                            Some("user_text") => value
                                .get("text")
                                .and_then(|t| t.as_str())
                                .map(|t| ClientInbound::UserText(t.to_string())),
                            Some("stop_speaking") => Some(ClientInbound::StopSpeaking),
                            _ => None,
                        };
                        if let Some(inbound) = inbound {
                            if client_in_tx.send(inbound).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "client websocket read error");
                    break;
                }
            }
        }
    });

    let deps = SessionMediatorDeps {
        llm: state.llm.clone(),
        usage: state.usage.clone(),
        sessions: std::sync::Arc::new(state.db.sessions.clone()),
        video: if kind == SessionKind::Video { Some(state.video.clone()) } else { None },
    };

    let mediator = SessionMediator::new(
        session_id,
        owner_id,
        query.avatar_id,
        kind,
        query.language,
        avatar.persona_prompt.clone(),
        deps,
    );

    let cancel = state.shutdown.child_token();
    if let Err(e) = mediator.run(voice_ws, video_ws, query.voice_url, client_tx, client_in_rx, cancel).await {
        warn!(session_id = %session_id, error = %e, "session ended with an error");
    }
}

/// Sends a single error frame over a socket that never finished upgrading
/// into a mediated session (avatar missing, upstream unreachable), then
/// closes it.
async fn fail_before_upgrade(mut socket: WebSocket, code: &str, message: &str) -> Result<(), axum::Error> {
    let frame = serde_json::json!({ "type": "error", "code": code, "message": message });
    socket.send(Message::Text(frame.to_string().into())).await?;
    socket.close().await
}
