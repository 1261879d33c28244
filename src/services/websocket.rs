use axum::{
    extract::{
        Extension, Path,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::dto::ws_dto::{ClientMessage, ServerMessage};
use crate::error::DraftError;
use crate::services::pick_engine;
use crate::services::room::{Outbound, RoomRegistry, Session};
use crate::services::snapshot::SnapshotKind;

/// Browsers opening a file directly send `Origin: null`; native clients send none.
pub fn origin_allowed(headers: &HeaderMap, allowed: &str) -> bool {
    match headers.get(header::ORIGIN) {
        None => true,
        Some(origin) => origin
            .to_str()
            .map(|o| o == allowed || o == "null")
            .unwrap_or(false),
    }
}

/* Web Socket stuff */
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(code): Path<String>,
    headers: HeaderMap,
    Extension(pool): Extension<SqlitePool>,
    Extension(rooms): Extension<RoomRegistry>,
    Extension(config): Extension<Config>,
) -> Response {
    if !origin_allowed(&headers, &config.allowed_origin) {
        warn!("Rejected websocket for draft {}: origin not allowed", code);
        return (StatusCode::FORBIDDEN, "origin not allowed").into_response();
    }
    ws.on_upgrade(move |socket| handle_socket(socket, code, pool, rooms))
}

async fn handle_socket(socket: WebSocket, code: String, pool: SqlitePool, rooms: RoomRegistry) {
    let (mut sender, mut receiver) = socket.split();
    let (session, mut outbound): (Session, Outbound) = rooms.connect(&code).await;
    info!("Websocket connected to draft {} as session {}", code, session.id());

    // Task to send messages to this client. Ends when the room lets go of the session.
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sender.send(Message::Text(frame.as_ref().into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut recv_task = tokio::spawn(async move {
        let mut identity: Option<String> = None;
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_text(&pool, &rooms, &session, &mut identity, text.as_str()).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
        session.id()
    });

    // Whichever side finishes first takes the other down with it.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        finished = &mut recv_task => {
            if let Ok(session_id) = finished {
                info!("Websocket session {} closed for draft {}", session_id, code);
            }
            send_task.abort();
        }
    }
}

async fn handle_text(
    pool: &SqlitePool,
    rooms: &RoomRegistry,
    session: &Session,
    identity: &mut Option<String>,
    text: &str,
) {
    let message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(e) => {
            warn!("Ignoring malformed message on draft {}: {}", session.code(), e);
            return;
        }
    };

    match message {
        ClientMessage::Join(data) => {
            *identity = Some(data.participant_name.clone());
            session.announce(&data.participant_name);
        }
        ClientMessage::MakePick(data) => {
            if identity.is_none() {
                *identity = data.participant_name.clone();
            }
            let Some(name) = identity.as_deref() else {
                session.send(ServerMessage::PickError(
                    DraftError::Validation("join the draft before picking".into()).to_pick_error(),
                ));
                return;
            };

            match pick_engine::submit_pick(pool, session.code(), name, data.player_id).await {
                Ok(_) => rooms.refresh(session.code(), SnapshotKind::Draft).await,
                Err(e) => {
                    if let DraftError::CommitFailed(source) = &e {
                        error!("Pick failed on draft {}: {:?}", session.code(), source);
                    } else {
                        info!("Pick rejected on draft {} for {}: {}", session.code(), name, e);
                    }
                    session.send(ServerMessage::PickError(e.to_pick_error()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn origin_check() {
        let allowed = "http://localhost:5173";
        let mut headers = HeaderMap::new();
        assert!(origin_allowed(&headers, allowed));

        headers.insert(header::ORIGIN, HeaderValue::from_static("http://localhost:5173"));
        assert!(origin_allowed(&headers, allowed));

        headers.insert(header::ORIGIN, HeaderValue::from_static("null"));
        assert!(origin_allowed(&headers, allowed));

        headers.insert(header::ORIGIN, HeaderValue::from_static("https://evil.example"));
        assert!(!origin_allowed(&headers, allowed));
    }
}
