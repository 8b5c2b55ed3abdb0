use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::jwt::{verify_token, TokenType};
use crate::dto::{ChatMessageFrame, ServerEvent};
use crate::handlers::matchmaking::publish;
use crate::models::matchmaking::{ChatSession, SessionStatus};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Response {
    // Browsers cannot set headers on a WebSocket upgrade, so the access token rides in the query
    let user_id = match authenticate_ws(&state, query.token.as_deref()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("WebSocket auth failed: {}", e);
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

fn authenticate_ws(state: &AppState, token: Option<&str>) -> Result<Uuid, &'static str> {
    let token = token.ok_or("Missing token query parameter")?;

    let token_data =
        verify_token(token, &state.config).map_err(|_| "Invalid or expired token")?;

    if token_data.claims.token_type != TokenType::Access {
        return Err("Must use access token for WebSocket");
    }

    Ok(token_data.claims.sub)
}

/// Whether a broadcast payload is addressed to `user_id`.
fn is_addressed_to(payload: &str, user_id: Uuid) -> bool {
    serde_json::from_str::<serde_json::Value>(payload)
        .ok()
        .and_then(|v| v.get("user_id").and_then(|id| id.as_str()).map(String::from))
        .is_some_and(|id| id == user_id.to_string())
}

/// Relay one chat frame to the sender's partner. Frames for sessions the
/// sender is not an active member of are dropped.
async fn relay_chat_message(state: &AppState, sender: Uuid, frame: ChatMessageFrame) {
    if frame.validate().is_err() {
        tracing::debug!(user_id = %sender, "Dropping invalid chat frame");
        return;
    }

    let session = sqlx::query_as::<_, ChatSession>(
        "SELECT * FROM video_chat_sessions WHERE id = $1 AND status = $2",
    )
    .bind(frame.session_id)
    .bind(SessionStatus::Active)
    .fetch_optional(&state.db)
    .await;

    let partner = match session {
        Ok(Some(session)) => session.partner_of(sender),
        Ok(None) => None,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load chat session");
            None
        }
    };
    let Some(partner) = partner else {
        tracing::debug!(user_id = %sender, session_id = %frame.session_id, "Chat frame for unknown session");
        return;
    };

    let from = match sqlx::query_scalar::<_, String>("SELECT anonymous_id FROM users WHERE id = $1")
        .bind(sender)
        .fetch_one(&state.db)
        .await
    {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load sender handle");
            return;
        }
    };

    publish(
        state,
        &ServerEvent::ChatMessage {
            user_id: partner,
            session_id: frame.session_id,
            from,
            body: frame.body,
        },
    );
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();

    tracing::debug!(user_id = %user_id, "WebSocket connection established");

    let mut rx = state.ws_tx.subscribe();

    let mut send_task = tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            if !is_addressed_to(&msg, user_id) {
                continue;
            }
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ChatMessageFrame>(&text) {
                    Ok(frame) => relay_chat_message(&state, user_id, frame).await,
                    Err(e) => {
                        tracing::debug!(user_id = %user_id, error = %e, "Unparseable chat frame")
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::debug!(user_id = %user_id, "WebSocket connection closed");
}
