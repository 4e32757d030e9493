//! services/api/src/web/ws_handler.rs
//!
//! Live presence stream. Each connection owns a `PresenceBoard`, forwards every
//! snapshot it publishes, and applies the client's day and filter changes. The
//! board's store subscriptions are released when the connection ends.

use crate::web::{
    errors::HttpError,
    protocol::{ClientMessage, ServerMessage},
    rest::{parse_day, FilterQuery, PresenceQuery, PresenceResponse},
    state::AppState,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use school_ops_core::PresenceBoard;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
///
/// The query picks the initial day and filter, exactly as for `GET /presence`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<PresenceQuery>,
) -> Result<Response, HttpError> {
    let day = query.day()?;
    let filter = query.filter()?;
    Ok(ws.on_upgrade(move |socket| async move {
        let board = PresenceBoard::open(
            app_state.roster.as_ref(),
            app_state.attendance.clone(),
            day,
            filter,
        );
        handle_socket(socket, &board).await;
        board.close();
        info!("Presence stream closed.");
    }))
}

async fn handle_socket(socket: WebSocket, board: &PresenceBoard) {
    info!(day = %board.day(), "New presence stream established");
    let (mut sender, mut receiver) = socket.split();
    let mut updates = board.watch();

    // --- 1. Initial Snapshot ---
    if send_snapshot(&mut sender, board, &mut updates).await.is_err() {
        return;
    }

    // --- 2. Main Message Loop ---
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                if send_snapshot(&mut sender, board, &mut updates).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if let Err(message) = apply_client_message(board, text.as_str()) {
                        warn!("Rejected client message: {}", message);
                        if send(&mut sender, &ServerMessage::Error { message }).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Client disconnected.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket receive failed: {}", e);
                    break;
                }
            },
        }
    }
}

/// Applies one client message to the board. The error is sent back to the client.
fn apply_client_message(board: &PresenceBoard, text: &str) -> Result<(), String> {
    let message = serde_json::from_str::<ClientMessage>(text)
        .map_err(|e| format!("Unrecognised message: {}", e))?;
    match message {
        ClientMessage::SelectDay { day } => {
            let day = day.trim();
            parse_day(day).map_err(HttpError::into_message)?;
            info!(day, "Presence stream switched day");
            board.select_day(day);
        }
        ClientMessage::SetFilter { class, level } => {
            let filter = FilterQuery { class, level }
                .to_filter()
                .map_err(HttpError::into_message)?;
            info!(?filter, "Presence stream switched filter");
            board.set_filter(filter);
        }
    }
    Ok(())
}

async fn send_snapshot(
    sender: &mut SplitSink<WebSocket, Message>,
    board: &PresenceBoard,
    updates: &mut watch::Receiver<school_ops_core::PresenceSnapshot>,
) -> Result<(), axum::Error> {
    let presence = {
        let snapshot = updates.borrow_and_update();
        PresenceResponse::new(board.day(), &snapshot)
    };
    send(sender, &ServerMessage::Snapshot { presence }).await
}

async fn send(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(message) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            Ok(())
        }
    }
}
