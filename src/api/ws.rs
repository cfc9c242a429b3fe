//! WebSocket chat sessions.
//!
//! Every inbound text message is one turn and gets exactly one text reply,
//! in arrival order. Messages that arrive while a turn is running are
//! queued, up to [`MAX_PENDING_TURNS`]; past that the socket is not read
//! until the turn finishes. Closing the socket drops the turn in flight.

use std::collections::VecDeque;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::AppState;
use crate::chat::ChatService;

/// Messages buffered while a turn runs before reads pause.
const MAX_PENDING_TURNS: usize = 16;

pub(super) async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state.chat))
}

async fn handle_socket(socket: WebSocket, chat: ChatService) {
    let session = Uuid::new_v4();
    info!(%session, "Chat session opened");

    let (mut sender, mut receiver) = socket.split();
    let mut pending: VecDeque<String> = VecDeque::new();

    loop {
        let message = match pending.pop_front() {
            Some(message) => message,
            None => match next_text(&mut receiver).await {
                Some(message) => message,
                None => break,
            },
        };
        debug!(%session, len = message.len(), "Turn started");

        let turn = chat.respond(&message);
        tokio::pin!(turn);

        let reply = loop {
            tokio::select! {
                reply = &mut turn => break Some(reply),
                incoming = next_text(&mut receiver), if pending.len() < MAX_PENDING_TURNS => {
                    match incoming {
                        Some(text) => pending.push_back(text),
                        None => break None,
                    }
                }
            }
        };

        let Some(reply) = reply else {
            debug!(%session, "Client left mid-turn, dropping it");
            break;
        };

        if sender.send(Message::Text(reply.into())).await.is_err() {
            break;
        }
    }

    info!(%session, "Chat session closed");
}

/// Next text frame from the client, or `None` once the socket is done.
async fn next_text(receiver: &mut SplitStream<WebSocket>) -> Option<String> {
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => return Some(text.as_str().to_string()),
            Ok(Message::Close(_)) => return None,
            // ping/pong are answered by axum; binary is not part of the protocol
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "WebSocket receive failed");
                return None;
            }
        }
    }
    None
}
