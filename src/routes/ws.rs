//! WebSocket handler — the session gateway.
//!
//! DESIGN
//! ======
//! On upgrade, each connection gets a fresh client id and a bounded outbox
//! channel, then enters a `select!` loop:
//! - Incoming client events → parse + dispatch to the board service
//! - Events fanned out by board peers → forward to the socket
//!
//! A session is joined to at most one board; a later join switches
//! membership. Every failure on this path — malformed JSON, a segment
//! missing an endpoint, a draw against an unknown board, a full board — is
//! logged and dropped without a reply: the protocol defines no error event,
//! and one session's bad input must never disturb the rest.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → session starts unjoined
//! 2. `join-board` → register with the board, reply `init` with the log
//! 3. `draw-segment` / `clear-board` → mutate + fan out via the service
//! 4. Close → leave the current board, nothing else

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::event::{ClientEvent, ServerEvent};
use crate::services::board;
use crate::state::AppState;

/// Outbox depth per connection. A session that falls further behind than
/// this starts missing fan-out events (best-effort delivery).
const OUTBOX_CAPACITY: usize = 256;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_session(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for receiving fan-out events from board peers.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(OUTBOX_CAPACITY);

    info!(%client_id, "ws: client connected");

    // Which board this session is currently joined to.
    let mut current_board: Option<Uuid> = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let replies =
                            process_inbound_text(&state, &mut current_board, client_id, &client_tx, &text).await;
                        for event in replies {
                            let _ = send_event(&mut socket, &event).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(event) = client_rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(board_id) = current_board {
        board::leave(&state.store, board_id, client_id).await;
    }
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Parse and process one inbound text frame, returning the events destined
/// for the sender. Fan-out to peers happens inside the board service.
///
/// Kept separate from the socket loop so tests can exercise join, draw, and
/// clear semantics without a live connection.
async fn process_inbound_text(
    state: &AppState,
    current_board: &mut Option<Uuid>,
    client_id: Uuid,
    client_tx: &mpsc::Sender<ServerEvent>,
    text: &str,
) -> Vec<ServerEvent> {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: dropping malformed event");
            return Vec::new();
        }
    };

    match event {
        ClientEvent::JoinBoard { board_id } => {
            // Last join wins: leave the previous board before switching.
            if let Some(old_board) = current_board.take() {
                board::leave(&state.store, old_board, client_id).await;
            }

            match board::join(&state.store, board_id, client_id, client_tx.clone()).await {
                Ok(segments) => {
                    *current_board = Some(board_id);
                    vec![ServerEvent::Init { segments }]
                }
                Err(e) => {
                    warn!(%client_id, %board_id, error = %e, "ws: join dropped");
                    Vec::new()
                }
            }
        }
        ClientEvent::DrawSegment { board_id, segment } => {
            if let Err(e) = board::append_segment(&state.store, board_id, segment, Some(client_id)).await {
                warn!(%client_id, %board_id, error = %e, "ws: draw dropped");
            }
            Vec::new()
        }
        ClientEvent::ClearBoard { board_id } => {
            if let Err(e) = board::clear_board(&state.store, board_id).await {
                warn!(%client_id, %board_id, error = %e, "ws: clear dropped");
            }
            Vec::new()
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize event");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
