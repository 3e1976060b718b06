//! Board service — store operations and room fan-out.
//!
//! DESIGN
//! ======
//! Boards live in the `BoardStore` registry, each behind its own mutex. A
//! mutation (append, clear) runs inside that mutex together with the preview
//! update and the fan-out to subscribers, so the order in which mutations
//! commit is the order in which every observer sees them, and the preview
//! can never reflect a log that skips or duplicates a segment. Joining
//! registers the subscriber and snapshots the log in the same critical
//! section for the same reason.
//!
//! ERROR HANDLING
//! ==============
//! All failures are reported as `BoardError` and handled at the calling
//! boundary: REST maps them to status codes, the websocket gateway logs and
//! drops. Fan-out is `try_send` best-effort — a client with a full outbox
//! misses that event rather than blocking the board.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::info;
use uuid::Uuid;

use crate::event::ServerEvent;
use crate::state::{BoardState, BoardStore, Segment};

/// Name given to boards created without one.
pub const DEFAULT_BOARD_NAME: &str = "Untitled Board";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("board not found: {0}")]
    NotFound(Uuid),
    #[error("board capacity reached")]
    AtCapacity,
    #[error("segment log full for board {0}")]
    LogFull(Uuid),
}

/// Identity of a freshly created board.
#[derive(Debug, Clone)]
pub struct BoardSummary {
    pub id: Uuid,
    pub name: String,
}

/// Full read snapshot of one board.
#[derive(Debug, Clone)]
pub struct BoardDetail {
    pub id: Uuid,
    pub name: String,
    pub segments: Vec<Segment>,
}

/// Directory listing entry with the cached preview PNG.
#[derive(Debug, Clone)]
pub struct BoardListing {
    pub id: Uuid,
    pub name: String,
    pub preview: Vec<u8>,
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a new board under a fresh id.
///
/// # Errors
///
/// Returns `AtCapacity` when the store already holds the maximum number of
/// boards.
pub async fn create_board(store: &BoardStore, name: Option<&str>) -> Result<BoardSummary, BoardError> {
    let name = name.unwrap_or(DEFAULT_BOARD_NAME).to_owned();
    let id = Uuid::new_v4();

    let mut boards = store.boards.write().await;
    if boards.len() >= store.limits.max_boards {
        return Err(BoardError::AtCapacity);
    }
    boards.insert(id, Arc::new(Mutex::new(BoardState::new(&name, store.next_seq()))));
    info!(%id, name, total = boards.len(), "board created");

    Ok(BoardSummary { id, name })
}

/// Return the board entry for `board_id`, creating a placeholder board under
/// that id if none exists yet.
///
/// # Errors
///
/// Returns `AtCapacity` when a placeholder would exceed the board cap.
pub async fn ensure_board(store: &BoardStore, board_id: Uuid) -> Result<Arc<Mutex<BoardState>>, BoardError> {
    {
        let boards = store.boards.read().await;
        if let Some(entry) = boards.get(&board_id) {
            return Ok(Arc::clone(entry));
        }
    }

    let mut boards = store.boards.write().await;
    // Re-check under the write lock: a racing join may have created it.
    if let Some(entry) = boards.get(&board_id) {
        return Ok(Arc::clone(entry));
    }
    if boards.len() >= store.limits.max_boards {
        return Err(BoardError::AtCapacity);
    }
    let entry = Arc::new(Mutex::new(BoardState::new(DEFAULT_BOARD_NAME, store.next_seq())));
    boards.insert(board_id, Arc::clone(&entry));
    info!(%board_id, "board allocated on first join");
    Ok(entry)
}

/// Read snapshot of one board, or `None` if the id is unknown.
pub async fn get_board(store: &BoardStore, board_id: Uuid) -> Option<BoardDetail> {
    let entry = entry(store, board_id).await.ok()?;
    let board = entry.lock().await;
    Some(BoardDetail { id: board_id, name: board.name.clone(), segments: board.segments.clone() })
}

/// Snapshot of all boards in creation order, with cached previews.
pub async fn list_boards(store: &BoardStore) -> Vec<BoardListing> {
    let entries: Vec<(Uuid, Arc<Mutex<BoardState>>)> = {
        let boards = store.boards.read().await;
        boards.iter().map(|(id, e)| (*id, Arc::clone(e))).collect()
    };

    let mut listings = Vec::with_capacity(entries.len());
    for (id, e) in entries {
        let board = e.lock().await;
        listings.push((
            board.seq,
            BoardListing { id, name: board.name.clone(), preview: board.preview.png().to_vec() },
        ));
    }
    listings.sort_by_key(|(seq, _)| *seq);
    listings.into_iter().map(|(_, listing)| listing).collect()
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// Append one segment to a board's log, refresh the preview, and deliver the
/// event to every subscriber except `exclude`.
///
/// # Errors
///
/// Returns `NotFound` for an unknown board (a draw never creates one) and
/// `LogFull` once the board reached its segment cap.
pub async fn append_segment(
    store: &BoardStore,
    board_id: Uuid,
    segment: Segment,
    exclude: Option<Uuid>,
) -> Result<(), BoardError> {
    let entry = entry(store, board_id).await?;
    let mut board = entry.lock().await;

    if board.segments.len() >= store.limits.max_segments_per_board {
        return Err(BoardError::LogFull(board_id));
    }
    board.append(segment.clone());
    fan_out(&board, &ServerEvent::DrawSegment { segment }, exclude);
    Ok(())
}

/// Empty a board's log, reset the preview, and notify every subscriber —
/// including whoever requested the clear.
///
/// # Errors
///
/// Returns `NotFound` for an unknown board.
pub async fn clear_board(store: &BoardStore, board_id: Uuid) -> Result<(), BoardError> {
    let entry = entry(store, board_id).await?;
    let mut board = entry.lock().await;

    board.clear();
    fan_out(&board, &ServerEvent::ClearBoard, None);
    info!(%board_id, "board cleared");
    Ok(())
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

/// Join a board, creating it if unknown. Registers the session's sender and
/// returns the current log; both happen in one critical section, so the
/// snapshot and subsequent broadcasts never overlap or leave a gap.
///
/// # Errors
///
/// Returns `AtCapacity` when the board would have to be created but the
/// store is full.
pub async fn join(
    store: &BoardStore,
    board_id: Uuid,
    client_id: Uuid,
    tx: mpsc::Sender<ServerEvent>,
) -> Result<Vec<Segment>, BoardError> {
    let entry = ensure_board(store, board_id).await?;
    let mut board = entry.lock().await;

    board.clients.insert(client_id, tx);
    let snapshot = board.segments.clone();
    info!(%board_id, %client_id, clients = board.clients.len(), "client joined board");
    Ok(snapshot)
}

/// Leave a board. The board itself stays alive for future joiners.
pub async fn leave(store: &BoardStore, board_id: Uuid, client_id: Uuid) {
    let Ok(entry) = entry(store, board_id).await else {
        return;
    };
    let mut board = entry.lock().await;
    if board.clients.remove(&client_id).is_some() {
        info!(%board_id, %client_id, remaining = board.clients.len(), "client left board");
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn entry(store: &BoardStore, board_id: Uuid) -> Result<Arc<Mutex<BoardState>>, BoardError> {
    let boards = store.boards.read().await;
    boards.get(&board_id).map(Arc::clone).ok_or(BoardError::NotFound(board_id))
}

/// Deliver an event to a board's subscribers, optionally excluding one.
fn fan_out(board: &BoardState, event: &ServerEvent, exclude: Option<Uuid>) {
    for (client_id, tx) in &board.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        // Best-effort: if a client's channel is full, skip it.
        let _ = tx.try_send(event.clone());
    }
}

#[cfg(test)]
#[path = "board_test.rs"]
mod tests;
