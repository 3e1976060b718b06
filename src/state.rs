//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the `BoardStore`, the in-memory registry that is the sole source of
//! truth for boards. Each board sits behind its own mutex so one board's
//! preview rendering never stalls dispatch for another board; the outer
//! registry lock is only held long enough to look up or insert entries.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, mpsc};
use uuid::Uuid;

use crate::event::ServerEvent;
use crate::render::Preview;

// =============================================================================
// SEGMENT
// =============================================================================

/// A point in the board's reference coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// One freehand stroke primitive. Immutable once appended to a board's log.
///
/// The log stores the canonical nested form; deserialization additionally
/// accepts the legacy flat `{x0, y0, x1, y1, color, size}` shape. Both
/// endpoints are required — `color` and `size` fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
    pub color: String,
    pub size: f64,
}

fn default_color() -> String {
    "#000000".to_owned()
}

fn default_size() -> f64 {
    2.0
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SegmentWire {
    Nested {
        from: Point,
        to: Point,
        #[serde(default = "default_color")]
        color: String,
        #[serde(default = "default_size")]
        size: f64,
    },
    Flat {
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        #[serde(default = "default_color")]
        color: String,
        #[serde(default = "default_size")]
        size: f64,
    },
}

impl From<SegmentWire> for Segment {
    fn from(wire: SegmentWire) -> Self {
        match wire {
            SegmentWire::Nested { from, to, color, size } => Self { from, to, color, size },
            SegmentWire::Flat { x0, y0, x1, y1, color, size } => Self {
                from: Point { x: x0, y: y0 },
                to: Point { x: x1, y: y1 },
                color,
                size,
            },
        }
    }
}

impl<'de> Deserialize<'de> for Segment {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        SegmentWire::deserialize(deserializer).map(Self::from)
    }
}

// =============================================================================
// BOARD STATE
// =============================================================================

/// Per-board live state: the authoritative segment log, the derived preview,
/// and the fan-out group of connected clients.
pub struct BoardState {
    pub name: String,
    /// Creation sequence number. Gives directory listings a stable order.
    pub seq: u64,
    /// Append-only log, reset only by a full clear.
    pub segments: Vec<Segment>,
    /// Derived preview cache. Always equals `render(&segments)`.
    pub preview: Preview,
    /// Connected clients: `client_id` -> sender for outgoing events.
    pub clients: HashMap<Uuid, mpsc::Sender<ServerEvent>>,
}

impl BoardState {
    #[must_use]
    pub fn new(name: impl Into<String>, seq: u64) -> Self {
        Self {
            name: name.into(),
            seq,
            segments: Vec::new(),
            preview: Preview::new(),
            clients: HashMap::new(),
        }
    }

    /// Append one segment and fold it into the preview. The caller holds the
    /// board's mutex, so log and preview can never disagree.
    pub fn append(&mut self, segment: Segment) {
        self.preview.apply(&segment);
        self.segments.push(segment);
    }

    /// Truncate the log and reset the preview to the blank state.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.preview.reset();
    }
}

// =============================================================================
// BOARD STORE
// =============================================================================

/// Growth caps for the in-memory store. Draws past the segment cap and
/// creations past the board cap are rejected rather than growing unbounded.
#[derive(Debug, Clone, Copy)]
pub struct StoreLimits {
    pub max_boards: usize,
    pub max_segments_per_board: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self { max_boards: 1024, max_segments_per_board: 50_000 }
    }
}

/// Registry of live boards. Constructed once at startup and injected into
/// both the websocket gateway and the directory routes; no board exists
/// outside this map, and boards live until process termination.
#[derive(Clone)]
pub struct BoardStore {
    pub boards: Arc<RwLock<HashMap<Uuid, Arc<Mutex<BoardState>>>>>,
    pub limits: StoreLimits,
    next_seq: Arc<AtomicU64>,
}

impl BoardStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(StoreLimits::default())
    }

    #[must_use]
    pub fn with_limits(limits: StoreLimits) -> Self {
        Self {
            boards: Arc::new(RwLock::new(HashMap::new())),
            limits,
            next_seq: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for BoardStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub store: BoardStore,
}

impl AppState {
    #[must_use]
    pub fn new(store: BoardStore) -> Self {
        Self { store }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
