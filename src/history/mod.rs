//! Session history primitives.
//!
//! [`SessionHistory`] is the native stack the engine runs on: a browser binding in
//! production, [`memory::MemoryHistory`] in tests and headless hosts. The
//! [`adapter::HistoryAdapter`] layers position tracking and awaitable traversals
//! on top of it.

pub mod adapter;
pub mod memory;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

pub use adapter::{Direction, HistoryAdapter, HistoryChange, HistoryObserver, NavigationClassification, PopListener};
pub use memory::MemoryHistory;

/// Serialized per-entry state, as stored alongside each history entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryState {
    /// Stack position assigned when the entry was created
    pub position: i64,
    /// Full path of the entry
    pub current: String,
    /// Full path of the entry below this one, if any
    pub back: Option<String>,
    /// Full path of the entry above this one, if any
    pub forward: Option<String>,
    /// Entry was written by a replace
    #[serde(default)]
    pub replaced: bool,
    /// Caller-supplied payload
    #[serde(default)]
    pub extra: Value,
}

/// Native "entry changed" event, fired asynchronously after a traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEvent {
    pub state: HistoryState,
    pub delta: i64,
    /// Traversal asked for navigation listeners to run
    pub notify: bool,
}

/// Native session-history stack.
///
/// Mutations are fire-and-forget: `go` only schedules a traversal, whose
/// completion is observed through [`SessionHistory::subscribe`].
pub trait SessionHistory: Send + Sync {
    fn push(&self, url: &str, extra: Value);
    fn replace(&self, url: &str, extra: Value);
    fn go(&self, delta: i64, notify: bool);
    /// State of the entry currently displayed
    fn state(&self) -> HistoryState;
    /// Full path of the entry currently displayed
    fn location(&self) -> String;
    /// Number of entries in the stack
    fn length(&self) -> usize;
    fn subscribe(&self) -> broadcast::Receiver<HistoryEvent>;
}
