//! Navigation History Adapter
//!
//! Wraps a [`SessionHistory`] with position tracking and awaitable traversals.
//!
//! The tracked position is only a snapshot. Every read that matters comes from the
//! native entry state, and the snapshot is replaced whenever the native side
//! confirms a move: immediately for traversals that do not notify the router, and
//! when the router's navigation settles for those that do. Comparing the native
//! position against the snapshot is what gives a navigation its direction.

use super::{HistoryEvent, HistoryState, SessionHistory};
use crate::error::{HistoryError, ModalError};
use crate::router::ResolvedRoute;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, trace};

/// Direction of a navigation relative to the last settled position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Unknown,
}

/// How a navigation relates to the session history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationClassification {
    pub direction: Direction,
    /// First navigation of this page load (or a same-path hydration)
    pub is_init_navigation: bool,
    /// Init navigation of an entry that has history below it
    pub is_refresh: bool,
    pub has_prev_step: bool,
}

/// A change to the native stack, delivered to observers after it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryChange {
    Push(HistoryState),
    Replace(HistoryState),
    Traverse {
        state: HistoryState,
        delta: i64,
        notify: bool,
    },
}

impl HistoryChange {
    pub fn state(&self) -> &HistoryState {
        match self {
            HistoryChange::Push(state) | HistoryChange::Replace(state) => state,
            HistoryChange::Traverse { state, .. } => state,
        }
    }
}

/// Synchronous observer of every stack change.
pub trait HistoryObserver: Send + Sync {
    fn on_change(&self, change: &HistoryChange);
}

/// Receives traversals that asked for navigation side effects.
#[async_trait]
pub trait PopListener: Send + Sync {
    async fn on_pop(&self, event: &HistoryEvent) -> Result<(), ModalError>;
}

pub struct HistoryAdapter {
    native: Arc<dyn SessionHistory>,
    position: Mutex<i64>,
    initial_position: i64,
    observers: Mutex<Vec<Weak<dyn HistoryObserver>>>,
    listener: Mutex<Option<Weak<dyn PopListener>>>,
}

impl HistoryAdapter {
    pub fn new(native: Arc<dyn SessionHistory>) -> Self {
        let initial_position = native.state().position;
        Self {
            native,
            position: Mutex::new(initial_position),
            initial_position,
            observers: Mutex::new(Vec::new()),
            listener: Mutex::new(None),
        }
    }

    pub fn shared(native: Arc<dyn SessionHistory>) -> Arc<Self> {
        Arc::new(Self::new(native))
    }

    /// Last confirmed position
    pub fn position(&self) -> i64 {
        *self.position.lock()
    }

    /// Position of the entry this page load started on
    pub fn initial_position(&self) -> i64 {
        self.initial_position
    }

    /// Authoritative position of the displayed entry
    pub fn native_position(&self) -> i64 {
        self.native.state().position
    }

    pub fn state(&self) -> HistoryState {
        self.native.state()
    }

    pub fn location(&self) -> String {
        self.native.location()
    }

    pub fn length(&self) -> usize {
        self.native.length()
    }

    pub fn add_observer(&self, observer: Weak<dyn HistoryObserver>) {
        self.observers.lock().push(observer);
    }

    pub fn set_pop_listener(&self, listener: Weak<dyn PopListener>) {
        *self.listener.lock() = Some(listener);
    }

    pub fn push(&self, url: &str, extra: Value) {
        self.native.push(url, extra);
        let state = self.sync_position();
        trace!(url, position = state.position, "history push");
        self.notify(&HistoryChange::Push(state));
    }

    pub fn replace(&self, url: &str, extra: Value) {
        self.native.replace(url, extra);
        let state = self.sync_position();
        trace!(url, position = state.position, "history replace");
        self.notify(&HistoryChange::Replace(state));
    }

    /// Replace the snapshot with the native position; called when a navigation settles.
    pub fn sync_position(&self) -> HistoryState {
        let state = self.native.state();
        *self.position.lock() = state.position;
        state
    }

    /// Traverse `delta` entries and resolve once the native event fired.
    ///
    /// `trigger_side_effects` decides whether the router runs a navigation for
    /// the traversal. A zero delta resolves immediately with the current state.
    pub async fn go_to_delta(
        &self,
        delta: i64,
        trigger_side_effects: bool,
    ) -> Result<HistoryState, ModalError> {
        if delta == 0 {
            return Ok(self.native.state());
        }
        let position = self.native.state().position;
        let length = self.native.length();
        let target = position + delta;
        if target < 0 || target >= length as i64 {
            return Err(HistoryError::OutOfRange {
                position,
                delta,
                length,
            }
            .into());
        }

        let mut events = self.native.subscribe();
        debug!(delta, trigger_side_effects, "history traversal");
        self.native.go(delta, trigger_side_effects);
        let event = loop {
            match events.recv().await {
                Ok(event) => break event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return Err(HistoryError::EventStreamClosed.into()),
            }
        };
        let state = event.state.clone();
        self.handle_native_event(event).await?;
        Ok(state)
    }

    /// Entry point for native events: the traversal already happened.
    ///
    /// Browser bindings call this from their `popstate` handler; in-crate
    /// traversals go through [`HistoryAdapter::go_to_delta`].
    pub async fn handle_native_event(&self, event: HistoryEvent) -> Result<(), ModalError> {
        if !event.notify {
            *self.position.lock() = event.state.position;
        }
        self.notify(&HistoryChange::Traverse {
            state: event.state.clone(),
            delta: event.delta,
            notify: event.notify,
        });
        if event.notify {
            let listener = self.listener.lock().as_ref().and_then(Weak::upgrade);
            match listener {
                Some(listener) => listener.on_pop(&event).await?,
                None => *self.position.lock() = event.state.position,
            }
        }
        Ok(())
    }

    pub fn classify(&self, to: &ResolvedRoute, from: &ResolvedRoute) -> NavigationClassification {
        let state = self.native.state();
        let is_init_navigation = from.is_start() || to.full_path() == from.full_path();
        let direction = match state.position.cmp(&self.position()) {
            Ordering::Greater => Direction::Forward,
            Ordering::Less => Direction::Backward,
            Ordering::Equal => Direction::Unknown,
        };
        NavigationClassification {
            direction,
            is_init_navigation,
            is_refresh: is_init_navigation && state.back.is_some(),
            has_prev_step: state.back.is_some(),
        }
    }

    fn notify(&self, change: &HistoryChange) {
        let observers: Vec<Arc<dyn HistoryObserver>> = {
            let mut observers = self.observers.lock();
            observers.retain(|o| o.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };
        for observer in observers {
            observer.on_change(change);
        }
    }
}
