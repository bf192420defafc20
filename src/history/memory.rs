//! In-memory session history.
//!
//! Behaves like a browser tab's history: pushing truncates forward entries,
//! traversals outside the stack are ignored, and every successful traversal
//! fires an event on the broadcast channel. The stack outlives any controller
//! built on it, so dropping a controller and building a new one over the same
//! `MemoryHistory` models a page reload.

use super::{HistoryEvent, HistoryState, SessionHistory};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::broadcast;

const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone)]
struct Entry {
    url: String,
    extra: Value,
    replaced: bool,
}

#[derive(Debug)]
struct Inner {
    entries: Vec<Entry>,
    index: usize,
}

impl Inner {
    fn state(&self) -> HistoryState {
        let entry = &self.entries[self.index];
        HistoryState {
            position: self.index as i64,
            current: entry.url.clone(),
            back: self
                .index
                .checked_sub(1)
                .map(|i| self.entries[i].url.clone()),
            forward: self.entries.get(self.index + 1).map(|e| e.url.clone()),
            replaced: entry.replaced,
            extra: entry.extra.clone(),
        }
    }
}

pub struct MemoryHistory {
    inner: Mutex<Inner>,
    events: broadcast::Sender<HistoryEvent>,
}

impl MemoryHistory {
    /// A fresh tab whose only entry is `initial_url`
    pub fn new(initial_url: &str) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            inner: Mutex::new(Inner {
                entries: vec![Entry {
                    url: initial_url.to_string(),
                    extra: Value::Null,
                    replaced: false,
                }],
                index: 0,
            }),
            events,
        }
    }

    /// Every entry's full path, bottom first
    pub fn entries(&self) -> Vec<String> {
        self.inner
            .lock()
            .entries
            .iter()
            .map(|e| e.url.clone())
            .collect()
    }

    /// Index of the displayed entry
    pub fn index(&self) -> usize {
        self.inner.lock().index
    }
}

impl SessionHistory for MemoryHistory {
    fn push(&self, url: &str, extra: Value) {
        let mut inner = self.inner.lock();
        let keep = inner.index + 1;
        inner.entries.truncate(keep);
        inner.entries.push(Entry {
            url: url.to_string(),
            extra,
            replaced: false,
        });
        inner.index = keep;
    }

    fn replace(&self, url: &str, extra: Value) {
        let mut inner = self.inner.lock();
        let index = inner.index;
        inner.entries[index] = Entry {
            url: url.to_string(),
            extra,
            replaced: true,
        };
    }

    fn go(&self, delta: i64, notify: bool) {
        let event = {
            let mut inner = self.inner.lock();
            let target = inner.index as i64 + delta;
            if delta == 0 || target < 0 || target >= inner.entries.len() as i64 {
                return;
            }
            inner.index = target as usize;
            HistoryEvent {
                state: inner.state(),
                delta,
                notify,
            }
        };
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn state(&self) -> HistoryState {
        self.inner.lock().state()
    }

    fn location(&self) -> String {
        let inner = self.inner.lock();
        inner.entries[inner.index].url.clone()
    }

    fn length(&self) -> usize {
        self.inner.lock().entries.len()
    }

    fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
        self.events.subscribe()
    }
}
