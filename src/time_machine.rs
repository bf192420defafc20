//! Time Machine: named bookmarks into the session history.
//!
//! A tag maps a modal name to the stack position of that modal's base entry.
//! Tags are persisted to session storage so they survive a reload, and they are
//! purged as soon as the history they point into is left behind.

use crate::config::ModalRouteConfig;
use crate::error::{ModalError, StorageError};
use crate::history::{HistoryAdapter, HistoryChange, HistoryObserver, HistoryState};
use crate::storage::SessionStorage;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

const TAGS_KEY: &str = "tags";
const UNLOAD_KEY: &str = "unload";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTag {
    pub name: String,
    pub position: i64,
}

/// One entry to write into the history stack.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteItem {
    pub path: String,
    /// Tags to record once this entry is written
    pub tags: Vec<String>,
    /// Tag position relative to this entry's position
    pub tag_offset: i64,
    /// Come back to this entry after every item is written
    pub stay: bool,
}

impl WriteItem {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn tagged(mut self, name: impl Into<String>, offset: i64) -> Self {
        self.tags.push(name.into());
        self.tag_offset = offset;
        self
    }

    pub fn stay(mut self) -> Self {
        self.stay = true;
        self
    }
}

pub struct TimeMachine {
    adapter: Arc<HistoryAdapter>,
    storage: Arc<dyn SessionStorage>,
    tags_key: String,
    unload_key: String,
    tags: Mutex<Vec<HistoryTag>>,
}

impl TimeMachine {
    /// Load persisted tags and subscribe to history changes.
    ///
    /// Tags at or beyond the current position describe forward history that a
    /// reload made unreachable, and tags past an unload boundary describe
    /// history a previous page left half-written; both are dropped.
    pub fn load(
        adapter: Arc<HistoryAdapter>,
        storage: Arc<dyn SessionStorage>,
        config: &ModalRouteConfig,
    ) -> Result<Arc<Self>, ModalError> {
        let tags_key = config.storage_key(TAGS_KEY);
        let unload_key = config.storage_key(UNLOAD_KEY);

        let mut tags: Vec<HistoryTag> = match storage.get(&tags_key)? {
            Some(raw) => serde_json::from_value(raw).map_err(|e| StorageError::Serialization {
                key: tags_key.clone(),
                message: e.to_string(),
            })?,
            None => Vec::new(),
        };
        let current = adapter.native_position();
        tags.retain(|t| t.position < current);

        if let Some(raw) = storage.get(&unload_key)? {
            if let Some(boundary) = raw.as_i64() {
                debug!(boundary, "discarding tags past previous unload boundary");
                tags.retain(|t| t.position < boundary);
            }
            storage.delete(&unload_key)?;
        }

        let machine = Arc::new(Self {
            adapter: adapter.clone(),
            storage,
            tags_key,
            unload_key,
            tags: Mutex::new(tags),
        });
        machine.persist()?;
        let weak: Weak<dyn HistoryObserver> = Arc::downgrade(&machine) as Weak<dyn HistoryObserver>;
        adapter.add_observer(weak);
        Ok(machine)
    }

    pub fn adapter(&self) -> &Arc<HistoryAdapter> {
        &self.adapter
    }

    /// Record `name -> position` (default: current position), overwriting any older tag.
    pub fn tag(&self, name: &str, position: Option<i64>) -> Result<(), ModalError> {
        let position = position.unwrap_or_else(|| self.adapter.native_position());
        {
            let mut tags = self.tags.lock();
            tags.retain(|t| t.name != name);
            tags.push(HistoryTag {
                name: name.to_string(),
                position,
            });
        }
        debug!(name, position, "tagged history position");
        self.persist()
    }

    /// Most recently written position for `name`
    pub fn position_by_tag(&self, name: &str) -> Option<i64> {
        self.tags
            .lock()
            .iter()
            .rev()
            .find(|t| t.name == name)
            .map(|t| t.position)
    }

    pub fn remove_tag(&self, name: &str) -> Result<(), ModalError> {
        self.tags.lock().retain(|t| t.name != name);
        self.persist()
    }

    pub fn tags(&self) -> Vec<HistoryTag> {
        self.tags.lock().clone()
    }

    /// Drop every tag at or beyond `position`. Safe to repeat.
    pub fn purge_from(&self, position: i64) -> Result<usize, ModalError> {
        let removed = {
            let mut tags = self.tags.lock();
            let before = tags.len();
            tags.retain(|t| t.position < position);
            before - tags.len()
        };
        if removed > 0 {
            debug!(position, removed, "purged superseded history tags");
            self.persist()?;
        }
        Ok(removed)
    }

    /// Remember that the page went away at `position` while history was being rewritten.
    pub fn mark_unload(&self, position: i64) -> Result<(), ModalError> {
        self.storage.set(&self.unload_key, &Value::from(position))?;
        Ok(())
    }

    /// Traverse to the position tagged `name`.
    pub async fn go_to_tag(
        &self,
        name: &str,
        trigger_side_effects: bool,
    ) -> Result<HistoryState, ModalError> {
        let position = self
            .position_by_tag(name)
            .ok_or_else(|| ModalError::TagNotFound(name.to_string()))?;
        let delta = position - self.adapter.native_position();
        self.adapter.go_to_delta(delta, trigger_side_effects).await
    }

    /// Write `items` into the stack, replacing the current entry first when `current`.
    pub async fn write(&self, items: &[WriteItem], current: bool) -> Result<(), ModalError> {
        let mut stay_position = None;
        for (index, item) in items.iter().enumerate() {
            if index == 0 && current {
                self.adapter.replace(&item.path, Value::Null);
            } else {
                self.adapter.push(&item.path, Value::Null);
            }
            let position = self.adapter.native_position();
            for name in &item.tags {
                self.tag(name, Some(position + item.tag_offset))?;
            }
            if item.stay {
                stay_position = Some(position);
            }
        }
        if let Some(stay) = stay_position {
            let delta = stay - self.adapter.native_position();
            self.adapter.go_to_delta(delta, false).await?;
        }
        Ok(())
    }

    /// Go to `tag` first, then write `items` from there.
    pub async fn rewrite_from(
        &self,
        tag: &str,
        items: &[WriteItem],
        trigger_side_effects: bool,
    ) -> Result<(), ModalError> {
        self.go_to_tag(tag, trigger_side_effects).await?;
        self.write(items, true).await
    }

    fn persist(&self) -> Result<(), ModalError> {
        let snapshot = self.tags.lock().clone();
        let value = serde_json::to_value(&snapshot).map_err(|e| StorageError::Serialization {
            key: self.tags_key.clone(),
            message: e.to_string(),
        })?;
        self.storage.set(&self.tags_key, &value)?;
        Ok(())
    }
}

impl HistoryObserver for TimeMachine {
    fn on_change(&self, change: &HistoryChange) {
        let position = match change {
            HistoryChange::Traverse { state, .. } => state.position,
            HistoryChange::Push(state) => state.position,
            HistoryChange::Replace(_) => return,
        };
        if let Err(err) = self.purge_from(position) {
            warn!(error = %err, "failed to purge history tags");
        }
    }
}
