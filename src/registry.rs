//! Modal registry: per-modal mutable records owned by one controller.

use crate::error::ModalError;
use crate::routes::ModalKind;
use crate::signal::{Fulfiller, OneShot, Pending};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Registration-time metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalMeta {
    /// May be entered by a fresh load or a direct URL
    pub direct: bool,
}

/// Caller-supplied presentation options, settable once per open lifecycle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModalOptions {
    #[serde(default)]
    pub props: Map<String, Value>,
    #[serde(default)]
    pub slots: Vec<String>,
    /// Keep the modal hidden until explicitly unlocked
    #[serde(default)]
    pub manual: bool,
}

/// Read-only copy of a modal record
#[derive(Debug, Clone, PartialEq)]
pub struct ModalInfo {
    pub name: String,
    pub kind: ModalKind,
    pub meta: ModalMeta,
    pub data: Option<Value>,
    pub return_value: Option<Value>,
    pub locked: bool,
    pub options: Option<ModalOptions>,
    pub pending: bool,
}

/// Resolves with the modal's return value once it closes
pub type ModalOutcome = Pending<Option<Value>>;

struct ModalRecord {
    name: String,
    kind: ModalKind,
    meta: ModalMeta,
    data: Option<Value>,
    return_value: Option<Value>,
    /// A return value was recorded since the last activation
    returned: bool,
    locked: bool,
    options: Option<ModalOptions>,
    pending: Option<Fulfiller<Option<Value>>>,
}

impl ModalRecord {
    fn info(&self) -> ModalInfo {
        ModalInfo {
            name: self.name.clone(),
            kind: self.kind,
            meta: self.meta,
            data: self.data.clone(),
            return_value: self.return_value.clone(),
            locked: self.locked,
            options: self.options.clone(),
            pending: self.pending.is_some(),
        }
    }
}

#[derive(Default)]
pub struct ModalRegistry {
    records: Mutex<HashMap<String, ModalRecord>>,
}

impl ModalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: &str, kind: ModalKind, meta: ModalMeta) -> Result<(), ModalError> {
        let mut records = self.records.lock();
        if records.contains_key(name) {
            return Err(ModalError::AlreadyRegistered(name.to_string()));
        }
        records.insert(
            name.to_string(),
            ModalRecord {
                name: name.to_string(),
                kind,
                meta,
                data: None,
                return_value: None,
                returned: false,
                locked: false,
                options: None,
                pending: None,
            },
        );
        debug!(name, kind = kind.as_str(), direct = meta.direct, "registered modal");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<ModalInfo, ModalError> {
        self.get_unsafe(name)
            .ok_or_else(|| ModalError::NotFound(format!("modal '{}'", name)))
    }

    pub fn get_unsafe(&self, name: &str) -> Option<ModalInfo> {
        self.records.lock().get(name).map(ModalRecord::info)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.lock().contains_key(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ModalKind> {
        self.records.lock().get(name).map(|r| r.kind)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.records.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Set activation data and hand out a fresh completion signal.
    ///
    /// A stale signal from an earlier activation is dropped, so its waiter
    /// resolves with `None`. The last return value stays readable; only a value
    /// recorded after this activation reaches the new signal.
    pub fn activate(&self, name: &str, data: Option<Value>) -> Result<ModalOutcome, ModalError> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(name)
            .ok_or_else(|| ModalError::NotFound(format!("modal '{}'", name)))?;
        let (fulfiller, pending) = OneShot::pair();
        record.data = data;
        record.returned = false;
        record.pending = Some(fulfiller);
        Ok(pending)
    }

    /// Clear data and resolve the pending signal with the value returned during
    /// this activation, if any.
    /// Returns whether a waiter was resolved.
    pub fn deactivate(&self, name: &str) -> Result<bool, ModalError> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(name)
            .ok_or_else(|| ModalError::NotFound(format!("modal '{}'", name)))?;
        record.data = None;
        let resolved = match record.pending.take() {
            Some(mut fulfiller) => {
                let value = record.return_value.clone().filter(|_| record.returned);
                fulfiller.fulfil(value)
            }
            None => false,
        };
        if resolved {
            debug!(name, "resolved modal outcome");
        }
        Ok(resolved)
    }

    /// Modals holding activation state (data or an outstanding signal)
    pub fn activated(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .records
            .lock()
            .values()
            .filter(|r| r.pending.is_some() || r.data.is_some())
            .map(|r| r.name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn set_options(&self, name: &str, options: ModalOptions) -> Result<(), ModalError> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(name)
            .ok_or_else(|| ModalError::NotFound(format!("modal '{}'", name)))?;
        if record.options.is_some() {
            return Err(ModalError::AlreadySettled(name.to_string()));
        }
        record.options = Some(options);
        Ok(())
    }

    pub fn unset_options(&self, name: &str) -> Result<Option<ModalOptions>, ModalError> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(name)
            .ok_or_else(|| ModalError::NotFound(format!("modal '{}'", name)))?;
        Ok(record.options.take())
    }

    pub fn lock(&self, name: &str) -> Result<(), ModalError> {
        self.set_locked(name, true)
    }

    pub fn unlock(&self, name: &str) -> Result<(), ModalError> {
        self.set_locked(name, false)
    }

    fn set_locked(&self, name: &str, locked: bool) -> Result<(), ModalError> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(name)
            .ok_or_else(|| ModalError::NotFound(format!("modal '{}'", name)))?;
        record.locked = locked;
        Ok(())
    }

    pub fn set_return_value(&self, name: &str, value: Value) -> Result<(), ModalError> {
        let mut records = self.records.lock();
        let record = records
            .get_mut(name)
            .ok_or_else(|| ModalError::NotFound(format!("modal '{}'", name)))?;
        record.return_value = Some(value);
        record.returned = true;
        Ok(())
    }
}
