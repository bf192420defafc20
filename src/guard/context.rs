//! Per-navigation flags shared by the before guards and the after hook.

use crate::history::{Direction, NavigationClassification};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationContext {
    pub direction: Direction,
    pub is_init_navigation: bool,
    pub is_refresh: bool,
    pub has_prev_step: bool,
    /// Navigation issued by `open_modal`
    pub open_by_open_modal: bool,
    /// Navigation issued by `close_modal`
    pub close_by_close_modal: bool,
    /// Modal `open_modal` was called for
    pub opening_modal: Option<String>,
    /// Init navigation that lands inside a modal allowed to be entered directly
    pub direct: bool,
}

impl Default for NavigationContext {
    fn default() -> Self {
        Self {
            direction: Direction::Unknown,
            is_init_navigation: false,
            is_refresh: false,
            has_prev_step: false,
            open_by_open_modal: false,
            close_by_close_modal: false,
            opening_modal: None,
            direct: false,
        }
    }
}

impl NavigationContext {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Shared slot holding the context of the navigation in flight.
#[derive(Debug, Default)]
pub struct ContextCell {
    inner: Mutex<NavigationContext>,
}

impl ContextCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> NavigationContext {
        self.inner.lock().clone()
    }

    pub fn update(&self, apply: impl FnOnce(&mut NavigationContext)) {
        apply(&mut self.inner.lock());
    }

    pub fn classify(&self, classification: NavigationClassification) {
        self.update(|ctx| {
            ctx.direction = classification.direction;
            ctx.is_init_navigation = classification.is_init_navigation;
            ctx.is_refresh = classification.is_refresh;
            ctx.has_prev_step = classification.has_prev_step;
        });
    }

    pub fn mark_open(&self, name: &str) {
        self.update(|ctx| {
            ctx.open_by_open_modal = true;
            ctx.opening_modal = Some(name.to_string());
        });
    }

    pub fn mark_close(&self) {
        self.update(|ctx| ctx.close_by_close_modal = true);
    }

    pub fn reset(&self) {
        *self.inner.lock() = NavigationContext::default();
    }
}
