//! Host Router
//!
//! Named-route navigation over a [`HistoryAdapter`]. Before guards may proceed,
//! deny or redirect a navigation; after hooks always run once the navigation
//! settles, with the failure (if any) passed as a value. Cancelled and
//! duplicated navigations are reported as [`NavigationFailure`], never as errors.
//!
//! The router follows the native stack: traversals that asked for side effects
//! arrive through [`PopListener`], every other stack change is mirrored into the
//! current route through [`HistoryObserver`].

pub mod matcher;

pub use matcher::{MatchedRecord, NavigationTarget, Params, ResolvedRoute, RouteTable};

use crate::error::ModalError;
use crate::history::{HistoryAdapter, HistoryChange, HistoryEvent, HistoryObserver, PopListener};
use crate::location::Location;
use crate::routes::RouteRecord;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace, warn};

const MAX_REDIRECTS: usize = 8;

/// How a navigation writes to the session history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    Push,
    Replace,
    /// The native stack already moved by `delta`
    Pop { delta: i64 },
}

/// Why a navigation did not commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationFailure {
    /// A guard denied it, or redirects looped
    Aborted,
    /// Target equals the current location
    Duplicated,
}

impl fmt::Display for NavigationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationFailure::Aborted => f.write_str("navigation aborted"),
            NavigationFailure::Duplicated => f.write_str("navigation duplicated"),
        }
    }
}

/// Verdict of a before guard
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    Proceed,
    Deny,
    Redirect(NavigationTarget),
}

#[async_trait]
pub trait NavigationGuard: Send + Sync {
    async fn before_each(
        &self,
        router: &Router,
        to: &ResolvedRoute,
        from: &ResolvedRoute,
    ) -> Result<GuardOutcome, ModalError>;
}

#[async_trait]
pub trait AfterNavigation: Send + Sync {
    async fn after_each(
        &self,
        router: &Router,
        to: &ResolvedRoute,
        from: &ResolvedRoute,
        failure: Option<NavigationFailure>,
    ) -> Result<(), ModalError>;
}

pub struct Router {
    adapter: Arc<HistoryAdapter>,
    table: RwLock<RouteTable>,
    current: RwLock<ResolvedRoute>,
    guards: RwLock<Vec<Arc<dyn NavigationGuard>>>,
    after_hooks: RwLock<Vec<Arc<dyn AfterNavigation>>>,
}

impl Router {
    /// Create a router and subscribe it to the adapter's native events.
    pub fn new(adapter: Arc<HistoryAdapter>, table: RouteTable) -> Arc<Self> {
        let router = Arc::new(Self {
            adapter: adapter.clone(),
            table: RwLock::new(table),
            current: RwLock::new(ResolvedRoute::start()),
            guards: RwLock::new(Vec::new()),
            after_hooks: RwLock::new(Vec::new()),
        });
        let listener: Weak<dyn PopListener> = Arc::downgrade(&router) as Weak<dyn PopListener>;
        adapter.set_pop_listener(listener);
        let observer: Weak<dyn HistoryObserver> = Arc::downgrade(&router) as Weak<dyn HistoryObserver>;
        adapter.add_observer(observer);
        router
    }

    pub fn adapter(&self) -> &Arc<HistoryAdapter> {
        &self.adapter
    }

    /// The settled route; the start sentinel until [`Router::start`] ran
    pub fn current(&self) -> ResolvedRoute {
        self.current.read().clone()
    }

    pub fn resolve(&self, target: &NavigationTarget) -> Result<ResolvedRoute, ModalError> {
        self.table.read().resolve(target)
    }

    pub fn has_route(&self, name: &str) -> bool {
        self.table.read().has_route(name)
    }

    pub fn add_route(&self, parent: Option<&str>, record: RouteRecord) -> Result<(), ModalError> {
        self.table.write().add_route(parent, record)
    }

    pub fn remove_route(&self, name: &str) -> bool {
        self.table.write().remove_route(name)
    }

    pub fn add_guard(&self, guard: Arc<dyn NavigationGuard>) {
        self.guards.write().push(guard);
    }

    pub fn add_after_hook(&self, hook: Arc<dyn AfterNavigation>) {
        self.after_hooks.write().push(hook);
    }

    /// Initial navigation to whatever the native stack displays.
    pub async fn start(&self) -> Result<Option<NavigationFailure>, ModalError> {
        let location = Location::parse(&self.adapter.location());
        debug!(location = %location, "router start");
        self.navigate(location.into(), NavigationMode::Replace).await
    }

    pub async fn push(
        &self,
        target: impl Into<NavigationTarget>,
    ) -> Result<Option<NavigationFailure>, ModalError> {
        self.navigate(target.into(), NavigationMode::Push).await
    }

    pub async fn replace(
        &self,
        target: impl Into<NavigationTarget>,
    ) -> Result<Option<NavigationFailure>, ModalError> {
        self.navigate(target.into(), NavigationMode::Replace).await
    }

    /// Traverse the native stack; the resulting navigation runs before this resolves.
    pub async fn go(&self, delta: i64) -> Result<(), ModalError> {
        self.adapter.go_to_delta(delta, true).await?;
        Ok(())
    }

    pub async fn back(&self) -> Result<(), ModalError> {
        self.go(-1).await
    }

    pub async fn forward(&self) -> Result<(), ModalError> {
        self.go(1).await
    }

    async fn navigate(
        &self,
        target: NavigationTarget,
        mode: NavigationMode,
    ) -> Result<Option<NavigationFailure>, ModalError> {
        let from = self.current();
        self.navigate_from(target, mode, from, 0).await
    }

    fn navigate_from<'a>(
        &'a self,
        target: NavigationTarget,
        mode: NavigationMode,
        from: ResolvedRoute,
        redirects: usize,
    ) -> BoxFuture<'a, Result<Option<NavigationFailure>, ModalError>> {
        async move {
            let to = self.resolve(&target)?;
            trace!(to = %to.full_path(), from = %from.full_path(), ?mode, "navigation");

            if !matches!(mode, NavigationMode::Pop { .. })
                && !from.is_start()
                && to.full_path() == from.full_path()
            {
                let failure = NavigationFailure::Duplicated;
                self.run_after_hooks(&to, &from, Some(failure)).await?;
                return Ok(Some(failure));
            }

            let guards: Vec<Arc<dyn NavigationGuard>> = self.guards.read().clone();
            for guard in guards {
                match guard.before_each(self, &to, &from).await? {
                    GuardOutcome::Proceed => {}
                    GuardOutcome::Deny => {
                        warn!(to = %to.full_path(), from = %from.full_path(), "navigation denied");
                        return self.abort(&to, &from, mode).await;
                    }
                    GuardOutcome::Redirect(next) => {
                        if redirects >= MAX_REDIRECTS {
                            warn!(to = %to.full_path(), "too many redirects");
                            return self.abort(&to, &from, mode).await;
                        }
                        let next_mode = match mode {
                            NavigationMode::Pop { .. } => NavigationMode::Replace,
                            other => other,
                        };
                        debug!(to = %to.full_path(), ?next, "navigation redirected");
                        return self
                            .navigate_from(next, next_mode, from, redirects + 1)
                            .await;
                    }
                }
            }

            match mode {
                NavigationMode::Push => self.adapter.push(&to.full_path(), Value::Null),
                NavigationMode::Replace => self.adapter.replace(&to.full_path(), Value::Null),
                NavigationMode::Pop { .. } => {}
            }
            *self.current.write() = to.clone();
            self.adapter.sync_position();

            self.run_after_hooks(&to, &from, None).await?;
            Ok(None)
        }
        .boxed()
    }

    async fn abort(
        &self,
        to: &ResolvedRoute,
        from: &ResolvedRoute,
        mode: NavigationMode,
    ) -> Result<Option<NavigationFailure>, ModalError> {
        if let NavigationMode::Pop { delta } = mode {
            // put the native stack back where the router still is
            self.adapter.go_to_delta(-delta, false).await?;
            self.adapter.sync_position();
        }
        let failure = NavigationFailure::Aborted;
        self.run_after_hooks(to, from, Some(failure)).await?;
        Ok(Some(failure))
    }

    async fn run_after_hooks(
        &self,
        to: &ResolvedRoute,
        from: &ResolvedRoute,
        failure: Option<NavigationFailure>,
    ) -> Result<(), ModalError> {
        let hooks: Vec<Arc<dyn AfterNavigation>> = self.after_hooks.read().clone();
        for hook in hooks {
            hook.after_each(self, to, from, failure).await?;
        }
        Ok(())
    }

    fn follow_native(&self) {
        let location = Location::parse(&self.adapter.location());
        match self.resolve(&location.into()) {
            Ok(route) => *self.current.write() = route,
            Err(err) => warn!(error = %err, "failed to resolve native location"),
        }
    }
}

#[async_trait]
impl PopListener for Router {
    async fn on_pop(&self, event: &HistoryEvent) -> Result<(), ModalError> {
        let location = Location::parse(&event.state.current);
        let mode = NavigationMode::Pop { delta: event.delta };
        self.navigate(location.into(), mode).await?;
        Ok(())
    }
}

impl HistoryObserver for Router {
    fn on_change(&self, change: &HistoryChange) {
        if self.current.read().is_start() {
            return;
        }
        match change {
            HistoryChange::Push(_) | HistoryChange::Replace(_) => self.follow_native(),
            HistoryChange::Traverse { notify: false, .. } => self.follow_native(),
            HistoryChange::Traverse { notify: true, .. } => {}
        }
    }
}
