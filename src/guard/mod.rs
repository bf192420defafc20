//! Navigation Guard Pipeline
//!
//! One [`GuardPipeline`] per controller is registered with the router both as
//! its before guard and as its only after hook. The before side classifies the
//! navigation and enforces who may open a modal; the after side repairs the
//! history stack once the navigation committed. Close reconciliation and open
//! padding run in that order inside a single hook, and the context is reset
//! only after both settled.

pub mod after;
pub mod before;
pub mod context;

pub use context::{ContextCell, NavigationContext};

use crate::controller::ModalSnapshot;
use crate::error::ModalError;
use crate::location::Location;
use crate::registry::ModalRegistry;
use crate::relation::RelationGraph;
use crate::router::{AfterNavigation, GuardOutcome, NavigationFailure, NavigationGuard, ResolvedRoute, Router};
use crate::routes::ModalKind;
use crate::strategy::Strategies;
use crate::time_machine::TimeMachine;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

pub struct GuardPipeline {
    registry: Arc<ModalRegistry>,
    relations: Arc<RelationGraph>,
    time_machine: Arc<TimeMachine>,
    strategies: Arc<Strategies>,
    context: ContextCell,
    snapshots: watch::Sender<ModalSnapshot>,
}

impl GuardPipeline {
    pub fn new(
        registry: Arc<ModalRegistry>,
        relations: Arc<RelationGraph>,
        time_machine: Arc<TimeMachine>,
        strategies: Arc<Strategies>,
    ) -> Self {
        let (snapshots, _) = watch::channel(ModalSnapshot::default());
        Self {
            registry,
            relations,
            time_machine,
            strategies,
            context: ContextCell::new(),
            snapshots,
        }
    }

    pub fn registry(&self) -> &Arc<ModalRegistry> {
        &self.registry
    }

    pub fn relations(&self) -> &Arc<RelationGraph> {
        &self.relations
    }

    pub fn time_machine(&self) -> &Arc<TimeMachine> {
        &self.time_machine
    }

    pub fn strategies(&self) -> &Arc<Strategies> {
        &self.strategies
    }

    pub fn context(&self) -> &ContextCell {
        &self.context
    }

    pub fn subscribe(&self) -> watch::Receiver<ModalSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn is_active(&self, route: &ResolvedRoute, name: &str) -> bool {
        match self.registry.kind_of(name) {
            Some(kind) => self.strategies.get(kind).is_active(route, name),
            None => false,
        }
    }

    /// Active modals of `route`: path and global modals outermost first, then
    /// query modals in the order they were opened.
    pub fn active_modals(&self, route: &ResolvedRoute) -> Vec<String> {
        let mut active: Vec<String> = route
            .modal_names()
            .into_iter()
            .filter(|name| self.registry.contains(name))
            .map(str::to_string)
            .collect();
        active.extend(
            self.strategies
                .query
                .active_in(route.query())
                .into_iter()
                .map(str::to_string),
        );
        active
    }

    /// Modals active in `to` that are not active in `from`
    pub fn newly_active(&self, to: &ResolvedRoute, from: &ResolvedRoute) -> Vec<String> {
        let before = self.active_modals(from);
        self.active_modals(to)
            .into_iter()
            .filter(|name| !before.contains(name))
            .collect()
    }

    pub fn find_base(
        &self,
        router: &Router,
        name: &str,
        route: &ResolvedRoute,
    ) -> Result<Option<Location>, ModalError> {
        let kind = self
            .registry
            .kind_of(name)
            .ok_or_else(|| ModalError::NotFound(format!("modal '{}'", name)))?;
        self.strategies.get(kind).find_base(router, name, route)
    }

    pub(crate) fn kind_of(&self, name: &str) -> Result<ModalKind, ModalError> {
        Ok(self.relations.get(name)?.kind)
    }

    pub fn snapshot(&self, route: &ResolvedRoute) -> ModalSnapshot {
        let active = self.active_modals(route);
        let visible = active
            .iter()
            .filter(|name| {
                self.registry
                    .get_unsafe(name)
                    .map(|info| !info.locked)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        ModalSnapshot {
            route: route.name.clone(),
            full_path: route.full_path(),
            active,
            visible,
        }
    }

    /// Publish the active state of the router's current route; receivers are
    /// only woken when it changed.
    pub fn publish(&self, router: &Router) {
        let snapshot = self.snapshot(&router.current());
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

#[async_trait]
impl NavigationGuard for GuardPipeline {
    async fn before_each(
        &self,
        router: &Router,
        to: &ResolvedRoute,
        from: &ResolvedRoute,
    ) -> Result<GuardOutcome, ModalError> {
        let outcome = self.run_before(router, to, from).await;
        if outcome.is_err() {
            self.context.reset();
        }
        outcome
    }
}

#[async_trait]
impl AfterNavigation for GuardPipeline {
    async fn after_each(
        &self,
        router: &Router,
        to: &ResolvedRoute,
        from: &ResolvedRoute,
        failure: Option<NavigationFailure>,
    ) -> Result<(), ModalError> {
        self.run_after(router, to, from, failure).await
    }
}
