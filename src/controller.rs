//! Modal Controller
//!
//! The public face of the engine. A [`ModalRouteBuilder`] wires the session
//! history, the session storage and the route tree into one
//! [`ModalController`]; every controller owns its own registry, tags and
//! router, so several can coexist in one process.

use crate::config::ModalRouteConfig;
use crate::error::ModalError;
use crate::guard::GuardPipeline;
use crate::history::{HistoryAdapter, MemoryHistory, SessionHistory};
use crate::registry::{ModalMeta, ModalOptions, ModalOutcome, ModalRegistry};
use crate::relation::RelationGraph;
use crate::router::{NavigationFailure, ResolvedRoute, RouteTable, Router};
use crate::routes::RouteRecord;
use crate::storage::{MemoryStorage, SessionStorage};
use crate::strategy::{
    GlobalStrategy, ModalData, OpenOptions, PathStrategy, QueryStrategy, Strategies,
};
use crate::time_machine::TimeMachine;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Active state of the current route, published after every settled navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalSnapshot {
    pub route: Option<String>,
    pub full_path: String,
    /// Active modals, path and global outermost first, then query modals
    pub active: Vec<String>,
    /// Active modals that are not locked
    pub visible: Vec<String>,
}

/// What an opened modal handed back when it closed
#[derive(Debug, Clone, PartialEq)]
pub enum ModalResult {
    Single(Option<Value>),
    Many(BTreeMap<String, Option<Value>>),
}

/// Pending result of [`ModalController::open_modal`].
#[derive(Debug)]
pub struct ModalHandle {
    name: String,
    /// Deepest modal of the chain; a plain route below a modal resolves to it
    target: String,
    outcomes: Vec<(String, ModalOutcome)>,
    many: bool,
}

impl ModalHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Modals this open activated, root first
    pub fn activated(&self) -> Vec<&str> {
        self.outcomes.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Resolves once every activated modal closed.
    ///
    /// Per-modal data yields a map keyed by modal name; otherwise the value of
    /// the deepest modal of the opened chain.
    pub async fn wait(self) -> ModalResult {
        let (names, outcomes): (Vec<String>, Vec<ModalOutcome>) =
            self.outcomes.into_iter().unzip();
        let values = join_all(outcomes.into_iter().map(|outcome| outcome.wait())).await;
        let mut results: BTreeMap<String, Option<Value>> = names
            .into_iter()
            .zip(values.into_iter().map(Option::flatten))
            .collect();
        if self.many {
            ModalResult::Many(results)
        } else {
            ModalResult::Single(results.remove(&self.target).flatten())
        }
    }
}

/// Where `setup_modal` is called from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupScope {
    /// Outside any matched route view
    Root,
    /// Inside the view rendered for this route
    View(String),
}

pub struct ModalRouteBuilder {
    config: ModalRouteConfig,
    routes: Vec<RouteRecord>,
    global_routes: Vec<RouteRecord>,
    query_modals: Vec<String>,
    history: Option<Arc<dyn SessionHistory>>,
    storage: Option<Arc<dyn SessionStorage>>,
}

impl Default for ModalRouteBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModalRouteBuilder {
    pub fn new() -> Self {
        Self {
            config: ModalRouteConfig::default(),
            routes: Vec::new(),
            global_routes: Vec::new(),
            query_modals: Vec::new(),
            history: None,
            storage: None,
        }
    }

    pub fn config(mut self, config: ModalRouteConfig) -> Self {
        self.config = config;
        self
    }

    pub fn route(mut self, route: RouteRecord) -> Self {
        self.routes.push(route);
        self
    }

    pub fn routes(mut self, routes: impl IntoIterator<Item = RouteRecord>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Register a global modal; its path is relative to the global segment
    pub fn global_modal(mut self, mut route: RouteRecord) -> Self {
        route.meta.modal = true;
        self.global_routes.push(route);
        self
    }

    pub fn query_modal(mut self, name: impl Into<String>) -> Self {
        self.query_modals.push(name.into());
        self
    }

    pub fn history(mut self, history: Arc<dyn SessionHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Validate the route configuration and assemble the controller.
    ///
    /// Configuration mistakes (`InvalidRouteConfiguration`, `AlreadyRegistered`)
    /// surface here. The controller still has to be started.
    pub fn build(self) -> Result<Arc<ModalController>, ModalError> {
        let config = self.config;
        config.validate()?;

        let relations = RelationGraph::build(&self.routes, &self.global_routes, &self.query_modals)?;
        let path_modals = collect_modals(&self.routes, config.default_direct);
        let global_modals = collect_modals(&self.global_routes, config.default_direct);
        // query modals are stripped from every load
        let query_modals = self
            .query_modals
            .iter()
            .map(|name| (name.clone(), ModalMeta { direct: false }))
            .collect();

        let history = self
            .history
            .unwrap_or_else(|| Arc::new(MemoryHistory::new("/")) as Arc<dyn SessionHistory>);
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()) as Arc<dyn SessionStorage>);
        let adapter = HistoryAdapter::shared(history);
        let time_machine = TimeMachine::load(adapter.clone(), storage, &config)?;
        let router = Router::new(adapter, RouteTable::new(self.routes)?);

        let strategies = Arc::new(Strategies {
            path: PathStrategy::new(path_modals),
            query: QueryStrategy::new(config.query_prefix.clone(), query_modals),
            global: GlobalStrategy::new(
                config.global_segment.clone(),
                self.global_routes,
                global_modals,
            ),
        });
        let registry = Arc::new(ModalRegistry::new());
        strategies.register(&router, &registry)?;

        let pipeline = Arc::new(GuardPipeline::new(
            registry.clone(),
            Arc::new(relations),
            time_machine,
            strategies,
        ));
        router.add_guard(pipeline.clone());
        router.add_after_hook(pipeline.clone());

        info!(modals = registry.names().len(), "modal controller assembled");
        Ok(Arc::new(ModalController {
            router,
            pipeline,
            config,
        }))
    }
}

fn collect_modals(records: &[RouteRecord], default_direct: bool) -> Vec<(String, ModalMeta)> {
    let mut modals = Vec::new();
    for record in records {
        if let (true, Some(name)) = (record.is_modal(), record.name()) {
            let direct = record.meta.direct.unwrap_or(default_direct);
            modals.push((name.to_string(), ModalMeta { direct }));
        }
        modals.extend(collect_modals(&record.children, default_direct));
    }
    modals
}

pub struct ModalController {
    router: Arc<Router>,
    pipeline: Arc<GuardPipeline>,
    config: ModalRouteConfig,
}

impl ModalController {
    pub fn builder() -> ModalRouteBuilder {
        ModalRouteBuilder::new()
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn config(&self) -> &ModalRouteConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Arc<GuardPipeline> {
        &self.pipeline
    }

    pub fn time_machine(&self) -> &Arc<TimeMachine> {
        self.pipeline.time_machine()
    }

    /// Run the initial navigation for whatever the session history displays.
    pub async fn start(&self) -> Result<Option<NavigationFailure>, ModalError> {
        self.router.start().await
    }

    /// Open `name` together with every inactive modal of its chain.
    ///
    /// The navigation may still be denied or deduplicated by the router; that
    /// is not an error, the returned handle then resolves with no value.
    pub async fn open_modal(
        &self,
        name: &str,
        options: OpenOptions,
    ) -> Result<ModalHandle, ModalError> {
        let relation = self.pipeline.relations().get(name)?.clone();
        let current = self.router.current();
        let needed = self
            .pipeline
            .relations()
            .needs_activation(name, |modal| self.pipeline.is_active(&current, modal))?;
        if needed.is_empty() {
            return Err(ModalError::AlreadyOpen(name.to_string()));
        }
        self.pipeline
            .strategies()
            .query
            .check_reserved(&options.query)?;

        let target = relation.chain.last().cloned().unwrap_or_else(|| name.to_string());
        let (mut data, many): (HashMap<String, Value>, bool) = match &options.data {
            Some(ModalData::PerModal(entries)) => (entries.iter().cloned().collect(), true),
            Some(ModalData::Single(value)) => (HashMap::from([(target.clone(), value.clone())]), false),
            None => (HashMap::new(), false),
        };

        let registry = self.pipeline.registry();
        let mut outcomes = Vec::with_capacity(needed.len());
        for modal in &needed {
            match registry.activate(modal, data.remove(modal)) {
                Ok(outcome) => outcomes.push((modal.clone(), outcome)),
                Err(err) => {
                    self.rollback(&needed);
                    return Err(err);
                }
            }
        }
        if !data.is_empty() {
            debug!(ignored = ?data.keys().collect::<Vec<_>>(), "data for modals outside the opened chain");
        }

        info!(modal = name, activating = ?needed, "opening modal");
        self.pipeline.context().mark_open(name);
        let opened = self
            .pipeline
            .strategies()
            .get(relation.kind)
            .open(&self.router, name, &options)
            .await;
        self.pipeline.context().reset();
        match opened {
            Ok(None) => {}
            Ok(Some(failure)) => debug!(modal = name, %failure, "open navigation did not commit"),
            Err(err) => {
                self.rollback(&needed);
                return Err(err);
            }
        }

        Ok(ModalHandle {
            name: name.to_string(),
            target,
            outcomes,
            many,
        })
    }

    fn rollback(&self, modals: &[String]) {
        for modal in modals {
            if let Err(err) = self.pipeline.registry().deactivate(modal) {
                warn!(modal = %modal, error = %err, "failed to roll back activation");
            }
        }
        self.pipeline.publish(&self.router);
    }

    /// Close `name` by going back to its base entry.
    ///
    /// A modal that was entered without a recorded base gets its history
    /// padded first so that there is a base to go back to.
    pub async fn close_modal(&self, name: &str) -> Result<(), ModalError> {
        self.pipeline.registry().get(name)?;
        let current = self.router.current();
        if !self.pipeline.is_active(&current, name) {
            return Err(ModalError::NotOpen(name.to_string()));
        }

        info!(modal = name, "closing modal");
        self.pipeline.context().mark_close();
        let rewound = self.rewind_to_base(name, &current).await;
        self.pipeline.context().reset();
        self.pipeline.registry().deactivate(name)?;
        self.pipeline.publish(&self.router);
        rewound
    }

    /// Record `value` as the return value, then close.
    pub async fn close_modal_with(&self, name: &str, value: Value) -> Result<(), ModalError> {
        self.set_return_value(name, value)?;
        self.close_modal(name).await
    }

    async fn rewind_to_base(&self, name: &str, current: &ResolvedRoute) -> Result<(), ModalError> {
        let time_machine = self.pipeline.time_machine();
        if time_machine.position_by_tag(name).is_none() {
            self.pipeline
                .pad_history_when_init_modal(&self.router, name, current, current)
                .await?;
        }
        time_machine.go_to_tag(name, true).await?;
        Ok(())
    }

    /// Settle presentation options for the modal a view is about to show.
    ///
    /// From `scope`, the target is the single inactive modal of `name`'s chain
    /// below the scope, or `name` itself when the whole chain is open. Returns
    /// the modal the options were applied to.
    pub fn setup_modal(
        &self,
        name: &str,
        options: ModalOptions,
        scope: SetupScope,
    ) -> Result<String, ModalError> {
        let relation = self.pipeline.relations().get(name)?;
        let current = self.router.current();
        let start = match &scope {
            SetupScope::Root => 0,
            SetupScope::View(view) => relation
                .chain
                .iter()
                .position(|modal| modal == view)
                .map(|index| index + 1)
                .unwrap_or(0),
        };
        let below = &relation.chain[start..];
        let mut candidates = self
            .pipeline
            .relations()
            .needs_activation(name, |modal| self.pipeline.is_active(&current, modal))?;
        candidates.retain(|modal| below.contains(modal));
        if candidates.len() > 1 {
            return Err(ModalError::MultipleModalsAmbiguous {
                name: name.to_string(),
                candidates,
            });
        }
        let target = match candidates.into_iter().next() {
            Some(only) => only,
            None if self.pipeline.registry().contains(name) => name.to_string(),
            None => relation
                .chain
                .last()
                .cloned()
                .ok_or_else(|| ModalError::NotFound(format!("modal '{}'", name)))?,
        };

        let registry = self.pipeline.registry();
        let manual = options.manual;
        registry.set_options(&target, options)?;
        if manual {
            registry.lock(&target)?;
        }
        debug!(modal = %target, requested = name, manual, "modal options settled");
        self.pipeline.publish(&self.router);
        Ok(target)
    }

    /// Undo `setup_modal`: clear the options and the manual lock.
    pub fn teardown_modal(&self, name: &str) -> Result<Option<ModalOptions>, ModalError> {
        let registry = self.pipeline.registry();
        let options = registry.unset_options(name)?;
        registry.unlock(name)?;
        self.pipeline.publish(&self.router);
        Ok(options)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.pipeline.is_active(&self.router.current(), name)
    }

    /// Active and not held back by a manual lock
    pub fn is_visible(&self, name: &str) -> bool {
        self.is_active(name)
            && self
                .pipeline
                .registry()
                .get_unsafe(name)
                .map(|info| !info.locked)
                .unwrap_or(false)
    }

    pub fn data(&self, name: &str) -> Option<Value> {
        self.pipeline.registry().get_unsafe(name).and_then(|info| info.data)
    }

    pub fn return_value(&self, name: &str) -> Option<Value> {
        self.pipeline
            .registry()
            .get_unsafe(name)
            .and_then(|info| info.return_value)
    }

    pub fn set_return_value(&self, name: &str, value: Value) -> Result<(), ModalError> {
        self.pipeline.registry().set_return_value(name, value)
    }

    pub fn lock(&self, name: &str) -> Result<(), ModalError> {
        self.pipeline.registry().lock(name)?;
        self.pipeline.publish(&self.router);
        Ok(())
    }

    pub fn unlock(&self, name: &str) -> Result<(), ModalError> {
        self.pipeline.registry().unlock(name)?;
        self.pipeline.publish(&self.router);
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<ModalSnapshot> {
        self.pipeline.subscribe()
    }

    pub fn snapshot(&self) -> ModalSnapshot {
        self.pipeline.snapshot(&self.router.current())
    }

    /// Called when the page goes away. If a navigation is still settling, the
    /// current position is recorded so the next load drops the tags above it.
    pub fn handle_unload(&self) -> Result<bool, ModalError> {
        if self.pipeline.context().get().is_idle() {
            return Ok(false);
        }
        let position = self.router.adapter().native_position();
        warn!(position, "page unloaded while a navigation was settling");
        self.pipeline.time_machine().mark_unload(position)?;
        Ok(true)
    }
}
