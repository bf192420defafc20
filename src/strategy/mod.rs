//! Route-Kind Strategies
//!
//! Each modal kind knows how to express "open modal X" as a navigation, how to
//! tell from a resolved route whether X is active, and where X returns to when
//! it closes.

pub mod global;
pub mod path;
pub mod query;

pub use global::{GlobalStrategy, GLOBAL_ROOT_NAME};
pub use path::PathStrategy;
pub use query::QueryStrategy;

use crate::error::ModalError;
use crate::location::{Location, Query};
use crate::registry::{ModalMeta, ModalRegistry};
use crate::router::{NavigationFailure, Params, ResolvedRoute, Router};
use crate::routes::ModalKind;
use async_trait::async_trait;
use serde_json::Value;

/// Payload handed to the modals an open activates
#[derive(Debug, Clone, PartialEq)]
pub enum ModalData {
    /// Goes to the modal being opened (the deepest of its chain)
    Single(Value),
    /// Explicit payload per modal name
    PerModal(Vec<(String, Value)>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenOptions {
    pub query: Query,
    pub hash: String,
    pub params: Params,
    pub data: Option<ModalData>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key, value);
        self
    }

    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(ModalData::Single(data));
        self
    }

    pub fn data_for(mut self, name: impl Into<String>, data: Value) -> Self {
        let entry = (name.into(), data);
        match &mut self.data {
            Some(ModalData::PerModal(entries)) => entries.push(entry),
            _ => self.data = Some(ModalData::PerModal(vec![entry])),
        }
        self
    }
}

#[async_trait]
pub trait RouteStrategy: Send + Sync {
    fn kind(&self) -> ModalKind;

    /// Register this strategy's modals with the registry
    fn register(&self, router: &Router, registry: &ModalRegistry) -> Result<(), ModalError>;

    /// Issue the navigation that makes `name` active
    async fn open(
        &self,
        router: &Router,
        name: &str,
        options: &OpenOptions,
    ) -> Result<Option<NavigationFailure>, ModalError>;

    /// Location `name` returns to when closed from `route`; `None` at the top
    fn find_base(
        &self,
        router: &Router,
        name: &str,
        route: &ResolvedRoute,
    ) -> Result<Option<Location>, ModalError>;

    fn is_active(&self, route: &ResolvedRoute, name: &str) -> bool;
}

/// The three strategies of one controller.
pub struct Strategies {
    pub path: PathStrategy,
    pub query: QueryStrategy,
    pub global: GlobalStrategy,
}

impl Strategies {
    pub fn get(&self, kind: ModalKind) -> &dyn RouteStrategy {
        match kind {
            ModalKind::Path => &self.path,
            ModalKind::Query => &self.query,
            ModalKind::Global => &self.global,
        }
    }

    pub fn register(&self, router: &Router, registry: &ModalRegistry) -> Result<(), ModalError> {
        for kind in [ModalKind::Path, ModalKind::Global, ModalKind::Query] {
            self.get(kind).register(router, registry)?;
        }
        Ok(())
    }
}

pub(crate) fn register_all(
    registry: &ModalRegistry,
    kind: ModalKind,
    modals: &[(String, ModalMeta)],
) -> Result<(), ModalError> {
    for (name, meta) in modals {
        registry.register(name, kind, *meta)?;
    }
    Ok(())
}

/// Current params overlaid with the caller's
pub(crate) fn merged_params(route: &ResolvedRoute, extra: &Params) -> Params {
    let mut params = route.params.clone();
    params.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    params
}
