//! Query modals: a reserved-prefix key in the query string marks the modal open.
//!
//! Keys keep the order they were added in, so the query string doubles as the
//! stack of open query modals.

use super::{register_all, OpenOptions, RouteStrategy};
use crate::error::ModalError;
use crate::location::{Location, Query};
use crate::registry::{ModalMeta, ModalRegistry};
use crate::router::{NavigationFailure, ResolvedRoute, Router};
use crate::routes::ModalKind;
use async_trait::async_trait;
use tracing::debug;

pub struct QueryStrategy {
    prefix: String,
    modals: Vec<(String, ModalMeta)>,
}

impl QueryStrategy {
    pub fn new(prefix: impl Into<String>, modals: Vec<(String, ModalMeta)>) -> Self {
        Self {
            prefix: prefix.into(),
            modals,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Query key that marks `name` as open
    pub fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Registered query modal behind `key`, if any
    pub fn modal_for_key<'a>(&'a self, key: &str) -> Option<&'a str> {
        let name = key.strip_prefix(&self.prefix)?;
        self.modals
            .iter()
            .find(|(modal, _)| modal == name)
            .map(|(modal, _)| modal.as_str())
    }

    /// Open query modals in `query`, in the order they were opened
    pub fn active_in<'a>(&'a self, query: &Query) -> Vec<&'a str> {
        query.keys().filter_map(|key| self.modal_for_key(key)).collect()
    }

    /// Fail when a caller-supplied key collides with the reserved prefix
    pub fn check_reserved(&self, query: &Query) -> Result<(), ModalError> {
        match query.keys().find(|key| key.starts_with(&self.prefix)) {
            Some(key) => Err(ModalError::ReservedQueryKey {
                key: key.to_string(),
                prefix: self.prefix.clone(),
            }),
            None => Ok(()),
        }
    }

    /// `query` without any query modal key
    pub fn strip(&self, query: &Query) -> Query {
        let mut stripped = query.clone();
        stripped.retain(|key, _| self.modal_for_key(key).is_none());
        stripped
    }
}

#[async_trait]
impl RouteStrategy for QueryStrategy {
    fn kind(&self) -> ModalKind {
        ModalKind::Query
    }

    fn register(&self, _router: &Router, registry: &ModalRegistry) -> Result<(), ModalError> {
        register_all(registry, ModalKind::Query, &self.modals)
    }

    async fn open(
        &self,
        router: &Router,
        name: &str,
        options: &OpenOptions,
    ) -> Result<Option<NavigationFailure>, ModalError> {
        self.check_reserved(&options.query)?;
        let current = router.current();
        let mut query = current.location.query.clone();
        for (key, value) in options.query.iter() {
            query.insert(key, value);
        }
        query.insert(self.key(name), "");
        let hash = if options.hash.is_empty() {
            current.location.hash.clone()
        } else {
            options.hash.clone()
        };
        let target = Location::new(current.location.path.clone())
            .with_query(query)
            .with_hash(hash);
        debug!(name, target = %target, "opening query modal");
        router.push(target).await
    }

    /// The route's location with `name` and every query modal opened after it removed.
    fn find_base(
        &self,
        _router: &Router,
        name: &str,
        route: &ResolvedRoute,
    ) -> Result<Option<Location>, ModalError> {
        let key = self.key(name);
        let mut query = route.location.query.clone();
        if let Some(cut) = query.position(&key) {
            let mut index = 0;
            query.retain(|k, _| {
                let keep = index < cut || self.modal_for_key(k).is_none();
                index += 1;
                keep
            });
        }
        Ok(Some(route.location.clone().with_query(query)))
    }

    fn is_active(&self, route: &ResolvedRoute, name: &str) -> bool {
        route.location.query.contains(&self.key(name))
    }
}
