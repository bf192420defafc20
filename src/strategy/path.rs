//! Path modals: nested route segments opened by name.

use super::{merged_params, register_all, OpenOptions, RouteStrategy, GLOBAL_ROOT_NAME};
use crate::error::ModalError;
use crate::location::Location;
use crate::registry::{ModalMeta, ModalRegistry};
use crate::router::{NavigationFailure, NavigationTarget, ResolvedRoute, Router};
use crate::routes::ModalKind;
use async_trait::async_trait;
use tracing::debug;

pub struct PathStrategy {
    modals: Vec<(String, ModalMeta)>,
}

impl PathStrategy {
    pub fn new(modals: Vec<(String, ModalMeta)>) -> Self {
        Self { modals }
    }
}

#[async_trait]
impl RouteStrategy for PathStrategy {
    fn kind(&self) -> ModalKind {
        ModalKind::Path
    }

    fn register(&self, router: &Router, registry: &ModalRegistry) -> Result<(), ModalError> {
        if let Some((missing, _)) = self.modals.iter().find(|(name, _)| !router.has_route(name)) {
            return Err(ModalError::UnknownRoute(missing.clone()));
        }
        register_all(registry, ModalKind::Path, &self.modals)
    }

    async fn open(
        &self,
        router: &Router,
        name: &str,
        options: &OpenOptions,
    ) -> Result<Option<NavigationFailure>, ModalError> {
        let current = router.current();
        let target = NavigationTarget::Named {
            name: name.to_string(),
            params: merged_params(&current, &options.params),
            query: options.query.clone(),
            hash: options.hash.clone(),
        };
        debug!(name, "opening path modal");
        router.push(target).await
    }

    fn find_base(
        &self,
        router: &Router,
        name: &str,
        route: &ResolvedRoute,
    ) -> Result<Option<Location>, ModalError> {
        parent_base(router, name, route)
    }

    fn is_active(&self, route: &ResolvedRoute, name: &str) -> bool {
        route.contains(name)
    }
}

/// Location of the matched record one level above `name`, skipping the
/// global root marker. Resolves `name` with the route's params when the route
/// does not contain it.
pub(crate) fn parent_base(
    router: &Router,
    name: &str,
    route: &ResolvedRoute,
) -> Result<Option<Location>, ModalError> {
    let resolved;
    let route = if route.contains(name) {
        route
    } else {
        resolved = router.resolve(&NavigationTarget::Named {
            name: name.to_string(),
            params: route.params.clone(),
            query: Default::default(),
            hash: String::new(),
        })?;
        &resolved
    };
    let Some(index) = route.index_of(name) else {
        return Ok(None);
    };
    let parent = route.matched[..index]
        .iter()
        .rposition(|record| record.name() != Some(GLOBAL_ROOT_NAME));
    match parent {
        Some(parent) => Ok(Some(Location::new(route.path_at(parent)?))),
        None => Ok(None),
    }
}
