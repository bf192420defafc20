//! Global modals: routes mounted under a synthetic segment (`/_modal` by
//! default) that is attached to whichever base route is current when a global
//! modal is first needed.
//!
//! Only one mount exists at a time. Attaching to a different base removes the
//! previous mount from the route table first.

use super::path::parent_base;
use super::{merged_params, register_all, OpenOptions, RouteStrategy};
use crate::error::ModalError;
use crate::location::Location;
use crate::registry::{ModalMeta, ModalRegistry};
use crate::router::{NavigationFailure, NavigationTarget, ResolvedRoute, Router};
use crate::routes::{ModalKind, RouteRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

/// Route name of the synthetic mount point
pub const GLOBAL_ROOT_NAME: &str = "__modal_global__";

pub struct GlobalStrategy {
    segment: String,
    routes: Vec<RouteRecord>,
    modals: Vec<(String, ModalMeta)>,
    attached_base: Mutex<Option<String>>,
}

impl GlobalStrategy {
    pub fn new(
        segment: impl Into<String>,
        routes: Vec<RouteRecord>,
        modals: Vec<(String, ModalMeta)>,
    ) -> Self {
        Self {
            segment: segment.into(),
            routes,
            modals,
            attached_base: Mutex::new(None),
        }
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Route the synthetic root is currently mounted under
    pub fn attached_base(&self) -> Option<String> {
        self.attached_base.lock().clone()
    }

    /// Mount the synthetic root under `base`. Returns whether the table changed.
    pub fn attach(&self, router: &Router, base: &str) -> Result<bool, ModalError> {
        let mut attached = self.attached_base.lock();
        if attached.as_deref() == Some(base) && router.has_route(GLOBAL_ROOT_NAME) {
            return Ok(false);
        }
        if let Some(previous) = attached.take() {
            router.remove_route(GLOBAL_ROOT_NAME);
            debug!(previous, "detached global modal root");
        }
        let root = RouteRecord::new(GLOBAL_ROOT_NAME, self.segment.clone())
            .children(self.routes.iter().cloned());
        router.add_route(Some(base), root)?;
        *attached = Some(base.to_string());
        info!(base, "attached global modal root");
        Ok(true)
    }

    /// Attach the root for a location that already points inside the global
    /// segment, as happens when the page loads on such a URL.
    pub fn bootstrap(&self, router: &Router, location: &Location) -> Result<bool, ModalError> {
        let segments = location.segments();
        let Some(index) = segments.iter().position(|s| *s == self.segment) else {
            return Ok(false);
        };
        if router.resolve(&location.clone().into())?.contains(GLOBAL_ROOT_NAME) {
            return Ok(false);
        }
        let prefix = Location::new(segments[..index].join("/"));
        let base_route = router.resolve(&prefix.into())?;
        match host_of(&base_route) {
            Some(base) => self.attach(router, &base),
            None => Ok(false),
        }
    }
}

/// Deepest named route of `route` able to host the mount
fn host_of(route: &ResolvedRoute) -> Option<String> {
    let end = route.index_of(GLOBAL_ROOT_NAME).unwrap_or(route.matched.len());
    route.matched[..end]
        .iter()
        .rev()
        .find(|record| record.has_view && record.name.is_some())
        .and_then(|record| record.name.clone())
}

#[async_trait]
impl RouteStrategy for GlobalStrategy {
    fn kind(&self) -> ModalKind {
        ModalKind::Global
    }

    fn register(&self, _router: &Router, registry: &ModalRegistry) -> Result<(), ModalError> {
        register_all(registry, ModalKind::Global, &self.modals)
    }

    async fn open(
        &self,
        router: &Router,
        name: &str,
        options: &OpenOptions,
    ) -> Result<Option<NavigationFailure>, ModalError> {
        let current = router.current();
        let base = host_of(&current).ok_or_else(|| {
            ModalError::UnknownRoute(format!(
                "no route at '{}' can host global modal '{}'",
                current.full_path(),
                name
            ))
        })?;
        self.attach(router, &base)?;
        let target = NavigationTarget::Named {
            name: name.to_string(),
            params: merged_params(&current, &options.params),
            query: options.query.clone(),
            hash: options.hash.clone(),
        };
        debug!(name, base, "opening global modal");
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
