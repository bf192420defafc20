//! After-commit history repair.
//!
//! Runs as one sequential routine: close reconciliation settles the stack
//! before open padding reads the current position from it.

use super::{GuardPipeline, NavigationContext};
use crate::error::ModalError;
use crate::history::Direction;
use crate::location::Location;
use crate::router::{NavigationFailure, ResolvedRoute, Router};
use crate::routes::ModalKind;
use crate::strategy::GLOBAL_ROOT_NAME;
use crate::time_machine::WriteItem;
use serde_json::Value;
use tracing::{debug, info, warn};

impl GuardPipeline {
    pub(crate) async fn run_after(
        &self,
        router: &Router,
        to: &ResolvedRoute,
        from: &ResolvedRoute,
        failure: Option<NavigationFailure>,
    ) -> Result<(), ModalError> {
        let result = match failure {
            None => {
                let ctx = self.context.get();
                match self.close_reconciliation(router, to, from, &ctx).await {
                    Ok(()) => self.open_padding(router, to, from, &ctx).await,
                    Err(err) => Err(err),
                }
            }
            Some(failure) => {
                debug!(%failure, to = %to.full_path(), "navigation did not commit");
                Ok(())
            }
        };
        self.sync_registry(router);
        self.publish(router);
        self.context.reset();
        if let Err(err) = &result {
            warn!(error = %err, "history reconciliation failed");
        }
        result
    }

    /// A navigation that left a modal without going through `close_modal`
    /// rewinds to the modal's base and re-lands on the destination.
    async fn close_reconciliation(
        &self,
        router: &Router,
        to: &ResolvedRoute,
        from: &ResolvedRoute,
        ctx: &NavigationContext,
    ) -> Result<(), ModalError> {
        if ctx.is_init_navigation
            || ctx.close_by_close_modal
            || ctx.direction == Direction::Backward
            || ctx.direct
        {
            return Ok(());
        }
        let Some(closed) = self.first_closed(to, from) else {
            return Ok(());
        };
        info!(modal = %closed, to = %to.full_path(), "modal closed by navigation");

        match self.time_machine.position_by_tag(&closed) {
            Some(position) => {
                let adapter = router.adapter();
                let state = adapter
                    .go_to_delta(position - adapter.native_position(), false)
                    .await?;
                let destination = to.full_path();
                if state.current != destination {
                    adapter.push(&destination, Value::Null);
                }
                Ok(())
            }
            None => self.pad_history_when_init_modal(router, &closed, from, to).await,
        }
    }

    /// Path and global modals take precedence over query modals; outermost first.
    fn first_closed(&self, to: &ResolvedRoute, from: &ResolvedRoute) -> Option<String> {
        let still_active = self.active_modals(to);
        self.active_modals(from)
            .into_iter()
            .find(|name| !still_active.contains(name))
    }

    /// One history entry per modal segment the open traversed, each tagged
    /// with the entry before it.
    async fn open_padding(
        &self,
        router: &Router,
        to: &ResolvedRoute,
        from: &ResolvedRoute,
        ctx: &NavigationContext,
    ) -> Result<(), ModalError> {
        if !ctx.open_by_open_modal {
            return Ok(());
        }
        let Some(opening) = ctx.opening_modal.as_deref() else {
            return Ok(());
        };

        if self.kind_of(opening)? == ModalKind::Query {
            let position = router.adapter().native_position() - 1;
            return self.time_machine.tag(opening, Some(position));
        }
        if to.name.is_some() && to.name == from.name {
            return Ok(());
        }

        let shared = to
            .matched
            .iter()
            .zip(&from.matched)
            .take_while(|(a, b)| a == b)
            .count();
        let items = self.segment_items(to, shared, |_| true)?;
        if items.is_empty() {
            return Ok(());
        }
        debug!(modal = opening, entries = items.len(), "padding history after open");
        self.time_machine.write(&items, true).await
    }

    /// Give a modal entered without a recorded base a padded history below it,
    /// rooted at the first non-modal ancestor of its chain.
    pub async fn pad_history_when_init_modal(
        &self,
        router: &Router,
        name: &str,
        modal_route: &ResolvedRoute,
        current_route: &ResolvedRoute,
    ) -> Result<(), ModalError> {
        let relation = self.relations.get(name)?;
        let root = relation.chain.first().map(String::as_str).unwrap_or(name);
        let root_base = self.find_base(router, root, modal_route)?;

        let adapter = router.adapter();
        let initial = adapter.initial_position();
        let native = adapter.native_position();
        if native != initial {
            adapter.go_to_delta(initial - native, false).await?;
        }

        let items = match root_base {
            Some(base) => {
                let mut items = vec![WriteItem::new(base.full_path())];
                let mut below = self.segment_items(current_route, 0, |path| is_below(path, &base))?;
                let full_path = current_route.full_path();
                if below.is_empty() && full_path != base.full_path() {
                    below.push(WriteItem::new(full_path));
                }
                items.extend(below);
                items
            }
            None => {
                // only a route that still shows the modal gets its tag
                let mut current = WriteItem::new(current_route.full_path());
                if self.is_active(current_route, name) {
                    current = current.tagged(name, -1);
                }
                vec![WriteItem::new("/"), current]
            }
        };
        debug!(modal = name, entries = items.len(), "padding history for modal without base");
        self.time_machine.write(&items, true).await
    }

    /// Entries for the matched segments of `route` from `start` on that pass
    /// `keep`. The last segment carries the full path plus tags for the open
    /// query modals; consecutive duplicate URLs collapse into one entry.
    fn segment_items(
        &self,
        route: &ResolvedRoute,
        start: usize,
        keep: impl Fn(&str) -> bool,
    ) -> Result<Vec<WriteItem>, ModalError> {
        let full_path = route.full_path();
        let last = route.matched.len().saturating_sub(1);
        let mut items: Vec<WriteItem> = Vec::new();
        for (index, record) in route.matched.iter().enumerate().skip(start) {
            if record.name() == Some(GLOBAL_ROOT_NAME) {
                continue;
            }
            let path = route.path_at(index)?;
            if !keep(&path) {
                continue;
            }
            let url = if index == last { full_path.clone() } else { path };
            let tag = record
                .name()
                .filter(|name| record.is_modal() && self.registry.contains(name));
            match items.last_mut() {
                Some(previous) if previous.path == url => {
                    if let Some(tag) = tag {
                        previous.tags.push(tag.to_string());
                        previous.tag_offset = -1;
                    }
                }
                _ => {
                    let mut item = WriteItem::new(url);
                    if let Some(tag) = tag {
                        item = item.tagged(tag, -1);
                    }
                    items.push(item);
                }
            }
        }

        let queries = self.strategies.query.active_in(route.query());
        if !queries.is_empty() && items.last().map(|i| i.path.as_str()) != Some(full_path.as_str()) {
            items.push(WriteItem::new(full_path.clone()));
        }
        if let Some(final_item) = items.last_mut().filter(|_| !queries.is_empty()) {
            final_item
                .tags
                .extend(queries.iter().map(|name| name.to_string()));
            final_item.tag_offset = -1;
        }
        Ok(items)
    }

    /// Resolve the waiters of modals the current route no longer shows.
    fn sync_registry(&self, router: &Router) {
        let current = router.current();
        for name in self.registry.activated() {
            if self.is_active(&current, &name) {
                continue;
            }
            match self.registry.deactivate(&name) {
                Ok(true) => info!(modal = %name, "modal closed"),
                Ok(false) => {}
                Err(err) => warn!(modal = %name, error = %err, "failed to deactivate modal"),
            }
        }
    }
}

/// `path` lies strictly below `base`
fn is_below(path: &str, base: &Location) -> bool {
    if base.path == "/" {
        return path != "/";
    }
    path.strip_prefix(base.path.as_str())
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}
