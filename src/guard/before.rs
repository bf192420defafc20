//! Before guards, run in order until one denies or redirects.

use super::{GuardPipeline, NavigationContext};
use crate::error::ModalError;
use crate::history::Direction;
use crate::router::{GuardOutcome, NavigationTarget, ResolvedRoute, Router};
use tracing::{debug, warn};

impl GuardPipeline {
    pub(crate) async fn run_before(
        &self,
        router: &Router,
        to: &ResolvedRoute,
        from: &ResolvedRoute,
    ) -> Result<GuardOutcome, ModalError> {
        let ctx = self.classify(router, to, from);

        let outcome = self.forbid_untracked_forward_open(&ctx, to, from);
        if outcome != GuardOutcome::Proceed {
            return Ok(outcome);
        }
        if ctx.is_init_navigation {
            let outcome = self.bootstrap_global(router, to)?;
            if outcome != GuardOutcome::Proceed {
                return Ok(outcome);
            }
            let outcome = self.forbid_non_direct_entry(router, to).await?;
            if outcome != GuardOutcome::Proceed {
                return Ok(outcome);
            }
            let outcome = self.strip_query_modals(router, to).await?;
            if outcome != GuardOutcome::Proceed {
                return Ok(outcome);
            }
        }
        Ok(self.forbid_imperative_push(&ctx, to, from))
    }

    fn classify(&self, router: &Router, to: &ResolvedRoute, from: &ResolvedRoute) -> NavigationContext {
        let classification = router.adapter().classify(to, from);
        self.context.classify(classification);
        if classification.is_init_navigation {
            let entered: Vec<String> = to
                .modal_names()
                .into_iter()
                .filter(|name| self.registry.contains(name))
                .map(str::to_string)
                .collect();
            let direct = !entered.is_empty()
                && entered.iter().all(|name| {
                    self.registry
                        .get_unsafe(name)
                        .map(|info| info.meta.direct)
                        .unwrap_or(false)
                });
            self.context.update(|ctx| ctx.direct = direct);
        }
        let ctx = self.context.get();
        debug!(
            to = %to.full_path(),
            from = %from.full_path(),
            direction = ?ctx.direction,
            init = ctx.is_init_navigation,
            refresh = ctx.is_refresh,
            open = ctx.open_by_open_modal,
            close = ctx.close_by_close_modal,
            "classified navigation"
        );
        ctx
    }

    /// A forward traversal replays an entry the controller wrote; it may not
    /// reopen a modal behind the controller's back.
    fn forbid_untracked_forward_open(
        &self,
        ctx: &NavigationContext,
        to: &ResolvedRoute,
        from: &ResolvedRoute,
    ) -> GuardOutcome {
        if ctx.direction != Direction::Forward || ctx.open_by_open_modal {
            return GuardOutcome::Proceed;
        }
        let opened = self.newly_active(to, from);
        if opened.is_empty() {
            return GuardOutcome::Proceed;
        }
        warn!(?opened, "forward navigation would open modals outside open_modal");
        GuardOutcome::Deny
    }

    /// Mount the global root before matching settles when the page loaded inside it.
    fn bootstrap_global(&self, router: &Router, to: &ResolvedRoute) -> Result<GuardOutcome, ModalError> {
        if self.strategies.global.bootstrap(router, &to.location)? {
            debug!(to = %to.full_path(), "global root attached on load, re-resolving");
            return Ok(GuardOutcome::Redirect(NavigationTarget::Location(
                to.location.clone(),
            )));
        }
        Ok(GuardOutcome::Proceed)
    }

    /// A load inside a modal that does not allow direct entry goes to its base.
    async fn forbid_non_direct_entry(
        &self,
        router: &Router,
        to: &ResolvedRoute,
    ) -> Result<GuardOutcome, ModalError> {
        let blocked = to.modal_names().into_iter().find(|name| {
            self.registry
                .get_unsafe(name)
                .map(|info| !info.meta.direct)
                .unwrap_or(false)
        });
        let Some(name) = blocked.map(str::to_string) else {
            return Ok(GuardOutcome::Proceed);
        };

        if let Some(position) = self.time_machine.position_by_tag(&name) {
            let adapter = router.adapter();
            adapter
                .go_to_delta(position - adapter.native_position(), false)
                .await?;
        }
        let base = self
            .find_base(router, &name, to)?
            .ok_or_else(|| ModalError::NoBaseRouteFound(name.clone()))?;
        warn!(modal = %name, base = %base, "modal cannot be entered directly, redirecting to its base");
        Ok(GuardOutcome::Redirect(base.into()))
    }

    /// Query modals are never restored from a load.
    async fn strip_query_modals(
        &self,
        router: &Router,
        to: &ResolvedRoute,
    ) -> Result<GuardOutcome, ModalError> {
        let query = &self.strategies.query;
        let open = query.active_in(to.query());
        let Some(outermost) = open.first() else {
            return Ok(GuardOutcome::Proceed);
        };
        if let Some(position) = self.time_machine.position_by_tag(outermost) {
            let adapter = router.adapter();
            adapter
                .go_to_delta(position - adapter.native_position(), false)
                .await?;
        }
        let stripped = to.location.clone().with_query(query.strip(to.query()));
        warn!(?open, target = %stripped, "stripping query modals from loaded location");
        Ok(GuardOutcome::Redirect(stripped.into()))
    }

    /// Outside a load and outside `open_modal`, pushes may not open modals.
    fn forbid_imperative_push(
        &self,
        ctx: &NavigationContext,
        to: &ResolvedRoute,
        from: &ResolvedRoute,
    ) -> GuardOutcome {
        if ctx.is_init_navigation
            || ctx.open_by_open_modal
            || ctx.direction != Direction::Unknown
        {
            return GuardOutcome::Proceed;
        }
        let opened = self.newly_active(to, from);
        if opened.is_empty() {
            return GuardOutcome::Proceed;
        }
        warn!(?opened, "navigation would open modals without open_modal");
        GuardOutcome::Deny
    }
}
