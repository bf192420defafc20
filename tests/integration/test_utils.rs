//! Shared test utilities for integration tests
//!
//! Builds controllers over an in-memory session history and storage that the
//! test keeps handles to, so a test can inspect the native stack and rebuild a
//! controller over the same stack to model a page reload.

use modal_route::history::MemoryHistory;
use modal_route::logging::{init_logging, LoggingConfig};
use modal_route::storage::MemoryStorage;
use modal_route::{ModalController, RouteRecord};
use std::sync::{Arc, Once};

static LOGGING: Once = Once::new();

/// Print engine events when MODAL_ROUTE_LOG is set, e.g. `MODAL_ROUTE_LOG=modal_route=debug`
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        if std::env::var("MODAL_ROUTE_LOG").is_ok() {
            let _ = init_logging(Some(&LoggingConfig::default()));
        }
    });
}

/// A browser tab: the history stack and session storage outlive controllers.
pub struct Tab {
    pub history: Arc<MemoryHistory>,
    pub storage: Arc<MemoryStorage>,
}

impl Tab {
    pub fn new(url: &str) -> Self {
        init_test_logging();
        Self {
            history: Arc::new(MemoryHistory::new(url)),
            storage: Arc::new(MemoryStorage::new()),
        }
    }

    /// Assemble a controller over this tab without starting it.
    pub fn controller(&self) -> Arc<ModalController> {
        ModalController::builder()
            .routes(app_routes())
            .global_modal(RouteRecord::modal("help", "help"))
            .global_modal(RouteRecord::modal("console", "console").direct(true))
            .query_modal("confirm")
            .query_modal("picker")
            .history(self.history.clone())
            .storage(self.storage.clone())
            .build()
            .unwrap()
    }

    /// Assemble and start, the way a page load does.
    pub async fn load(&self) -> Arc<ModalController> {
        let controller = self.controller();
        controller.start().await.unwrap();
        controller
    }

    pub fn entries(&self) -> Vec<String> {
        self.history.entries()
    }

    pub fn index(&self) -> usize {
        self.history.index()
    }
}

/// ```text
/// /home
///   profile          (modal)
///     edit           (modal)
///   settings         (modal, direct)
/// /about
/// /lonely            (modal)
/// ```
pub fn app_routes() -> Vec<RouteRecord> {
    vec![
        RouteRecord::new("home", "/home")
            .child(RouteRecord::modal("profile", "profile").child(RouteRecord::modal("edit", "edit")))
            .child(RouteRecord::modal("settings", "settings").direct(true)),
        RouteRecord::new("about", "/about"),
        RouteRecord::modal("lonely", "/lonely"),
    ]
}
