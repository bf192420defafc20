//! Modal Route: URL-Addressable Modals for Single-Page Routers
//!
//! Makes dialogs addressable by URL and keeps them in step with the session
//! history, so that one modal open or close is exactly one back/forward step
//! no matter how many history entries represent it.

pub mod config;
pub mod controller;
pub mod error;
pub mod guard;
pub mod history;
pub mod location;
pub mod logging;
pub mod registry;
pub mod relation;
pub mod router;
pub mod routes;
pub mod signal;
pub mod storage;
pub mod strategy;
pub mod time_machine;

pub use controller::{ModalController, ModalHandle, ModalResult, ModalRouteBuilder, ModalSnapshot, SetupScope};
pub use error::ModalError;
pub use location::{Location, Query};
pub use registry::ModalOptions;
pub use routes::{ModalKind, RouteRecord};
pub use strategy::{ModalData, OpenOptions};
