//! Declarative route records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a modal is expressed in the URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalKind {
    /// Nested route segment in the path
    Path,
    /// Reserved-prefix query parameter
    Query,
    /// Route mounted under the synthetic global segment
    Global,
}

impl ModalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModalKind::Path => "path",
            ModalKind::Query => "query",
            ModalKind::Global => "global",
        }
    }
}

/// Per-route metadata bag
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteMeta {
    /// Route represents a modal rather than a page
    #[serde(default)]
    pub modal: bool,

    /// Modal may be entered by a fresh load; `None` falls back to the config default
    #[serde(default)]
    pub direct: Option<bool>,

    /// Free-form metadata for the host
    #[serde(default)]
    pub extra: serde_json::Map<String, Value>,
}

/// A node of the route tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub name: Option<String>,
    /// Absolute (`/home`) at the top level, relative (`profile`, `:id`) below
    pub path: String,
    /// Route renders a view that can host nested children
    #[serde(default = "default_has_view")]
    pub has_view: bool,
    #[serde(default)]
    pub meta: RouteMeta,
    #[serde(default)]
    pub children: Vec<RouteRecord>,
}

fn default_has_view() -> bool {
    true
}

impl RouteRecord {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            path: path.into(),
            has_view: true,
            meta: RouteMeta::default(),
            children: Vec::new(),
        }
    }

    /// Unnamed route, typically a layout wrapper
    pub fn unnamed(path: impl Into<String>) -> Self {
        Self {
            name: None,
            path: path.into(),
            has_view: true,
            meta: RouteMeta::default(),
            children: Vec::new(),
        }
    }

    /// Modal route; `direct` left to the config default
    pub fn modal(name: impl Into<String>, path: impl Into<String>) -> Self {
        let mut record = Self::new(name, path);
        record.meta.modal = true;
        record
    }

    pub fn direct(mut self, direct: bool) -> Self {
        self.meta.direct = Some(direct);
        self
    }

    pub fn without_view(mut self) -> Self {
        self.has_view = false;
        self
    }

    pub fn child(mut self, child: RouteRecord) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = RouteRecord>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn is_modal(&self) -> bool {
        self.meta.modal
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
