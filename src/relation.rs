//! Relation Graph
//!
//! Static map from a route name to the chain of modal names that must be
//! active for that route to be open. Built once, depth-first, when the
//! controller is assembled.

use crate::error::ModalError;
use crate::routes::{ModalKind, RouteRecord};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub kind: ModalKind,
    /// Root-to-leaf modal names, including the route itself when it is a modal
    pub chain: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RelationGraph {
    entries: HashMap<String, Relation>,
}

struct Visit<'a> {
    kind: ModalKind,
    chain: &'a [String],
    in_section: bool,
    parent_has_view: bool,
    relative_only: bool,
}

impl RelationGraph {
    /// Build relations for the page route tree, the global modal routes and
    /// the query modal names.
    pub fn build(
        routes: &[RouteRecord],
        global_routes: &[RouteRecord],
        query_modals: &[String],
    ) -> Result<Self, ModalError> {
        let mut graph = Self::default();
        for record in routes {
            graph.visit(
                record,
                Visit {
                    kind: ModalKind::Path,
                    chain: &[],
                    in_section: false,
                    parent_has_view: true,
                    relative_only: false,
                },
            )?;
        }
        for record in global_routes {
            if !record.is_modal() {
                return Err(ModalError::InvalidRouteConfiguration(format!(
                    "global route '{}' is not marked as a modal",
                    record.path
                )));
            }
            graph.visit(
                record,
                Visit {
                    kind: ModalKind::Global,
                    chain: &[],
                    in_section: false,
                    parent_has_view: true,
                    relative_only: true,
                },
            )?;
        }
        for name in query_modals {
            graph.insert(
                name,
                Relation {
                    kind: ModalKind::Query,
                    chain: vec![name.clone()],
                },
            )?;
        }
        debug!(relations = graph.entries.len(), "built relation graph");
        Ok(graph)
    }

    fn visit(&mut self, record: &RouteRecord, visit: Visit<'_>) -> Result<(), ModalError> {
        let in_section = visit.in_section || record.is_modal();
        if !in_section {
            for child in &record.children {
                self.visit(
                    child,
                    Visit {
                        kind: visit.kind,
                        chain: &[],
                        in_section: false,
                        parent_has_view: record.has_view,
                        relative_only: false,
                    },
                )?;
            }
            return Ok(());
        }

        let name = record.name().ok_or_else(|| {
            ModalError::InvalidRouteConfiguration(format!(
                "route '{}' inside a modal section has no name",
                record.path
            ))
        })?;
        if visit.relative_only && record.path.starts_with('/') {
            return Err(ModalError::InvalidRouteConfiguration(format!(
                "route '{}' uses absolute path '{}' inside a modal section",
                name, record.path
            )));
        }
        if record.is_modal() && !visit.parent_has_view {
            return Err(ModalError::InvalidRouteConfiguration(format!(
                "modal '{}' has no parent view to render into",
                name
            )));
        }

        let mut chain = visit.chain.to_vec();
        if record.is_modal() {
            chain.push(name.to_string());
        }
        self.insert(
            name,
            Relation {
                kind: visit.kind,
                chain: chain.clone(),
            },
        )?;
        for child in &record.children {
            self.visit(
                child,
                Visit {
                    kind: visit.kind,
                    chain: &chain,
                    in_section: true,
                    parent_has_view: record.has_view,
                    relative_only: true,
                },
            )?;
        }
        Ok(())
    }

    fn insert(&mut self, name: &str, relation: Relation) -> Result<(), ModalError> {
        if self.entries.contains_key(name) {
            return Err(ModalError::AlreadyRegistered(name.to_string()));
        }
        self.entries.insert(name.to_string(), relation);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Relation, ModalError> {
        self.entries
            .get(name)
            .ok_or_else(|| ModalError::NotFound(format!("relation '{}'", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Chain entries of `name` that are not active yet, root first.
    pub fn needs_activation(
        &self,
        name: &str,
        is_active: impl Fn(&str) -> bool,
    ) -> Result<Vec<String>, ModalError> {
        Ok(self
            .get(name)?
            .chain
            .iter()
            .filter(|modal| !is_active(modal))
            .cloned()
            .collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
