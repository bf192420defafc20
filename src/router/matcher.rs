//! Route table: flattening, path matching and named-route resolution.

use crate::error::ModalError;
use crate::location::{decode_segment, encode_segment, normalize_path, Location, Query};
use crate::routes::{RouteMeta, RouteRecord};
use std::collections::{BTreeMap, HashMap};

/// Route parameters extracted from, or substituted into, a path
pub type Params = BTreeMap<String, String>;

/// One level of a matched route chain.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRecord {
    pub name: Option<String>,
    /// Absolute pattern, e.g. `/users/:id/profile`
    pub pattern: String,
    pub has_view: bool,
    pub meta: RouteMeta,
}

impl MatchedRecord {
    pub fn is_modal(&self) -> bool {
        self.meta.modal
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Substitute params into the pattern
    pub fn build_path(&self, params: &Params) -> Result<String, ModalError> {
        build_path(&self.pattern, params)
    }
}

/// Result of resolving a navigation target against the table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRoute {
    pub name: Option<String>,
    pub location: Location,
    pub params: Params,
    /// Root-to-leaf chain; empty when nothing matched
    pub matched: Vec<MatchedRecord>,
    start: bool,
}

impl ResolvedRoute {
    /// Sentinel "before the first navigation" route
    pub fn start() -> Self {
        Self {
            name: None,
            location: Location::new("/"),
            params: Params::new(),
            matched: Vec::new(),
            start: true,
        }
    }

    pub fn is_start(&self) -> bool {
        self.start
    }

    pub fn full_path(&self) -> String {
        self.location.full_path()
    }

    pub fn query(&self) -> &Query {
        &self.location.query
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.matched.iter().position(|r| r.name() == Some(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Names of the modal records in the matched chain, root first
    pub fn modal_names(&self) -> Vec<&str> {
        self.matched
            .iter()
            .filter(|r| r.is_modal())
            .filter_map(|r| r.name())
            .collect()
    }

    /// Path of the matched record at `index` with this route's params
    pub fn path_at(&self, index: usize) -> Result<String, ModalError> {
        let record = self
            .matched
            .get(index)
            .ok_or_else(|| ModalError::UnknownRoute(format!("matched index {}", index)))?;
        record.build_path(&self.params)
    }
}

/// Where a navigation should go.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationTarget {
    Location(Location),
    Named {
        name: String,
        params: Params,
        query: Query,
        hash: String,
    },
}

impl NavigationTarget {
    pub fn named(name: impl Into<String>) -> Self {
        NavigationTarget::Named {
            name: name.into(),
            params: Params::new(),
            query: Query::new(),
            hash: String::new(),
        }
    }
}

impl From<Location> for NavigationTarget {
    fn from(location: Location) -> Self {
        NavigationTarget::Location(location)
    }
}

impl From<&str> for NavigationTarget {
    fn from(raw: &str) -> Self {
        NavigationTarget::Location(Location::parse(raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct FlatRoute {
    chain: Vec<MatchedRecord>,
    segments: Vec<Segment>,
}

impl FlatRoute {
    fn static_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Static(_)))
            .count()
    }

    fn matches(&self, parts: &[&str]) -> Option<Params> {
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = Params::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Static(expected) if expected == part => {}
                Segment::Static(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), decode_segment(part));
                }
            }
        }
        Some(params)
    }
}

/// Mutable route tree plus its flattened index.
#[derive(Debug, Default)]
pub struct RouteTable {
    roots: Vec<RouteRecord>,
    flat: Vec<FlatRoute>,
    by_name: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteRecord>) -> Result<Self, ModalError> {
        let mut table = Self {
            roots: routes,
            flat: Vec::new(),
            by_name: HashMap::new(),
        };
        table.rebuild()?;
        Ok(table)
    }

    pub fn routes(&self) -> &[RouteRecord] {
        &self.roots
    }

    pub fn has_route(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Add a route at the top level or as a child of `parent`.
    pub fn add_route(
        &mut self,
        parent: Option<&str>,
        record: RouteRecord,
    ) -> Result<(), ModalError> {
        match parent {
            None => self.roots.push(record),
            Some(parent_name) => {
                let parent_record = find_mut(&mut self.roots, parent_name)
                    .ok_or_else(|| ModalError::UnknownRoute(parent_name.to_string()))?;
                parent_record.children.push(record);
            }
        }
        if let Err(err) = self.rebuild() {
            // roll back so the table stays consistent
            match parent {
                None => {
                    self.roots.pop();
                }
                Some(parent_name) => {
                    if let Some(parent_record) = find_mut(&mut self.roots, parent_name) {
                        parent_record.children.pop();
                    }
                }
            }
            self.rebuild()?;
            return Err(err);
        }
        Ok(())
    }

    /// Remove a named route and its children. Returns whether it existed.
    pub fn remove_route(&mut self, name: &str) -> bool {
        let removed = remove_named(&mut self.roots, name);
        if removed {
            // removal cannot introduce duplicates
            let _ = self.rebuild();
        }
        removed
    }

    pub fn resolve(&self, target: &NavigationTarget) -> Result<ResolvedRoute, ModalError> {
        match target {
            NavigationTarget::Location(location) => Ok(self.resolve_location(location)),
            NavigationTarget::Named {
                name,
                params,
                query,
                hash,
            } => {
                let index = *self
                    .by_name
                    .get(name)
                    .ok_or_else(|| ModalError::UnknownRoute(name.clone()))?;
                let flat = &self.flat[index];
                let leaf = flat
                    .chain
                    .last()
                    .ok_or_else(|| ModalError::UnknownRoute(name.clone()))?;
                let path = leaf.build_path(params)?;
                let used: Params = params
                    .iter()
                    .filter(|(key, _)| pattern_has_param(&leaf.pattern, key))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                Ok(ResolvedRoute {
                    name: Some(name.clone()),
                    location: Location::new(path)
                        .with_query(query.clone())
                        .with_hash(hash.clone()),
                    params: used,
                    matched: flat.chain.clone(),
                    start: false,
                })
            }
        }
    }

    fn resolve_location(&self, location: &Location) -> ResolvedRoute {
        let parts = location.segments();
        let mut best: Option<(&FlatRoute, Params, (usize, usize))> = None;
        for flat in &self.flat {
            if let Some(params) = flat.matches(&parts) {
                let score = (flat.static_count(), flat.chain.len());
                let better = match &best {
                    Some((_, _, best_score)) => score > *best_score,
                    None => true,
                };
                if better {
                    best = Some((flat, params, score));
                }
            }
        }
        match best {
            Some((flat, params, _)) => ResolvedRoute {
                name: flat.chain.last().and_then(|r| r.name.clone()),
                location: location.clone(),
                params,
                matched: flat.chain.clone(),
                start: false,
            },
            None => ResolvedRoute {
                name: None,
                location: location.clone(),
                params: Params::new(),
                matched: Vec::new(),
                start: false,
            },
        }
    }

    fn rebuild(&mut self) -> Result<(), ModalError> {
        let mut flat = Vec::new();
        for root in &self.roots {
            flatten(root, "", &[], &mut flat);
        }
        let mut by_name = HashMap::new();
        for (index, entry) in flat.iter().enumerate() {
            if let Some(name) = entry.chain.last().and_then(|r| r.name.clone()) {
                if by_name.insert(name.clone(), index).is_some() {
                    return Err(ModalError::InvalidRouteConfiguration(format!(
                        "duplicate route name '{}'",
                        name
                    )));
                }
            }
        }
        self.flat = flat;
        self.by_name = by_name;
        Ok(())
    }
}

fn flatten(record: &RouteRecord, parent_pattern: &str, parents: &[MatchedRecord], out: &mut Vec<FlatRoute>) {
    let pattern = join_pattern(parent_pattern, &record.path);
    let mut chain = parents.to_vec();
    chain.push(MatchedRecord {
        name: record.name.clone(),
        pattern: pattern.clone(),
        has_view: record.has_view,
        meta: record.meta.clone(),
    });
    out.push(FlatRoute {
        segments: parse_segments(&pattern),
        chain: chain.clone(),
    });
    for child in &record.children {
        flatten(child, &pattern, &chain, out);
    }
}

/// Join a child path onto its parent's pattern; absolute children stand alone.
pub fn join_pattern(parent: &str, path: &str) -> String {
    if path.starts_with('/') || parent.is_empty() {
        normalize_path(path)
    } else {
        normalize_path(&format!("{}/{}", parent, path))
    }
}

fn parse_segments(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix(':') {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Static(s.to_string()),
        })
        .collect()
}

fn pattern_has_param(pattern: &str, key: &str) -> bool {
    parse_segments(pattern)
        .iter()
        .any(|s| matches!(s, Segment::Param(name) if name == key))
}

fn build_path(pattern: &str, params: &Params) -> Result<String, ModalError> {
    let mut parts = Vec::new();
    for segment in parse_segments(pattern) {
        match segment {
            Segment::Static(s) => parts.push(s),
            Segment::Param(name) => {
                let value = params.get(&name).ok_or_else(|| {
                    ModalError::UnknownRoute(format!("missing param '{}' for '{}'", name, pattern))
                })?;
                parts.push(encode_segment(value));
            }
        }
    }
    Ok(format!("/{}", parts.join("/")))
}

fn find_mut<'a>(records: &'a mut [RouteRecord], name: &str) -> Option<&'a mut RouteRecord> {
    for record in records.iter_mut() {
        if record.name() == Some(name) {
            return Some(record);
        }
        if let Some(found) = find_mut(&mut record.children, name) {
            return Some(found);
        }
    }
    None
}

fn remove_named(records: &mut Vec<RouteRecord>, name: &str) -> bool {
    let before = records.len();
    records.retain(|r| r.name() != Some(name));
    if records.len() != before {
        return true;
    }
    records
        .iter_mut()
        .any(|record| remove_named(&mut record.children, name))
}
