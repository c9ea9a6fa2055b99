//! Navigation graphs and the precomputed routing table.
//!
//! A [`Graph`] is a named container of destinations and sub-graphs with a
//! declared entry. The entry is either a [`Destination`] or an **alias** to
//! another graph id; alias chains are resolved (and cycles rejected) when the
//! tree is compiled into a [`RoutingTable`].
//!
//! The table is built once at module construction, is immutable afterwards,
//! and is shared by reference. It precomputes everything the resolver and
//! reducer need:
//!
//! | Index | Answers |
//! |-------|---------|
//! | `route_index` | canonical full path → destination (deep links) |
//! | `full_paths` | destination → canonical full path (object navigation) |
//! | `declaring_graph` | destination → graph it was declared in |
//! | `hierarchies` | graph → ancestor chain, root first |
//! | `alias_terminals` | alias graph → terminal graph of its chain |
//! | `entry_destinations` | graph → entry destination after alias resolution |
//! | `interceptors` | graph → guard, inherited by descendants |
//!
//! # Example
//!
//! ```
//! use navigator_core::{Destination, Graph};
//!
//! let root = Graph::builder("root")
//!     .entry(Destination::screen("splash"))
//!     .graph(
//!         Graph::builder("news")
//!             .entry(Destination::screen("overview"))
//!             .build(),
//!     )
//!     .graph(Graph::builder("home").entry_graph("news").build())
//!     .build();
//!
//! let table = root.into_table().unwrap();
//! assert_eq!(table.terminal_graph(&"home".into()).as_str(), "news");
//! ```

use crate::destination::{Destination, DestinationId};
use crate::error::{NavigationError, NavigationResult};
#[cfg(feature = "guard")]
use crate::guards::NavigationGuard;
use crate::params::Params;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// GraphId
// ============================================================================

/// Name of a navigation graph. Cheap to clone.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GraphId(Arc<str>);

impl GraphId {
    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GraphId {
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for GraphId {
    fn from(s: String) -> Self {
        Self(Arc::from(s.as_str()))
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphId({})", self.0)
    }
}

// ============================================================================
// Graph
// ============================================================================

/// What a graph's entry points at.
#[derive(Clone)]
pub enum GraphEntry {
    /// The entry is a destination of this graph.
    Destination(Arc<Destination>),
    /// The entry aliases another graph; navigating to this graph lands on
    /// the terminal graph of the chain.
    Alias(GraphId),
}

impl fmt::Debug for GraphEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destination(d) => write!(f, "Entry({})", d.route()),
            Self::Alias(g) => write!(f, "Alias({g})"),
        }
    }
}

/// A named navigation graph: entry, destinations, sub-graphs, and an
/// optional interceptor guard.
pub struct Graph {
    id: GraphId,
    entry: Option<GraphEntry>,
    destinations: Vec<Arc<Destination>>,
    children: Vec<Graph>,
    #[cfg(feature = "guard")]
    interceptor: Option<Arc<dyn NavigationGuard>>,
}

impl Graph {
    /// Start building a graph with the given id.
    pub fn builder(id: impl Into<GraphId>) -> GraphBuilder {
        GraphBuilder {
            id: id.into(),
            entry: None,
            destinations: Vec::new(),
            children: Vec::new(),
            #[cfg(feature = "guard")]
            interceptor: None,
        }
    }

    /// The graph id.
    pub fn id(&self) -> &GraphId {
        &self.id
    }

    /// Compile this graph (as the root) into a routing table.
    pub fn into_table(self) -> NavigationResult<RoutingTable> {
        RoutingTable::build(self)
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("entry", &self.entry)
            .field("destinations", &self.destinations.len())
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Graph`] with a fluent API.
#[must_use]
pub struct GraphBuilder {
    id: GraphId,
    entry: Option<GraphEntry>,
    destinations: Vec<Arc<Destination>>,
    children: Vec<Graph>,
    #[cfg(feature = "guard")]
    interceptor: Option<Arc<dyn NavigationGuard>>,
}

impl GraphBuilder {
    /// Declare the entry destination. It is registered as a destination of
    /// this graph as well.
    pub fn entry(mut self, destination: Destination) -> Self {
        let destination = Arc::new(destination);
        self.entry = Some(GraphEntry::Destination(destination.clone()));
        self.destinations.push(destination);
        self
    }

    /// Declare the entry as an alias to another graph.
    pub fn entry_graph(mut self, graph: impl Into<GraphId>) -> Self {
        self.entry = Some(GraphEntry::Alias(graph.into()));
        self
    }

    /// Add a destination.
    pub fn destination(mut self, destination: Destination) -> Self {
        self.destinations.push(Arc::new(destination));
        self
    }

    /// Add a sub-graph.
    pub fn graph(mut self, child: Graph) -> Self {
        self.children.push(child);
        self
    }

    /// Attach an interceptor guard, inherited by all descendant graphs.
    #[cfg(feature = "guard")]
    pub fn intercept<G: NavigationGuard>(mut self, guard: G) -> Self {
        self.interceptor = Some(Arc::new(guard));
        self
    }

    /// Finish the graph. Validation (entry present, alias chains terminate,
    /// routes non-empty, paths unique) happens when the root graph is
    /// compiled into a [`RoutingTable`].
    pub fn build(self) -> Graph {
        Graph {
            id: self.id,
            entry: self.entry,
            destinations: self.destinations,
            children: self.children,
            #[cfg(feature = "guard")]
            interceptor: self.interceptor,
        }
    }
}

// ============================================================================
// RoutingTable
// ============================================================================

/// Immutable, precomputed routing data shared by reference after build.
pub struct RoutingTable {
    root: GraphId,
    route_index: matchit::Router<DestinationId>,
    destinations: HashMap<DestinationId, Arc<Destination>>,
    full_paths: HashMap<DestinationId, String>,
    declaring_graph: HashMap<DestinationId, GraphId>,
    hierarchies: HashMap<GraphId, Vec<GraphId>>,
    alias_terminals: HashMap<GraphId, GraphId>,
    entry_destinations: HashMap<GraphId, DestinationId>,
    child_graphs: HashMap<GraphId, Vec<GraphId>>,
    graph_destinations: HashMap<GraphId, Vec<DestinationId>>,
    sorted_routes: Vec<String>,
    #[cfg(feature = "guard")]
    interceptors: HashMap<GraphId, Arc<dyn NavigationGuard>>,
}

impl RoutingTable {
    /// Walk the graph tree and precompute every index. Fails with
    /// [`InvalidConfiguration`](NavigationError::InvalidConfiguration) on
    /// duplicate graph ids, empty routes, conflicting canonical paths,
    /// missing entries, or alias cycles.
    pub fn build(root: Graph) -> NavigationResult<Self> {
        let mut table = Self {
            root: root.id.clone(),
            route_index: matchit::Router::new(),
            destinations: HashMap::new(),
            full_paths: HashMap::new(),
            declaring_graph: HashMap::new(),
            hierarchies: HashMap::new(),
            alias_terminals: HashMap::new(),
            entry_destinations: HashMap::new(),
            child_graphs: HashMap::new(),
            graph_destinations: HashMap::new(),
            sorted_routes: Vec::new(),
            #[cfg(feature = "guard")]
            interceptors: HashMap::new(),
        };

        let mut direct_entries: HashMap<GraphId, GraphEntry> = HashMap::new();
        table.walk(&root, &[], &mut direct_entries)?;
        table.resolve_aliases(&direct_entries)?;
        table.sorted_routes.sort();

        Ok(table)
    }

    fn walk(
        &mut self,
        graph: &Graph,
        ancestors: &[GraphId],
        direct_entries: &mut HashMap<GraphId, GraphEntry>,
    ) -> NavigationResult<()> {
        if self.hierarchies.contains_key(&graph.id) {
            return Err(NavigationError::invalid_config(format!(
                "duplicate graph id '{}'",
                graph.id
            )));
        }

        let mut chain = ancestors.to_vec();
        chain.push(graph.id.clone());
        self.hierarchies.insert(graph.id.clone(), chain.clone());

        let entry = graph.entry.clone().ok_or_else(|| {
            NavigationError::invalid_config(format!("graph '{}' has no entry", graph.id))
        })?;
        direct_entries.insert(graph.id.clone(), entry);

        #[cfg(feature = "guard")]
        if let Some(guard) = &graph.interceptor {
            self.interceptors.insert(graph.id.clone(), guard.clone());
        }

        // Canonical path prefix: the hierarchy below the root graph.
        let prefix: Vec<&str> = chain
            .iter()
            .skip(1)
            .map(|g| g.as_str())
            .collect();

        let mut dest_ids = Vec::new();
        let mut seen = HashSet::new();
        for destination in &graph.destinations {
            if !seen.insert(destination.id()) {
                continue; // entry also listed explicitly
            }
            if destination.route().is_empty() {
                return Err(NavigationError::invalid_config(format!(
                    "destination with empty route in graph '{}'",
                    graph.id
                )));
            }

            let full_path = if prefix.is_empty() {
                destination.route().to_string()
            } else {
                format!("{}/{}", prefix.join("/"), destination.route())
            };

            self.route_index
                .insert(format!("/{full_path}"), destination.id())
                .map_err(|e| {
                    NavigationError::invalid_config(format!(
                        "conflicting canonical path '{full_path}': {e}"
                    ))
                })?;

            self.full_paths.insert(destination.id(), full_path.clone());
            self.sorted_routes.push(full_path);
            self.declaring_graph
                .insert(destination.id(), graph.id.clone());
            self.destinations
                .insert(destination.id(), destination.clone());
            dest_ids.push(destination.id());
        }
        self.graph_destinations.insert(graph.id.clone(), dest_ids);

        let child_ids: Vec<GraphId> = graph.children.iter().map(|c| c.id.clone()).collect();
        self.child_graphs.insert(graph.id.clone(), child_ids);

        for child in &graph.children {
            self.walk(child, &chain, direct_entries)?;
        }
        Ok(())
    }

    /// Resolve every alias chain to its terminal graph and record each
    /// graph's effective entry destination. Cycles and dangling references
    /// fail the build.
    fn resolve_aliases(
        &mut self,
        direct_entries: &HashMap<GraphId, GraphEntry>,
    ) -> NavigationResult<()> {
        for (graph_id, entry) in direct_entries {
            let mut visited = HashSet::new();
            visited.insert(graph_id.clone());

            let mut current_id = graph_id.clone();
            let mut current_entry = entry.clone();

            let terminal = loop {
                match current_entry {
                    GraphEntry::Destination(dest) => {
                        self.entry_destinations.insert(graph_id.clone(), dest.id());
                        break current_id;
                    }
                    GraphEntry::Alias(next) => {
                        if !visited.insert(next.clone()) {
                            return Err(NavigationError::invalid_config(format!(
                                "graph-alias cycle starting at '{graph_id}' (via '{next}')"
                            )));
                        }
                        current_entry = direct_entries
                            .get(&next)
                            .ok_or_else(|| {
                                NavigationError::invalid_config(format!(
                                    "graph '{current_id}' aliases unknown graph '{next}'"
                                ))
                            })?
                            .clone();
                        current_id = next;
                    }
                }
            };

            if &terminal != graph_id {
                self.alias_terminals.insert(graph_id.clone(), terminal);
            }
        }
        Ok(())
    }

    /// The root graph id.
    pub fn root(&self) -> &GraphId {
        &self.root
    }

    /// Look up a destination by id.
    pub fn destination(&self, id: DestinationId) -> Option<&Arc<Destination>> {
        self.destinations.get(&id)
    }

    /// The canonical full path of a destination (template form).
    pub fn full_path(&self, id: DestinationId) -> Option<&str> {
        self.full_paths.get(&id).map(String::as_str)
    }

    /// The graph a destination was declared in.
    pub fn declaring_graph(&self, id: DestinationId) -> Option<&GraphId> {
        self.declaring_graph.get(&id)
    }

    /// Ancestor chain of a graph, root first, ending with the graph itself.
    /// Empty for unknown graphs.
    pub fn hierarchy(&self, graph: &GraphId) -> &[GraphId] {
        self.hierarchies.get(graph).map_or(&[], Vec::as_slice)
    }

    /// Check whether a graph id exists in the tree.
    pub fn graph_exists(&self, graph: &GraphId) -> bool {
        self.hierarchies.contains_key(graph)
    }

    /// Check whether a graph's entry is an alias.
    pub fn is_alias(&self, graph: &GraphId) -> bool {
        self.alias_terminals.contains_key(graph)
    }

    /// Terminal graph of an alias chain (the graph itself when not aliased).
    pub fn terminal_graph(&self, graph: &GraphId) -> GraphId {
        self.alias_terminals.get(graph).unwrap_or(graph).clone()
    }

    /// Entry destination of a graph, after alias resolution.
    pub fn entry_destination(&self, graph: &GraphId) -> Option<DestinationId> {
        self.entry_destinations.get(graph).copied()
    }

    /// Direct child graph of `graph` named `name`.
    pub fn child_graph(&self, graph: &GraphId, name: &str) -> Option<&GraphId> {
        self.child_graphs
            .get(graph)?
            .iter()
            .find(|c| c.as_str() == name)
    }

    /// Destinations declared directly in a graph.
    pub fn destinations_in(&self, graph: &GraphId) -> &[DestinationId] {
        self.graph_destinations
            .get(graph)
            .map_or(&[], Vec::as_slice)
    }

    /// Match a canonical full path against the route index, extracting
    /// `{name}` parameters.
    pub fn match_full_path(&self, path: &str) -> Option<(DestinationId, Params)> {
        let lookup = format!("/{}", path.trim_start_matches('/'));
        let matched = self.route_index.at(&lookup).ok()?;
        let mut params = Params::new();
        for (key, value) in matched.params.iter() {
            params.insert(key, value);
        }
        Some((*matched.value, params))
    }

    /// Find a destination by its declared route template. Useful for tests
    /// and simple setups; ambiguous templates return the first declaration
    /// in tree order.
    pub fn destination_by_route(&self, route: &str) -> Option<DestinationId> {
        self.sorted_routes.iter().find_map(|full| {
            let id = self.id_by_full_path(full)?;
            let dest = self.destinations.get(&id)?;
            (dest.route() == route).then_some(id)
        })
    }

    fn id_by_full_path(&self, full_path: &str) -> Option<DestinationId> {
        self.full_paths
            .iter()
            .find(|(_, p)| p.as_str() == full_path)
            .map(|(id, _)| *id)
    }

    /// All canonical routes, sorted. Reported in `RouteNotFound` errors.
    pub fn available_routes(&self) -> &[String] {
        &self.sorted_routes
    }

    /// Guards intercepting a graph, outermost (root) first. Interceptors are
    /// inherited: every ancestor's guard applies to descendants.
    #[cfg(feature = "guard")]
    pub fn guards_for(&self, graph: &GraphId) -> Vec<Arc<dyn NavigationGuard>> {
        self.hierarchy(graph)
            .iter()
            .filter_map(|g| self.interceptors.get(g).cloned())
            .collect()
    }
}

impl fmt::Debug for RoutingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingTable")
            .field("root", &self.root)
            .field("graphs", &self.hierarchies.len())
            .field("destinations", &self.destinations.len())
            .field("aliases", &self.alias_terminals.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
