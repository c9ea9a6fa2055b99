//! Partial-route resolution.
//!
//! Turns `(partial route, optional preferred graph)` into
//! `(destination, effective graph id, extracted path params)`.
//!
//! # Algorithm
//!
//! 1. Split off and parse any `?query` portion; tokenize the path by `/`.
//! 2. Search scopes in order: the preferred graph (when given), then the
//!    root graph.
//! 3. Within a scope, a token naming a child graph descends into that
//!    graph's **terminal** (alias chains are walked first — a graph whose
//!    entry is another graph contributes the terminal's id as the effective
//!    graph). A lone graph token resolves to the terminal's entry
//!    destination.
//! 4. Otherwise tokens are matched against the scope's destination
//!    templates; each `{name}` segment consumes one literal token and
//!    contributes `name → token` to the extracted params.
//! 5. No match anywhere fails with
//!    [`RouteNotFound`](crate::error::NavigationError::RouteNotFound)
//!    carrying the available canonical routes.
//!
//! Object-form targets ([`NavTarget::Destination`]) skip the walk — the
//! reverse index supplies the canonical path — but still honor the
//! preferred-graph hint: a destination outside the hint's hierarchy fails
//! with a disambiguation hint.

use crate::destination::Destination;
use crate::error::{NavigationError, NavigationResult};
use crate::graph::{GraphId, RoutingTable};
use crate::intent::NavTarget;
use crate::params::Params;
use crate::trace_log;
use crate::url::parse_url_with_query_params;
use std::sync::Arc;

/// A resolved navigation target.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The destination to show.
    pub destination: Arc<Destination>,
    /// The graph the destination was reached **through** (the terminal graph
    /// for alias-reached entries).
    pub graph_id: GraphId,
    /// Params extracted from `{name}` segments and the query string.
    pub path_params: Params,
}

/// Resolve a navigation target against the routing table.
pub fn resolve(
    table: &RoutingTable,
    target: &NavTarget,
    preferred: Option<&GraphId>,
) -> NavigationResult<Resolution> {
    match target {
        NavTarget::Destination(id) => resolve_destination(table, *id, preferred),
        NavTarget::Route(route) => resolve_route(table, route, preferred),
    }
}

/// Resolve a partial route string (`"graphId"`, `"graphId/subRoute"`, or a
/// template with literal values substituted, optionally with `?query`).
pub fn resolve_route(
    table: &RoutingTable,
    route: &str,
    preferred: Option<&GraphId>,
) -> NavigationResult<Resolution> {
    let (path, query) = parse_url_with_query_params(route);
    let tokens: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if tokens.is_empty() {
        return Err(NavigationError::route_not_found(
            route,
            table.available_routes().to_vec(),
        ));
    }

    trace_log!("Resolving partial route '{}' (preferred: {:?})", route, preferred);

    let mut scopes: Vec<GraphId> = Vec::new();
    if let Some(preferred) = preferred {
        scopes.push(preferred.clone());
    }
    if scopes.iter().all(|s| s != table.root()) {
        scopes.push(table.root().clone());
    }

    for scope in &scopes {
        if !table.graph_exists(scope) {
            continue;
        }
        if let Some((dest_id, effective, extracted)) = resolve_in_scope(table, scope, &tokens) {
            let Some(destination) = table.destination(dest_id).cloned() else {
                continue;
            };
            // Query params sit below `{name}` extractions in the merge.
            let path_params = Params::merge(&query, &extracted);
            return Ok(Resolution {
                destination,
                graph_id: effective,
                path_params,
            });
        }
    }

    Err(NavigationError::unresolved_segment(
        route,
        tokens[0],
        table.available_routes().to_vec(),
    ))
}

fn resolve_destination(
    table: &RoutingTable,
    id: crate::destination::DestinationId,
    preferred: Option<&GraphId>,
) -> NavigationResult<Resolution> {
    let destination = table.destination(id).ok_or_else(|| {
        NavigationError::route_not_found(id.to_string(), table.available_routes().to_vec())
    })?;
    let declaring = table.declaring_graph(id).ok_or_else(|| {
        NavigationError::route_not_found(id.to_string(), table.available_routes().to_vec())
    })?;

    if let Some(preferred) = preferred {
        let terminal = table.terminal_graph(preferred);
        let in_hierarchy = table.hierarchy(declaring).contains(&terminal)
            || table.hierarchy(&terminal).contains(declaring);
        if !in_hierarchy {
            let full = table.full_path(id).unwrap_or_else(|| destination.route());
            return Err(
                NavigationError::route_not_found(full, table.available_routes().to_vec())
                    .with_hint(format!(
                        "destination '{}' lives outside graph '{terminal}'",
                        destination.route()
                    )),
            );
        }
    }

    Ok(Resolution {
        destination: destination.clone(),
        graph_id: declaring.clone(),
        path_params: Params::new(),
    })
}

/// Recursive scope walk: child graphs first, then destination templates.
fn resolve_in_scope(
    table: &RoutingTable,
    scope: &GraphId,
    tokens: &[&str],
) -> Option<(crate::destination::DestinationId, GraphId, Params)> {
    let scope = table.terminal_graph(scope);

    if tokens.is_empty() {
        let entry = table.entry_destination(&scope)?;
        return Some((entry, scope, Params::new()));
    }

    if let Some(child) = table.child_graph(&scope, tokens[0]) {
        let terminal = table.terminal_graph(child);
        if tokens.len() == 1 {
            if let Some(entry) = table.entry_destination(&terminal) {
                return Some((entry, terminal, Params::new()));
            }
        } else if let Some(found) = resolve_in_scope(table, &terminal, &tokens[1..]) {
            return Some(found);
        }
        // A destination template may still match the same leading token.
    }

    for dest_id in table.destinations_in(&scope) {
        let destination = table.destination(*dest_id)?;
        if let Some(params) = match_template(destination.route(), tokens) {
            return Some((*dest_id, scope.clone(), params));
        }
    }

    None
}

/// Match a destination template against literal tokens, extracting `{name}`
/// segments. Every token must be consumed.
pub(crate) fn match_template(template: &str, tokens: &[&str]) -> Option<Params> {
    let segments: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() != tokens.len() {
        return None;
    }

    let mut params = Params::new();
    for (segment, token) in segments.iter().zip(tokens.iter()) {
        if let Some(name) = segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
        {
            // Token stored verbatim; original percent-encoding survives.
            params.insert(name, *token);
        } else if segment != token {
            return None;
        }
    }
    Some(params)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Destination;
    use crate::graph::Graph;

    fn table() -> RoutingTable {
        Graph::builder("root")
            .entry(Destination::screen("splash"))
            .destination(Destination::screen("profile"))
            .graph(
                Graph::builder("news")
                    .entry(Destination::screen("overview"))
                    .destination(Destination::screen("article/{articleId}"))
                    .build(),
            )
            .graph(Graph::builder("home").entry_graph("news").build())
            .graph(
                Graph::builder("workspace")
                    .entry(Destination::screen("home"))
                    .destination(Destination::screen("invite/{token}"))
                    .build(),
            )
            .build()
            .into_table()
            .unwrap()
    }

    #[test]
    fn test_resolve_root_destination() {
        let table = table();
        let resolution = resolve_route(&table, "profile", None).unwrap();
        assert_eq!(resolution.destination.route(), "profile");
        assert_eq!(resolution.graph_id.as_str(), "root");
        assert!(resolution.path_params.is_empty());
    }

    #[test]
    fn test_resolve_graph_token_lands_on_entry() {
        let table = table();
        let resolution = resolve_route(&table, "news", None).unwrap();
        assert_eq!(resolution.destination.route(), "overview");
        assert_eq!(resolution.graph_id.as_str(), "news");
    }

    #[test]
    fn test_resolve_alias_chain_effective_graph() {
        // "home" aliases the news graph: the effective graph is the
        // terminal's id, not the alias's.
        let table = table();
        let resolution = resolve_route(&table, "home", None).unwrap();
        assert_eq!(resolution.destination.route(), "overview");
        assert_eq!(resolution.graph_id.as_str(), "news");
    }

    #[test]
    fn test_resolve_graph_sub_route() {
        let table = table();
        let resolution = resolve_route(&table, "workspace/home", None).unwrap();
        assert_eq!(resolution.destination.route(), "home");
        assert_eq!(resolution.graph_id.as_str(), "workspace");
    }

    #[test]
    fn test_resolve_parameterized_template() {
        let table = table();
        let resolution = resolve_route(&table, "news/article/42", None).unwrap();
        assert_eq!(resolution.destination.route(), "article/{articleId}");
        assert_eq!(resolution.graph_id.as_str(), "news");
        assert_eq!(resolution.path_params.get_str("articleId"), Some("42"));
    }

    #[test]
    fn test_resolve_with_preferred_graph_scope() {
        // A bare "article/7" only resolves when scoped to the news graph.
        let table = table();
        assert!(resolve_route(&table, "article/7", None).is_err());

        let resolution = resolve_route(&table, "article/7", Some(&"news".into())).unwrap();
        assert_eq!(resolution.destination.route(), "article/{articleId}");
        assert_eq!(resolution.path_params.get_str("articleId"), Some("7"));
    }

    #[test]
    fn test_resolve_query_params_merged() {
        let table = table();
        let resolution = resolve_route(&table, "workspace/invite/XYZ?source=email", None).unwrap();
        assert_eq!(resolution.path_params.get_str("token"), Some("XYZ"));
        assert_eq!(resolution.path_params.get_str("source"), Some("email"));
    }

    #[test]
    fn test_resolve_template_literal_placeholder() {
        // Resuming a pending navigation feeds the canonical template back
        // in; the placeholder token is consumed as a literal value.
        let table = table();
        let resolution = resolve_route(&table, "workspace/invite/{token}", None).unwrap();
        assert_eq!(resolution.destination.route(), "invite/{token}");
        assert_eq!(resolution.path_params.get_str("token"), Some("{token}"));
    }

    #[test]
    fn test_resolve_unknown_route() {
        let table = table();
        let err = resolve_route(&table, "nowhere", None).unwrap_err();
        match err {
            NavigationError::RouteNotFound { available, .. } => {
                assert!(available.iter().any(|r| r == "profile"));
            }
            NavigationError::InvalidConfiguration { .. } => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_resolve_object_form() {
        let table = table();
        let invite = table.destination_by_route("invite/{token}").unwrap();
        let resolution = resolve(&table, &NavTarget::Destination(invite), None).unwrap();
        assert_eq!(resolution.destination.route(), "invite/{token}");
        assert_eq!(resolution.graph_id.as_str(), "workspace");
    }

    #[test]
    fn test_resolve_object_form_outside_preferred_graph() {
        let table = table();
        let invite = table.destination_by_route("invite/{token}").unwrap();
        let err = resolve(&table, &NavTarget::Destination(invite), Some(&"news".into()))
            .unwrap_err();
        assert!(err.to_string().contains("hint"));
    }

    #[test]
    fn test_resolve_object_form_inside_preferred_graph() {
        let table = table();
        let invite = table.destination_by_route("invite/{token}").unwrap();
        let resolution =
            resolve(&table, &NavTarget::Destination(invite), Some(&"workspace".into())).unwrap();
        assert_eq!(resolution.graph_id.as_str(), "workspace");
    }

    #[test]
    fn test_match_template_shape_mismatch() {
        assert!(match_template("a/{x}", &["a"]).is_none());
        assert!(match_template("a/{x}", &["b", "1"]).is_none());
        assert!(match_template("a/{x}", &["a", "1"]).is_some());
    }
}
