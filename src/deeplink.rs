//! Deep-link aliases.
//!
//! External URLs rarely match internal route structure one-to-one. An alias
//! registered at module build rewrites an inbound `path?query` into a
//! canonical target route before resolution:
//!
//! - `pattern` — segment pattern matched against the inbound path; `{name}`
//!   segments capture values;
//! - `target_route` — the canonical route to navigate instead (kept in
//!   template form — captured and mapped values travel as params);
//! - an optional param-mapping function massaging captured + query params
//!   into the params the target expects.
//!
//! # Example
//!
//! ```
//! use navigator_core::{DeepLinkAlias, DeepLinkRegistry, Params};
//!
//! let mut registry = DeepLinkRegistry::new();
//! registry.register(DeepLinkAlias::new("artist/invite", "workspace/invite/{token}"));
//!
//! let (path, query) = navigator_core::url::parse_url_with_query_params(
//!     "artist/invite?token=XYZ789",
//! );
//! let (target, params) = registry.rewrite(&path, &query).unwrap();
//! assert_eq!(target, "workspace/invite/{token}");
//! assert_eq!(params.get_str("token"), Some("XYZ789"));
//! ```

use crate::params::Params;
use crate::resolve::match_template;
use std::fmt;
use std::sync::Arc;

type ParamMapper = Arc<dyn Fn(&Params) -> Params + Send + Sync>;

/// A single registered alias.
pub struct DeepLinkAlias {
    pattern: String,
    target_route: String,
    map_params: Option<ParamMapper>,
}

impl DeepLinkAlias {
    /// Create an alias rewriting `pattern` to `target_route`.
    pub fn new(pattern: impl Into<String>, target_route: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            target_route: target_route.into(),
            map_params: None,
        }
    }

    /// Attach a param-mapping function. It receives the captured pattern
    /// params merged with the query params and returns the params handed to
    /// the target navigation.
    #[must_use]
    pub fn map_params<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&Params) -> Params + Send + Sync + 'static,
    {
        self.map_params = Some(Arc::new(mapper));
        self
    }

    /// The inbound pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The canonical target route (template form).
    pub fn target_route(&self) -> &str {
        &self.target_route
    }
}

impl fmt::Debug for DeepLinkAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepLinkAlias")
            .field("pattern", &self.pattern)
            .field("target_route", &self.target_route)
            .field("has_mapper", &self.map_params.is_some())
            .finish()
    }
}

/// Ordered alias registry; the first matching pattern wins.
#[derive(Debug, Default)]
pub struct DeepLinkRegistry {
    aliases: Vec<DeepLinkAlias>,
}

impl DeepLinkRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an alias.
    pub fn register(&mut self, alias: DeepLinkAlias) {
        self.aliases.push(alias);
    }

    /// Number of registered aliases.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Check if no aliases are registered.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Rewrite an inbound path. Returns the target route (template form)
    /// plus the mapped params, or `None` when no pattern matches.
    pub fn rewrite(&self, path: &str, query: &Params) -> Option<(String, Params)> {
        let tokens: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        for alias in &self.aliases {
            if let Some(captured) = match_template(&alias.pattern, &tokens) {
                let combined = Params::merge(query, &captured);
                let mapped = match &alias.map_params {
                    Some(mapper) => (**mapper)(&combined),
                    None => combined,
                };
                return Some((alias.target_route.clone(), mapped));
            }
        }
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_alias_passes_query_through() {
        let mut registry = DeepLinkRegistry::new();
        registry.register(DeepLinkAlias::new("artist/invite", "workspace/invite/{token}"));

        let query = Params::from_pairs([("token", "XYZ789")]);
        let (target, params) = registry.rewrite("artist/invite", &query).unwrap();

        assert_eq!(target, "workspace/invite/{token}");
        assert_eq!(params.get_str("token"), Some("XYZ789"));
    }

    #[test]
    fn test_pattern_captures_segments() {
        let mut registry = DeepLinkRegistry::new();
        registry.register(DeepLinkAlias::new("a/{id}/share", "news/article/{articleId}"));

        let (target, params) = registry.rewrite("a/42/share", &Params::new()).unwrap();
        assert_eq!(target, "news/article/{articleId}");
        assert_eq!(params.get_str("id"), Some("42"));
    }

    #[test]
    fn test_param_mapper_reshapes() {
        let mut registry = DeepLinkRegistry::new();
        registry.register(
            DeepLinkAlias::new("a/{id}/share", "news/article/{articleId}").map_params(|captured| {
                let mut mapped = Params::new();
                if let Some(id) = captured.get_str("id") {
                    mapped.insert("articleId", id);
                }
                mapped
            }),
        );

        let (_, params) = registry.rewrite("a/42/share", &Params::new()).unwrap();
        assert_eq!(params.get_str("articleId"), Some("42"));
        assert!(!params.contains("id"));
    }

    #[test]
    fn test_first_match_wins() {
        let mut registry = DeepLinkRegistry::new();
        registry.register(DeepLinkAlias::new("x/{a}", "first/{a}"));
        registry.register(DeepLinkAlias::new("x/{b}", "second/{b}"));

        let (target, _) = registry.rewrite("x/1", &Params::new()).unwrap();
        assert_eq!(target, "first/{a}");
    }

    #[test]
    fn test_no_match() {
        let registry = DeepLinkRegistry::new();
        assert!(registry.rewrite("anything", &Params::new()).is_none());
    }
}
