//! Error handling for the navigation engine.
//!
//! This module defines the types returned when a transaction cannot complete
//! successfully:
//!
//! - [`NavigationOutcome`] — the top-level outcome of any transaction
//!   (`Success`, `Dropped`, `Rejected`, `Redirected`). Outcomes are normal
//!   results, not errors: a guard rejecting a navigation is expected
//!   behavior.
//! - [`NavigationError`] — a typed failure (unknown route, invalid intent
//!   combination). A failed transaction never mutates state.
//!
//! # Examples
//!
//! ```
//! use navigator_core::error::NavigationOutcome;
//!
//! let outcome = NavigationOutcome::Success;
//! assert!(outcome.is_success());
//!
//! let redirected = NavigationOutcome::Redirected {
//!     route: "login".into(),
//! };
//! assert_eq!(redirected.redirect_route(), Some("login"));
//! ```

use thiserror::Error;

// ============================================================================
// Navigation Outcome
// ============================================================================

/// Outcome of a transaction through the middleware/guard/reducer pipeline.
///
/// Every call to [`NavigationEngine::navigate`](crate::engine::NavigationEngine::navigate)
/// (and friends) resolves to this enum on the happy path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The batch committed as requested.
    Success,
    /// The transaction was discarded without touching state — either another
    /// navigation held the writer, or the spam filter blocked it.
    Dropped,
    /// A guard rejected the navigation; state unchanged.
    Rejected,
    /// A guard redirected the navigation to a different destination.
    Redirected {
        /// Canonical route the engine navigated to instead.
        route: String,
    },
}

impl NavigationOutcome {
    /// Check if the transaction committed as requested.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Check if the transaction was dropped without touching state.
    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped)
    }

    /// Check if a guard rejected the navigation.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }

    /// Check if a guard redirected the navigation.
    pub fn is_redirected(&self) -> bool {
        matches!(self, Self::Redirected { .. })
    }

    /// Get the redirect route, if a guard redirected the navigation.
    pub fn redirect_route(&self) -> Option<&str> {
        match self {
            Self::Redirected { route } => Some(route),
            _ => None,
        }
    }
}

// ============================================================================
// Navigation Error
// ============================================================================

/// Typed failures surfaced to the caller. State is never left half-mutated:
/// an erroring batch is rejected atomically.
#[derive(Debug, Clone, Error)]
pub enum NavigationError {
    /// The route (or a `pop_up_to` target) did not resolve.
    #[error("route not found: '{route}' (unresolved '{unresolved}'){}", hint_suffix(.hint))]
    RouteNotFound {
        /// The full route string the caller asked for.
        route: String,
        /// The segment (or whole route) that failed to match.
        unresolved: String,
        /// Canonical routes that were available at the failure point.
        available: Vec<String>,
        /// Disambiguation hint, set when an object-form navigation resolved
        /// outside the preferred graph hierarchy.
        hint: Option<String>,
    },

    /// The batch combined mutually exclusive intents, a graph-alias chain
    /// cycled, or the configuration was otherwise unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// What was wrong.
        message: String,
    },
}

impl NavigationError {
    /// Build a [`RouteNotFound`](Self::RouteNotFound) for a whole route.
    pub fn route_not_found(route: impl Into<String>, available: Vec<String>) -> Self {
        let route = route.into();
        Self::RouteNotFound {
            unresolved: route.clone(),
            route,
            available,
            hint: None,
        }
    }

    /// Build a [`RouteNotFound`](Self::RouteNotFound) for a specific segment.
    pub fn unresolved_segment(
        route: impl Into<String>,
        unresolved: impl Into<String>,
        available: Vec<String>,
    ) -> Self {
        Self::RouteNotFound {
            route: route.into(),
            unresolved: unresolved.into(),
            available,
            hint: None,
        }
    }

    /// Attach a disambiguation hint to a `RouteNotFound`.
    pub fn with_hint(mut self, text: impl Into<String>) -> Self {
        if let Self::RouteNotFound { hint, .. } = &mut self {
            *hint = Some(text.into());
        }
        self
    }

    /// Build an [`InvalidConfiguration`](Self::InvalidConfiguration).
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Check if this is a `RouteNotFound`.
    pub fn is_route_not_found(&self) -> bool {
        matches!(self, Self::RouteNotFound { .. })
    }

    /// Check if this is an `InvalidConfiguration`.
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration { .. })
    }
}

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|h| format!(" (hint: {h})"))
        .unwrap_or_default()
}

/// Convenience alias for fallible engine operations.
pub type NavigationResult<T> = Result<T, NavigationError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_success() {
        let outcome = NavigationOutcome::Success;
        assert!(outcome.is_success());
        assert!(!outcome.is_dropped());
        assert!(!outcome.is_rejected());
        assert!(!outcome.is_redirected());
    }

    #[test]
    fn test_outcome_redirected() {
        let outcome = NavigationOutcome::Redirected {
            route: "login".to_string(),
        };
        assert!(outcome.is_redirected());
        assert_eq!(outcome.redirect_route(), Some("login"));
    }

    #[test]
    fn test_outcome_dropped_and_rejected_distinct() {
        assert_ne!(NavigationOutcome::Dropped, NavigationOutcome::Rejected);
    }

    #[test]
    fn test_route_not_found_display() {
        let err = NavigationError::route_not_found("nowhere", vec!["home".into()]);
        assert!(err.is_route_not_found());
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn test_route_not_found_hint() {
        let err = NavigationError::route_not_found("profile", vec![])
            .with_hint("destination lives outside graph 'workspace'");
        assert!(err.to_string().contains("workspace"));
    }

    #[test]
    fn test_unresolved_segment() {
        let err = NavigationError::unresolved_segment("workspace/nope", "nope", vec![]);
        match err {
            NavigationError::RouteNotFound {
                route, unresolved, ..
            } => {
                assert_eq!(route, "workspace/nope");
                assert_eq!(unresolved, "nope");
            }
            NavigationError::InvalidConfiguration { .. } => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_invalid_configuration_display() {
        let err = NavigationError::invalid_config("clear_back_stack requires exactly one push");
        assert!(err.is_invalid_configuration());
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
