//! Route guards: interception with allow / reject / redirect / pend.
//!
//! Guards are attached to graphs as **interceptors**
//! ([`GraphBuilder::intercept`](crate::graph::GraphBuilder::intercept)) and
//! inherited by descendant graphs. Before a batch targeting an intercepted
//! subtree commits, the engine awaits every applicable guard with the
//! proposed target.
//!
//! Guard evaluation is **asynchronous** — a guard may hit the network or
//! wait for the host store. While a guard is suspended the single-writer
//! mutex stays held and concurrent navigations return `Dropped`.
//!
//! # Outcomes
//!
//! | Outcome | Effect |
//! |---------|--------|
//! | [`Allow`](GuardOutcome::Allow) | original batch commits |
//! | [`Reject`](GuardOutcome::Reject) | batch discarded, state unchanged |
//! | [`RedirectTo`](GuardOutcome::RedirectTo) | engine navigates to the replacement route |
//! | [`PendAndRedirectTo`](GuardOutcome::PendAndRedirectTo) | redirect **and** store the original as a pending navigation |
//!
//! # Composition
//!
//! [`Guards`] combines guards with AND logic in priority order (higher
//! first); the first non-`Allow` outcome short-circuits.
//!
//! # Example
//!
//! ```
//! use navigator_core::{guard_fn, GuardOutcome, Params};
//!
//! let auth = guard_fn(|request| {
//!     let signed_in = false; // replace with a real check
//!     if signed_in || !request.to.starts_with("workspace/") {
//!         GuardOutcome::Allow
//!     } else {
//!         GuardOutcome::pend_and_redirect("login", Params::new()).display_hint("Sign in")
//!     }
//! });
//! ```

use crate::intent::NavigationRequest;
use crate::params::Params;
use async_trait::async_trait;
use futures::future::BoxFuture;

// ============================================================================
// GuardOutcome
// ============================================================================

/// Verdict of a guard for a proposed navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    /// Let the original batch commit.
    Allow,

    /// Discard the batch; the caller observes `Rejected`.
    Reject,

    /// Navigate to a replacement route instead.
    RedirectTo {
        /// Route to navigate to.
        route: String,
    },

    /// Navigate to a replacement route and store the original target as a
    /// pending navigation, to be resumed once an external condition changes.
    PendAndRedirectTo {
        /// Route to navigate to now.
        route: String,
        /// Metadata stored alongside the pending navigation.
        metadata: Params,
        /// Optional hint for the replacement destination's UI.
        display_hint: Option<String>,
    },
}

impl GuardOutcome {
    /// Create a redirect outcome.
    pub fn redirect(route: impl Into<String>) -> Self {
        Self::RedirectTo {
            route: route.into(),
        }
    }

    /// Create a pend-and-redirect outcome.
    pub fn pend_and_redirect(route: impl Into<String>, metadata: Params) -> Self {
        Self::PendAndRedirectTo {
            route: route.into(),
            metadata,
            display_hint: None,
        }
    }

    /// Attach a display hint (meaningful on pend-and-redirect outcomes).
    #[must_use]
    pub fn display_hint(mut self, hint: impl Into<String>) -> Self {
        if let Self::PendAndRedirectTo { display_hint, .. } = &mut self {
            *display_hint = Some(hint.into());
        }
        self
    }

    /// Check if navigation may proceed unchanged.
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Check if the navigation was rejected.
    pub fn is_reject(&self) -> bool {
        matches!(self, Self::Reject)
    }

    /// Check if this outcome redirects (with or without pending storage).
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::RedirectTo { .. } | Self::PendAndRedirectTo { .. })
    }

    /// The redirect route, if this outcome redirects.
    pub fn redirect_route(&self) -> Option<&str> {
        match self {
            Self::RedirectTo { route } | Self::PendAndRedirectTo { route, .. } => Some(route),
            _ => None,
        }
    }
}

// ============================================================================
// NavigationGuard trait
// ============================================================================

/// Trait for guards that control access to intercepted graphs.
///
/// # Example
///
/// ```
/// use navigator_core::{GuardOutcome, NavigationGuard, NavigationRequest};
/// use async_trait::async_trait;
///
/// struct SessionGuard;
///
/// #[async_trait]
/// impl NavigationGuard for SessionGuard {
///     async fn check(&self, _request: &NavigationRequest) -> GuardOutcome {
///         // await a session lookup here
///         GuardOutcome::Allow
///     }
///
///     fn name(&self) -> &'static str {
///         "SessionGuard"
///     }
/// }
/// ```
#[async_trait]
pub trait NavigationGuard: Send + Sync + 'static {
    /// Evaluate the proposed navigation. May suspend arbitrarily; the
    /// single-writer mutex is held for the duration.
    async fn check(&self, request: &NavigationRequest) -> GuardOutcome;

    /// Guard name for debugging and log output.
    fn name(&self) -> &'static str {
        "NavigationGuard"
    }

    /// Priority for execution order inside [`Guards`]. Higher runs first.
    fn priority(&self) -> i32 {
        0
    }
}

// ============================================================================
// guard_fn helpers
// ============================================================================

/// Create a guard from a synchronous closure.
///
/// # Example
///
/// ```
/// use navigator_core::{guard_fn, GuardOutcome};
///
/// let guard = guard_fn(|request| {
///     if request.to == "admin" {
///         GuardOutcome::Reject
///     } else {
///         GuardOutcome::Allow
///     }
/// });
/// ```
pub const fn guard_fn<F>(f: F) -> FnGuard<F>
where
    F: Fn(&NavigationRequest) -> GuardOutcome + Send + Sync + 'static,
{
    FnGuard { f }
}

/// Guard created from a synchronous closure.
pub struct FnGuard<F> {
    f: F,
}

#[async_trait]
impl<F> NavigationGuard for FnGuard<F>
where
    F: Fn(&NavigationRequest) -> GuardOutcome + Send + Sync + 'static,
{
    async fn check(&self, request: &NavigationRequest) -> GuardOutcome {
        (self.f)(request)
    }
}

/// Create a guard from an async closure. The closure receives an owned
/// request because the returned future must be `'static`.
///
/// # Example
///
/// ```
/// use navigator_core::{async_guard_fn, GuardOutcome};
///
/// let guard = async_guard_fn(|request| {
///     Box::pin(async move {
///         // await something here
///         let _ = request.to;
///         GuardOutcome::Allow
///     })
/// });
/// ```
pub const fn async_guard_fn<F>(f: F) -> AsyncFnGuard<F>
where
    F: Fn(NavigationRequest) -> BoxFuture<'static, GuardOutcome> + Send + Sync + 'static,
{
    AsyncFnGuard { f }
}

/// Guard created from an async closure.
pub struct AsyncFnGuard<F> {
    f: F,
}

#[async_trait]
impl<F> NavigationGuard for AsyncFnGuard<F>
where
    F: Fn(NavigationRequest) -> BoxFuture<'static, GuardOutcome> + Send + Sync + 'static,
{
    async fn check(&self, request: &NavigationRequest) -> GuardOutcome {
        (self.f)(request.clone()).await
    }
}

// ============================================================================
// Guard composition
// ============================================================================

/// Combines multiple guards with AND logic.
///
/// All guards must return [`GuardOutcome::Allow`] for navigation to proceed.
/// The first non-allow outcome is returned immediately (short-circuit).
/// Guards are awaited in priority order (higher priority first).
pub struct Guards {
    guards: Vec<Box<dyn NavigationGuard>>,
}

impl Guards {
    /// Create a composition from boxed guards.
    #[must_use]
    pub fn new(guards: Vec<Box<dyn NavigationGuard>>) -> Self {
        Self { guards }
    }

    /// Start building a composition.
    pub fn builder() -> GuardsBuilder {
        GuardsBuilder::new()
    }
}

#[async_trait]
impl NavigationGuard for Guards {
    async fn check(&self, request: &NavigationRequest) -> GuardOutcome {
        let mut sorted: Vec<_> = self.guards.iter().collect();
        sorted.sort_by_key(|g| std::cmp::Reverse(g.priority()));

        for guard in sorted {
            let outcome = guard.check(request).await;
            if !outcome.is_allow() {
                return outcome;
            }
        }
        GuardOutcome::Allow
    }

    fn name(&self) -> &'static str {
        "Guards"
    }

    fn priority(&self) -> i32 {
        self.guards.iter().map(|g| g.priority()).max().unwrap_or(0)
    }
}

/// Builder for [`Guards`] with a fluent API.
#[must_use]
pub struct GuardsBuilder {
    guards: Vec<Box<dyn NavigationGuard>>,
}

impl GuardsBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self { guards: Vec::new() }
    }

    /// Add a guard to the composition.
    pub fn guard<G: NavigationGuard>(mut self, guard: G) -> Self {
        self.guards.push(Box::new(guard));
        self
    }

    /// Build the final [`Guards`].
    #[must_use]
    pub fn build(self) -> Guards {
        Guards::new(self.guards)
    }
}

impl Default for GuardsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
