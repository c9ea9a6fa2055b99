//! Navigation destinations.
//!
//! A [`Destination`] is the atomic target of navigation: a screen or a
//! modal. Destinations are declared once at module build, wrapped in `Arc`,
//! and referenced by stable identity ([`DestinationId`]) everywhere else —
//! the routing table's reverse index supplies the canonical path for
//! object-based navigation.
//!
//! # Example
//!
//! ```
//! use navigator_core::{Destination, Transition};
//!
//! let profile = Destination::screen("profile/{userId}")
//!     .transitions(Transition::slide_right(300), Transition::slide_left(300))
//!     .requires_auth();
//!
//! assert_eq!(profile.route(), "profile/{userId}");
//! assert_eq!(profile.param_names(), vec!["userId"]);
//! assert!(!profile.is_modal());
//! ```

use crate::lifecycle::CreatedHook;
use crate::transition::Transition;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Rendering layer a destination lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// Regular screen content.
    Content,
    /// Modal content rendered above every screen.
    GlobalOverlay,
}

/// Stable identity of a declared destination.
///
/// Two destinations may share a route template (in different graphs);
/// identity is what routing tables key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationId(u64);

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dest#{}", self.0)
    }
}

static NEXT_DESTINATION_ID: AtomicU64 = AtomicU64::new(1);

/// A screen or modal destination.
///
/// Built fluently and registered on a [`Graph`](crate::graph::Graph). The
/// route template may contain `{name}` path-parameter markers, each
/// consuming one path segment at resolution time.
pub struct Destination {
    id: DestinationId,
    route: String,
    layer: Layer,
    enter: Transition,
    exit: Transition,
    elevation: f32,
    requires_auth: bool,
    on_created: Option<CreatedHook>,
}

impl Destination {
    fn new(route: impl Into<String>, layer: Layer) -> Self {
        Self {
            id: DestinationId(NEXT_DESTINATION_ID.fetch_add(1, Ordering::Relaxed)),
            route: route.into(),
            layer,
            enter: Transition::None,
            exit: Transition::None,
            elevation: 0.0,
            requires_auth: false,
            on_created: None,
        }
    }

    /// Declare a content-layer screen.
    pub fn screen(route: impl Into<String>) -> Self {
        Self::new(route, Layer::Content)
    }

    /// Declare a global-overlay modal.
    pub fn modal(route: impl Into<String>) -> Self {
        Self::new(route, Layer::GlobalOverlay)
    }

    /// Set both enter and exit transitions.
    #[must_use]
    pub fn transitions(mut self, enter: Transition, exit: Transition) -> Self {
        self.enter = enter;
        self.exit = exit;
        self
    }

    /// Set the enter transition.
    #[must_use]
    pub fn enter_transition(mut self, enter: Transition) -> Self {
        self.enter = enter;
        self
    }

    /// Set the exit transition.
    #[must_use]
    pub fn exit_transition(mut self, exit: Transition) -> Self {
        self.exit = exit;
        self
    }

    /// Set the elevation used for overlay ordering.
    #[must_use]
    pub fn elevation(mut self, elevation: f32) -> Self {
        self.elevation = elevation;
        self
    }

    /// Mark this destination as requiring authentication.
    ///
    /// The flag is advisory metadata for guards; the engine itself does not
    /// interpret it.
    #[must_use]
    pub fn requires_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    /// Register a hook invoked when an entry for this destination enters the
    /// back-stack. The hook receives a lifecycle handle it can register
    /// removal callbacks on.
    #[must_use]
    pub fn on_created<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut crate::lifecycle::EntryLifecycle) + Send + Sync + 'static,
    {
        self.on_created = Some(std::sync::Arc::new(hook));
        self
    }

    /// Stable identity of this destination.
    pub fn id(&self) -> DestinationId {
        self.id
    }

    /// The route template, possibly containing `{name}` markers.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// The rendering layer.
    pub fn layer(&self) -> Layer {
        self.layer
    }

    /// Check if this destination is a modal.
    pub fn is_modal(&self) -> bool {
        self.layer == Layer::GlobalOverlay
    }

    /// The enter transition reference.
    pub fn enter(&self) -> Transition {
        self.enter
    }

    /// The exit transition reference.
    pub fn exit(&self) -> Transition {
        self.exit
    }

    /// Elevation within the overlay band.
    pub fn elevation_value(&self) -> f32 {
        self.elevation
    }

    /// Check if the auth flag is set.
    pub fn auth_required(&self) -> bool {
        self.requires_auth
    }

    /// The lifecycle-created hook, if one was registered.
    pub fn created_hook(&self) -> Option<&CreatedHook> {
        self.on_created.as_ref()
    }

    /// Names of the `{name}` path-parameter markers, in template order.
    pub fn param_names(&self) -> Vec<&str> {
        self.route
            .split('/')
            .filter_map(|seg| seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
            .collect()
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("id", &self.id)
            .field("route", &self.route)
            .field("layer", &self.layer)
            .field("enter", &self.enter)
            .field("exit", &self.exit)
            .field("elevation", &self.elevation)
            .field("requires_auth", &self.requires_auth)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Destination {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Destination {}

impl std::hash::Hash for Destination {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

// ============================================================================
// Tests
// ============================================================================
