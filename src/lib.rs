//! # navigator-core
//!
//! A declarative, state-machine navigation engine for application
//! front-ends. The engine manages an ordered back-stack of destinations
//! (screens and modals) across a hierarchy of named graphs, and arbitrates
//! every change to that stack through a single atomic transaction.
//!
//! The crate is **headless**: it owns routing, state, guards, guided flows,
//! and transition *decisions*, while rendering and animation execution stay
//! with the host UI, which observes immutable state snapshots.
//!
//! ## Subsystems
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`url`] | percent-encoding codec, `path?query` parsing |
//! | [`params`] | ordered typed parameter maps with merge priority |
//! | [`destination`], [`graph`] | the graph model and precomputed routing table |
//! | [`resolve`] | partial-route resolution with graph-alias chains |
//! | [`intent`], [`reducer`] | the transaction DSL and the pure batch reducer |
//! | [`guards`] | async interception: allow / reject / redirect / pend |
//! | [`flow`] | guided flows with runtime modification |
//! | [`middleware`] | cross-cutting callbacks and the spam/debounce filter |
//! | [`lifecycle`] | per-entry created/removed hooks |
//! | [`engine`] | the single-writer pipeline tying it all together |
//!
//! ## Feature flags
//!
//! | Feature | Default | Effect |
//! |---------|---------|--------|
//! | `guard` | yes | graph interceptors and the guard runner |
//! | `middleware` | yes | middleware chain and the spam filter |
//! | `cache` | no | LRU resolution cache (`lru` crate) |
//! | `log` | yes | logging via the `log` crate |
//! | `tracing` | no | logging via the `tracing` crate (enable at most one) |
//!
//! ## Quick start
//!
//! ```no_run
//! use navigator_core::{Destination, Graph, NavigationEngine, Params, Transition};
//!
//! # async fn demo() -> Result<(), navigator_core::NavigationError> {
//! let engine = NavigationEngine::builder(
//!     Graph::builder("root")
//!         .entry(Destination::screen("home"))
//!         .destination(
//!             Destination::screen("profile/{userId}")
//!                 .transitions(Transition::slide_right(300), Transition::slide_left(300)),
//!         )
//!         .graph(
//!             Graph::builder("news")
//!                 .entry(Destination::screen("overview"))
//!                 .build(),
//!         )
//!         .build(),
//! )
//! .build()?;
//!
//! engine
//!     .navigate(|tx| tx.navigate_to("profile/42", Params::new()))
//!     .await?;
//!
//! let state = engine.state();
//! assert_eq!(state.current_full_path(), "profile/42");
//! assert_eq!(state.current().params().get_str("userId"), Some("42"));
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(feature = "cache")]
pub mod cache;
pub mod deeplink;
pub mod destination;
pub mod engine;
pub mod error;
pub mod flow;
pub mod graph;
pub mod guards;
pub mod intent;
pub mod lifecycle;
pub mod logging;
#[cfg(feature = "middleware")]
pub mod middleware;
pub mod params;
pub mod reducer;
pub mod resolve;
pub mod state;
pub mod transition;
pub mod url;

pub use deeplink::{DeepLinkAlias, DeepLinkRegistry};
pub use destination::{Destination, DestinationId, Layer};
pub use engine::{
    EngineConfig, GuidedFlowScope, ListenerId, NavigationEngine, NavigationEngineBuilder,
    NavigationEvent, DEFAULT_GUARD_THRESHOLD, DEFAULT_SAFETY_TIMEOUT,
};
pub use error::{NavigationError, NavigationOutcome, NavigationResult};
pub use flow::{
    ClearModificationsPolicy, FlowModification, FlowModifications, FlowStep,
    GuidedFlowDefinition, GuidedFlowState, StepSelector,
};
pub use graph::{Graph, GraphBuilder, GraphEntry, GraphId, RoutingTable};
pub use guards::{
    async_guard_fn, guard_fn, GuardOutcome, Guards, GuardsBuilder, NavigationGuard,
};
pub use intent::{
    NavTarget, NavigationIntent, NavigationRequest, Transaction, TransactionBuilder,
};
pub use lifecycle::{EntryLifecycle, LifecycleTracker};
#[cfg(feature = "middleware")]
pub use middleware::{
    middleware_fn, Admission, ManualTimeSource, NavigationMiddleware, SpamFilter,
    SpamFilterConfig, SystemTimeSource, TimeSource,
};
pub use params::{ParamValue, Params};
pub use reducer::NavigationDirection;
pub use state::{
    EntryId, FlowContext, ModalContext, NavState, NavigationEntry, PendingNavigation,
};
pub use transition::{
    should_exit_be_on_top, z_index, SlideDirection, Transition, TransitionState,
};
