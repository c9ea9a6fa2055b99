//! The navigation engine: single-writer pipeline around the reducer.
//!
//! [`NavigationEngine`] owns the immutable routing table, the registered
//! flows and deep-link aliases, the middleware chain, and the state cell.
//! Every mutation funnels through one async mutex:
//!
//! 1. a second navigation while the writer is held returns
//!    [`Dropped`](NavigationOutcome::Dropped) immediately;
//! 2. the spam filter may drop the transaction before it touches state;
//! 3. middleware `before` callbacks run (priority order);
//! 4. guards intercepting the target's graph are awaited — slower guards
//!    than the configured threshold get a synthetic loading-modal push;
//! 5. the reducer produces the successor snapshot, which is published
//!    atomically; listeners observe committed snapshots in commit order;
//! 6. middleware `after` callbacks run (reverse order).
//!
//! A commit that leaves the state `Animating` arms a safety timer: if the
//! host never reports the animation finished, the flag self-heals to `Idle`
//! after the expected duration plus the configured grace period.
//!
//! # Example
//!
//! ```no_run
//! use navigator_core::{Destination, Graph, NavigationEngine, Params};
//!
//! # async fn demo() -> Result<(), navigator_core::error::NavigationError> {
//! let engine = NavigationEngine::builder(
//!     Graph::builder("root")
//!         .entry(Destination::screen("home"))
//!         .destination(Destination::screen("profile/{userId}"))
//!         .build(),
//! )
//! .build()?;
//!
//! let outcome = engine
//!     .navigate(|tx| tx.navigate_to("profile/42", Params::new()))
//!     .await?;
//! assert!(outcome.is_success());
//! assert_eq!(engine.state().current_full_path(), "profile/42");
//! # Ok(())
//! # }
//! ```

use crate::deeplink::{DeepLinkAlias, DeepLinkRegistry};
use crate::destination::DestinationId;
use crate::error::{NavigationOutcome, NavigationResult};
use crate::flow::{FlowModification, FlowStep, GuidedFlowDefinition, StepSelector};
use crate::graph::{Graph, GraphId, RoutingTable};
use crate::guards::GuardOutcome;
use crate::intent::{
    NavTarget, NavigationIntent, NavigationRequest, Transaction, TransactionBuilder,
};
use crate::lifecycle::LifecycleTracker;
#[cfg(feature = "middleware")]
use crate::middleware::{
    Admission, NavigationMiddleware, SpamFilter, SpamFilterConfig, TimeSource,
};
use crate::params::Params;
use crate::reducer::{reduce, NavigationDirection, Reduced, ReducerContext};
use crate::state::{NavState, PendingNavigation};
use crate::transition::{should_exit_be_on_top, Transition, TransitionState};
use crate::url::parse_url_with_query_params;
use crate::{debug_log, error_log, info_log, warn_log};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Default grace period past the expected animation duration before the
/// transition flag self-heals.
pub const DEFAULT_SAFETY_TIMEOUT: Duration = Duration::from_secs(2);

/// Default guard latency above which the loading modal (when registered)
/// is shown.
pub const DEFAULT_GUARD_THRESHOLD: Duration = Duration::from_millis(150);

// ============================================================================
// Config
// ============================================================================

/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Guard latency above which the loading modal is pushed.
    pub guard_threshold: Duration,
    /// Grace period past the animation duration before self-healing.
    pub safety_timeout: Duration,
    /// Modal destination pushed while a slow guard is pending.
    pub loading_modal: Option<DestinationId>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            guard_threshold: DEFAULT_GUARD_THRESHOLD,
            safety_timeout: DEFAULT_SAFETY_TIMEOUT,
            loading_modal: None,
        }
    }
}

impl EngineConfig {
    /// Create a config with the library defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the guard loading-modal threshold.
    #[must_use]
    pub fn guard_threshold(mut self, threshold: Duration) -> Self {
        self.guard_threshold = threshold;
        self
    }

    /// Set the safety-timer grace period.
    #[must_use]
    pub fn safety_timeout(mut self, timeout: Duration) -> Self {
        self.safety_timeout = timeout;
        self
    }

    /// Register the loading modal destination.
    #[must_use]
    pub fn loading_modal(mut self, destination: DestinationId) -> Self {
        self.loading_modal = Some(destination);
        self
    }
}

// ============================================================================
// Events and listeners
// ============================================================================

/// What listeners receive on every committed transaction.
#[derive(Debug, Clone)]
pub struct NavigationEvent {
    /// Route before the commit.
    pub from: Option<String>,
    /// Route after the commit (params substituted).
    pub to: String,
    /// Push / pop / replace.
    pub direction: NavigationDirection,
    /// Enter transition of the new current entry.
    pub enter: Transition,
    /// Exit transition of the previous current entry.
    pub exit: Transition,
    /// Whether the outgoing entry should render above the incoming one.
    pub exit_on_top: bool,
}

/// Handle for unsubscribing a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn Fn(&NavigationEvent, &Arc<NavState>) + Send + Sync>;

// ============================================================================
// Builder
// ============================================================================

/// Builder assembling a [`NavigationEngine`].
#[must_use]
pub struct NavigationEngineBuilder {
    root: Graph,
    flows: HashMap<String, Arc<GuidedFlowDefinition>>,
    aliases: DeepLinkRegistry,
    config: EngineConfig,
    #[cfg(feature = "middleware")]
    middleware: Vec<Arc<dyn NavigationMiddleware>>,
    #[cfg(feature = "middleware")]
    spam: Option<SpamFilter>,
}

impl NavigationEngineBuilder {
    /// Register a guided-flow definition.
    pub fn flow(mut self, definition: GuidedFlowDefinition) -> Self {
        self.flows
            .insert(definition.id().to_string(), Arc::new(definition));
        self
    }

    /// Register a deep-link alias.
    pub fn deep_link(mut self, alias: DeepLinkAlias) -> Self {
        self.aliases.register(alias);
        self
    }

    /// Attach middleware.
    #[cfg(feature = "middleware")]
    pub fn middleware<M: NavigationMiddleware>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Enable the spam filter on the system clock.
    #[cfg(feature = "middleware")]
    pub fn spam_filter(self, config: SpamFilterConfig) -> Self {
        self.spam_filter_with_clock(config, Arc::new(crate::middleware::SystemTimeSource))
    }

    /// Enable the spam filter with an explicit clock (tests).
    #[cfg(feature = "middleware")]
    pub fn spam_filter_with_clock(
        mut self,
        config: SpamFilterConfig,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        self.spam = Some(SpamFilter::new(config, time));
        self
    }

    /// Set the engine config.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Compile the graph tree and seed the initial state.
    pub fn build(self) -> NavigationResult<Arc<NavigationEngine>> {
        let table = Arc::new(RoutingTable::build(self.root)?);
        let initial = Arc::new(NavState::seeded(table.clone())?);

        let engine = Arc::new_cyclic(|weak: &Weak<NavigationEngine>| NavigationEngine {
            weak: weak.clone(),
            table,
            flows: self.flows,
            aliases: self.aliases,
            config: self.config,
            #[cfg(feature = "middleware")]
            middleware: self.middleware,
            #[cfg(feature = "middleware")]
            spam: self.spam,
            writer: tokio::sync::Mutex::new(()),
            snapshot: RwLock::new(initial.clone()),
            lifecycle: LifecycleTracker::new(),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            animation_epoch: AtomicU64::new(0),
            #[cfg(feature = "cache")]
            resolution_cache: Mutex::new(crate::cache::ResolutionCache::new()),
        });

        engine.lifecycle.on_init(&initial);
        info_log!(
            "Navigation engine initialized at '{}'",
            initial.current_full_path()
        );
        Ok(engine)
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The single-writer navigation engine. Construct through
/// [`NavigationEngine::builder`] and share as `Arc`.
pub struct NavigationEngine {
    weak: Weak<NavigationEngine>,
    table: Arc<RoutingTable>,
    flows: HashMap<String, Arc<GuidedFlowDefinition>>,
    aliases: DeepLinkRegistry,
    config: EngineConfig,
    #[cfg(feature = "middleware")]
    middleware: Vec<Arc<dyn NavigationMiddleware>>,
    #[cfg(feature = "middleware")]
    spam: Option<SpamFilter>,
    writer: tokio::sync::Mutex<()>,
    snapshot: RwLock<Arc<NavState>>,
    lifecycle: LifecycleTracker,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener_id: AtomicU64,
    animation_epoch: AtomicU64,
    #[cfg(feature = "cache")]
    resolution_cache: Mutex<crate::cache::ResolutionCache>,
}

impl NavigationEngine {
    /// Start building an engine around a root graph.
    pub fn builder(root: Graph) -> NavigationEngineBuilder {
        NavigationEngineBuilder {
            root,
            flows: HashMap::new(),
            aliases: DeepLinkRegistry::new(),
            config: EngineConfig::default(),
            #[cfg(feature = "middleware")]
            middleware: Vec::new(),
            #[cfg(feature = "middleware")]
            spam: None,
        }
    }

    /// The current committed snapshot.
    pub fn state(&self) -> Arc<NavState> {
        self.snapshot.read().clone()
    }

    /// The shared routing table.
    pub fn routing_table(&self) -> &Arc<RoutingTable> {
        &self.table
    }

    /// Register a listener observing committed snapshots in commit order.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&NavigationEvent, &Arc<NavState>) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Box::new(listener)));
        id
    }

    /// Remove a listener.
    pub fn unsubscribe(&self, id: ListenerId) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    // ------------------------------------------------------------------
    // Consumer operations
    // ------------------------------------------------------------------

    /// Run a transaction assembled through the builder DSL.
    pub async fn navigate<F>(&self, build: F) -> NavigationResult<NavigationOutcome>
    where
        F: FnOnce(TransactionBuilder) -> TransactionBuilder,
    {
        let transaction = build(TransactionBuilder::new()).build()?;
        self.execute(transaction).await
    }

    /// Dispatch a single action.
    pub async fn dispatch(&self, intent: NavigationIntent) -> NavigationResult<NavigationOutcome> {
        self.execute(Transaction::single(intent)).await
    }

    /// Pop the top entry (restoring a pending modal if one applies).
    pub async fn navigate_back(&self) -> NavigationResult<NavigationOutcome> {
        self.dispatch(NavigationIntent::Back).await
    }

    /// Navigate a deep link (`path?query`), applying registered aliases.
    pub async fn navigate_deep_link(
        &self,
        path: impl Into<String>,
    ) -> NavigationResult<NavigationOutcome> {
        self.dispatch(NavigationIntent::DeepLink { path: path.into() })
            .await
    }

    /// Resume the stored pending navigation, clearing it on success.
    /// Returns `Dropped` when nothing is pending.
    pub async fn resume_pending_navigation(&self) -> NavigationResult<NavigationOutcome> {
        let Some(pending) = self.state().pending_navigation().cloned() else {
            debug_log!("resume_pending_navigation: nothing pending");
            return Ok(NavigationOutcome::Dropped);
        };

        let transaction = Transaction::atomic(vec![
            NavigationIntent::Navigate {
                target: NavTarget::Route(pending.route),
                params: pending.params,
                replace_current: false,
                forward_params: false,
            },
            NavigationIntent::ClearPendingNavigation,
        ]);
        self.execute(transaction).await
    }

    /// Begin a guided flow (no-op if one is already active).
    pub async fn start_guided_flow(
        &self,
        flow_id: impl Into<String>,
        params: Params,
    ) -> NavigationResult<NavigationOutcome> {
        self.dispatch(NavigationIntent::StartGuidedFlow {
            flow_id: flow_id.into(),
            params,
        })
        .await
    }

    /// Advance the active guided flow.
    pub async fn next_guided_flow_step(
        &self,
        params: Params,
    ) -> NavigationResult<NavigationOutcome> {
        self.dispatch(NavigationIntent::NextStep { params }).await
    }

    /// Rewind the active guided flow.
    pub async fn previous_guided_flow_step(&self) -> NavigationResult<NavigationOutcome> {
        self.dispatch(NavigationIntent::PreviousStep).await
    }

    /// Run a guided-flow modification block as one atomic batch producing a
    /// single observable state transition.
    pub async fn guided_flow<F>(
        &self,
        flow_id: impl Into<String>,
        build: F,
    ) -> NavigationResult<NavigationOutcome>
    where
        F: FnOnce(GuidedFlowScope) -> GuidedFlowScope,
    {
        let scope = build(GuidedFlowScope::new(flow_id.into()));
        if scope.intents.is_empty() {
            return Ok(NavigationOutcome::Success);
        }
        self.execute(Transaction::atomic(scope.intents)).await
    }

    /// Reset to the initial state: the back-stack is re-seeded from the root
    /// entry, the active flow is cancelled, and the pending navigation is
    /// cleared. Removal hooks fire for the whole pre-reset stack, then
    /// created hooks for the post-reset stack.
    pub async fn reset(&self) -> NavigationResult<()> {
        let _permit = self.writer.lock().await;
        let previous = self.state();
        let fresh = Arc::new(NavState::seeded(self.table.clone())?);

        self.animation_epoch.fetch_add(1, Ordering::Relaxed);
        *self.snapshot.write() = fresh.clone();
        self.lifecycle.on_reset(&previous, &fresh);
        info_log!("Navigation state reset to '{}'", fresh.current_full_path());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------

    async fn execute(&self, transaction: Transaction) -> NavigationResult<NavigationOutcome> {
        // Single writer: a second navigation attempt while the mutex is
        // held (e.g. a suspended guard) drops immediately.
        let Ok(_permit) = self.writer.try_lock() else {
            warn_log!("Navigation dropped: another navigation holds the writer");
            return Ok(NavigationOutcome::Dropped);
        };

        let current = self.state();

        #[cfg(feature = "middleware")]
        if let Some(filter) = &self.spam {
            if let Admission::Block { reason } = filter.admit(&transaction, &current) {
                debug_log!("Navigation dropped by spam filter: {}", reason);
                return Ok(NavigationOutcome::Dropped);
            }
        }

        let (request, effective_graph) = self.build_request(&current, &transaction)?;
        #[cfg(not(feature = "guard"))]
        let _ = &effective_graph;

        #[cfg(feature = "middleware")]
        self.run_before_middleware(&request);

        #[cfg(feature = "guard")]
        let (verdict, loading_shown) = self
            .run_guards(&request, effective_graph.as_ref(), &current)
            .await;
        #[cfg(not(feature = "guard"))]
        let (verdict, loading_shown) = (GuardOutcome::Allow, false);

        let outcome = self
            .apply_verdict(transaction, verdict, loading_shown, &request)
            .await;

        #[cfg(feature = "middleware")]
        if let Ok(outcome) = &outcome {
            self.run_after_middleware(&request, outcome);
        }

        outcome
    }

    /// Resolve the batch's primary target up front: guards and middleware
    /// see the canonical route and merged params the entry would carry.
    fn build_request(
        &self,
        current: &Arc<NavState>,
        transaction: &Transaction,
    ) -> NavigationResult<(NavigationRequest, Option<GraphId>)> {
        let from = current.current_full_path();

        match transaction.primary_target() {
            Some(NavigationIntent::Navigate {
                target,
                params,
                forward_params,
                ..
            }) => {
                let preferred = current.current().graph_id().clone();
                let resolution = self.resolve_target(target, Some(&preferred))?;
                let canonical = self
                    .table
                    .full_path(resolution.destination.id())
                    .unwrap_or_else(|| resolution.destination.route())
                    .to_string();
                let forwarded = if *forward_params {
                    current.current().params().clone()
                } else {
                    Params::new()
                };
                let merged = Params::layered([&forwarded, &resolution.path_params, params]);
                Ok((
                    NavigationRequest::with_from(canonical, from).with_params(merged),
                    Some(resolution.graph_id),
                ))
            }
            Some(NavigationIntent::DeepLink { path }) => {
                let (clean, query) = parse_url_with_query_params(path);
                let (route, params) = self
                    .aliases
                    .rewrite(&clean, &query)
                    .unwrap_or((clean, query));
                let resolution = crate::resolve::resolve_route(&self.table, &route, None)?;
                let canonical = self
                    .table
                    .full_path(resolution.destination.id())
                    .unwrap_or_else(|| resolution.destination.route())
                    .to_string();
                let merged = Params::merge(&resolution.path_params, &params);
                Ok((
                    NavigationRequest::with_from(canonical, from).with_params(merged),
                    Some(resolution.graph_id),
                ))
            }
            _ => Ok((
                NavigationRequest::with_from(from.clone(), from),
                None,
            )),
        }
    }

    /// Resolve a navigate target, going through the LRU cache when the
    /// `cache` feature is enabled (the table is immutable, so cached
    /// resolutions never go stale).
    fn resolve_target(
        &self,
        target: &NavTarget,
        preferred: Option<&GraphId>,
    ) -> NavigationResult<crate::resolve::Resolution> {
        #[cfg(feature = "cache")]
        if let NavTarget::Route(route) = target {
            if let Some(hit) = self.resolution_cache.lock().get(route, preferred) {
                return Ok(hit);
            }
            let resolution = crate::resolve::resolve(&self.table, target, preferred)?;
            self.resolution_cache
                .lock()
                .put(route, preferred, resolution.clone());
            return Ok(resolution);
        }
        crate::resolve::resolve(&self.table, target, preferred)
    }

    /// Hit/miss counters of the resolution cache.
    #[cfg(feature = "cache")]
    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.resolution_cache.lock().stats().clone()
    }

    #[cfg(feature = "middleware")]
    fn run_before_middleware(&self, request: &NavigationRequest) {
        let mut ordered: Vec<_> = self.middleware.iter().collect();
        ordered.sort_by_key(|m| std::cmp::Reverse(m.priority()));
        for middleware in ordered {
            middleware.before_navigation(request);
        }
    }

    #[cfg(feature = "middleware")]
    fn run_after_middleware(&self, request: &NavigationRequest, outcome: &NavigationOutcome) {
        let mut ordered: Vec<_> = self.middleware.iter().collect();
        ordered.sort_by_key(|m| m.priority());
        for middleware in ordered {
            middleware.after_navigation(request, outcome);
        }
    }

    /// Await the interceptors for the target graph. Returns the verdict and
    /// whether the loading modal was pushed meanwhile.
    #[cfg(feature = "guard")]
    async fn run_guards(
        &self,
        request: &NavigationRequest,
        effective_graph: Option<&GraphId>,
        current: &Arc<NavState>,
    ) -> (GuardOutcome, bool) {
        let Some(graph) = effective_graph else {
            return (GuardOutcome::Allow, false);
        };
        let guards = self.table.guards_for(graph);
        if guards.is_empty() {
            return (GuardOutcome::Allow, false);
        }

        let check = async {
            for guard in &guards {
                let outcome = guard.check(request).await;
                debug_log!("Guard '{}' returned {:?}", guard.name(), outcome);
                if !outcome.is_allow() {
                    return outcome;
                }
            }
            GuardOutcome::Allow
        };
        tokio::pin!(check);

        let mut loading_shown = false;
        let verdict = tokio::select! {
            outcome = &mut check => outcome,
            () = tokio::time::sleep(self.config.guard_threshold) => {
                if let Some(loading) = self.config.loading_modal {
                    debug_log!("Guard exceeded threshold; showing loading modal");
                    loading_shown = self.commit_interim_loading(current, loading);
                }
                check.await
            }
        };
        (verdict, loading_shown)
    }

    /// Push the loading modal as an ordinary committed transaction so
    /// listeners and lifecycle hooks observe it like any other entry.
    #[cfg(feature = "guard")]
    fn commit_interim_loading(&self, current: &Arc<NavState>, loading: DestinationId) -> bool {
        let ctx = self.reducer_context();
        let push = Transaction::atomic(vec![NavigationIntent::Navigate {
            target: NavTarget::Destination(loading),
            params: Params::new(),
            replace_current: false,
            forward_params: false,
        }]);
        match reduce(&ctx, current, &push) {
            Ok(reduced) => {
                self.commit(current, reduced);
                true
            }
            Err(err) => {
                error_log!("Failed to push loading modal: {}", err);
                false
            }
        }
    }

    async fn apply_verdict(
        &self,
        transaction: Transaction,
        verdict: GuardOutcome,
        loading_shown: bool,
        request: &NavigationRequest,
    ) -> NavigationResult<NavigationOutcome> {
        use GuardOutcome as V;

        let cleanup = |intents: Vec<NavigationIntent>| -> Transaction {
            if loading_shown {
                let mut all = vec![NavigationIntent::Back];
                all.extend(intents);
                Transaction::atomic(all)
            } else {
                Transaction::atomic(intents)
            }
        };

        match verdict {
            V::Allow => {
                let final_tx = if loading_shown {
                    cleanup(transaction.into_intents())
                } else {
                    transaction
                };
                self.reduce_and_commit(&final_tx).await?;
                Ok(NavigationOutcome::Success)
            }
            V::Reject => {
                if loading_shown {
                    let back = Transaction::atomic(vec![NavigationIntent::Back]);
                    self.reduce_and_commit(&back).await?;
                }
                debug_log!("Navigation to '{}' rejected by guard", request.to);
                Ok(NavigationOutcome::Rejected)
            }
            V::RedirectTo { route } => {
                let redirect = cleanup(vec![NavigationIntent::Navigate {
                    target: NavTarget::Route(route.clone()),
                    params: Params::new(),
                    replace_current: false,
                    forward_params: false,
                }]);
                self.reduce_and_commit(&redirect).await?;
                Ok(NavigationOutcome::Redirected { route })
            }
            V::PendAndRedirectTo {
                route,
                metadata,
                display_hint,
            } => {
                let pending = PendingNavigation {
                    route: request.to.clone(),
                    params: request.params.clone(),
                    metadata,
                    display_hint,
                };
                let redirect = cleanup(vec![NavigationIntent::Navigate {
                    target: NavTarget::Route(route.clone()),
                    params: Params::new(),
                    replace_current: false,
                    forward_params: false,
                }]);
                self.reduce_and_commit_with(&redirect, |state| {
                    state.pending = Some(pending.clone());
                })
                .await?;
                info_log!(
                    "Navigation to '{}' pended, redirected to '{}'",
                    request.to,
                    route
                );
                Ok(NavigationOutcome::Redirected { route })
            }
        }
    }

    fn reducer_context(&self) -> ReducerContext<'_> {
        ReducerContext {
            table: &self.table,
            flows: &self.flows,
            aliases: &self.aliases,
        }
    }

    async fn reduce_and_commit(&self, transaction: &Transaction) -> NavigationResult<()> {
        self.reduce_and_commit_with(transaction, |_| {}).await
    }

    /// Reduce, post-process the successor state, publish, then run any
    /// follow-up batch and teardown policy inside the same writer hold.
    async fn reduce_and_commit_with<F>(
        &self,
        transaction: &Transaction,
        post: F,
    ) -> NavigationResult<()>
    where
        F: FnOnce(&mut NavState),
    {
        let ctx = self.reducer_context();
        let current = self.state();
        let mut reduced = reduce(&ctx, &current, transaction)?;
        post(&mut reduced.state);

        let follow_up = reduced.follow_up.take();
        let pending_policy = reduced.pending_policy.take();

        if follow_up.is_none() {
            if let Some((flow_id, policy)) = &pending_policy {
                apply_clear_policy(&mut reduced.state, flow_id, *policy);
            }
        }

        let committed = self.commit(&current, reduced);

        if let Some(follow_up) = follow_up {
            match reduce(&ctx, &committed, &follow_up) {
                Ok(mut reduced) => {
                    if let Some((flow_id, policy)) = &pending_policy {
                        apply_clear_policy(&mut reduced.state, flow_id, *policy);
                    }
                    self.commit(&committed, reduced);
                }
                Err(err) => {
                    error_log!("On-complete follow-up batch failed: {}", err);
                    if let Some((flow_id, policy)) = &pending_policy {
                        let mut healed = (*self.state()).clone();
                        apply_clear_policy(&mut healed, flow_id, *policy);
                        *self.snapshot.write() = Arc::new(healed);
                    }
                }
            }
        }
        Ok(())
    }

    /// Publish a successor snapshot: swap the cell, diff lifecycles, notify
    /// listeners, and arm the safety timer when the commit animates.
    fn commit(&self, previous: &Arc<NavState>, reduced: Reduced) -> Arc<NavState> {
        let enter = reduced.state.current().destination().enter();
        let exit = previous.current().destination().exit();

        let next = Arc::new(reduced.state);
        *self.snapshot.write() = next.clone();

        let epoch = self.animation_epoch.fetch_add(1, Ordering::Relaxed) + 1;

        self.lifecycle.on_commit(previous, &next);

        if reduced.route_changed {
            let event = NavigationEvent {
                from: Some(previous.current_full_path()),
                to: next.current_full_path(),
                direction: reduced.direction,
                enter,
                exit,
                exit_on_top: should_exit_be_on_top(enter, exit),
            };
            for (_, listener) in self.listeners.lock().iter() {
                listener(&event, &next);
            }
        }

        if next.transition_state().is_animating() {
            self.arm_safety_timer(epoch, enter.duration().max(exit.duration()));
        }

        next
    }

    /// Self-heal the transition flag if the host never reports the animation
    /// finished.
    fn arm_safety_timer(&self, epoch: u64, animation: Duration) {
        let weak = self.weak.clone();
        let deadline = animation + self.config.safety_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            let Some(engine) = weak.upgrade() else {
                return;
            };
            if engine.animation_epoch.load(Ordering::Relaxed) != epoch {
                return; // a later commit superseded this animation
            }
            let _permit = engine.writer.lock().await;
            let current = engine.state();
            if current.transition_state().is_animating() {
                warn_log!("Safety timeout tripped; transition state reset to IDLE");
                let mut healed = (*current).clone();
                healed.transition_state = TransitionState::Idle;
                *engine.snapshot.write() = Arc::new(healed);
            }
        });
    }
}

fn apply_clear_policy(
    state: &mut NavState,
    flow_id: &str,
    policy: crate::flow::ClearModificationsPolicy,
) {
    use crate::flow::ClearModificationsPolicy as P;
    match policy {
        P::ClearSpecific => {
            state.flow_modifications.remove(flow_id);
        }
        P::ClearAll => state.flow_modifications.clear(),
        P::ClearNone => {}
    }
}

// ============================================================================
// Guided-flow scope
// ============================================================================

/// Collects guided-flow modifications (and an optional step advance) into
/// one atomic batch.
#[must_use]
pub struct GuidedFlowScope {
    flow_id: String,
    intents: Vec<NavigationIntent>,
}

impl GuidedFlowScope {
    fn new(flow_id: String) -> Self {
        Self {
            flow_id,
            intents: Vec::new(),
        }
    }

    fn modify(mut self, modification: FlowModification) -> Self {
        self.intents.push(NavigationIntent::ModifyGuidedFlow {
            flow_id: self.flow_id.clone(),
            modification,
        });
        self
    }

    /// Patch params for the selected step(s).
    pub fn update_step_params(self, selector: StepSelector, patch: Params) -> Self {
        self.modify(FlowModification::UpdateStepParams { selector, patch })
    }

    /// Replace the step at `index`.
    pub fn replace_step(self, index: usize, step: FlowStep) -> Self {
        self.modify(FlowModification::ReplaceStep { index, step })
    }

    /// Insert steps at `insert_at`.
    pub fn add_steps(self, steps: Vec<FlowStep>, insert_at: usize) -> Self {
        self.modify(FlowModification::AddSteps { steps, insert_at })
    }

    /// Remove the steps at the given indices.
    pub fn remove_steps(self, indices: Vec<usize>) -> Self {
        self.modify(FlowModification::RemoveSteps { indices })
    }

    /// Replace the flow's completion callback.
    pub fn update_on_complete<F>(self, callback: F) -> Self
    where
        F: Fn(&NavState) -> Option<Transaction> + Send + Sync + 'static,
    {
        self.modify(FlowModification::UpdateOnComplete {
            callback: Arc::new(callback),
        })
    }

    /// Advance the flow as part of this atomic batch.
    pub fn next_step(mut self, params: Params) -> Self {
        self.intents.push(NavigationIntent::NextStep { params });
        self
    }

    /// Rewind the flow as part of this atomic batch.
    pub fn previous_step(mut self) -> Self {
        self.intents.push(NavigationIntent::PreviousStep);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Destination;

    fn engine() -> Arc<NavigationEngine> {
        NavigationEngine::builder(
            Graph::builder("root")
                .entry(Destination::screen("home"))
                .destination(Destination::screen("profile/{userId}"))
                .destination(Destination::screen("videos"))
                .build(),
        )
        .build()
        .unwrap()
    }

    #[tokio::test]
    async fn test_navigate_success() {
        let engine = engine();
        let outcome = engine
            .navigate(|tx| tx.navigate_to("videos", Params::new()))
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(engine.state().current_full_path(), "videos");
        assert_eq!(engine.state().depth(), 2);
    }

    #[tokio::test]
    async fn test_navigate_with_path_params() {
        let engine = engine();
        engine
            .navigate(|tx| tx.navigate_to("profile/42", Params::new()))
            .await
            .unwrap();

        let state = engine.state();
        assert_eq!(state.current().params().get_str("userId"), Some("42"));
        assert_eq!(state.current_full_path(), "profile/42");
        assert_eq!(state.current_path_segments(), vec!["profile", "42"]);
    }

    #[tokio::test]
    async fn test_navigate_back_pops() {
        let engine = engine();
        engine
            .navigate(|tx| tx.navigate_to("videos", Params::new()))
            .await
            .unwrap();
        let outcome = engine.navigate_back().await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(engine.state().current_full_path(), "home");
    }

    #[tokio::test]
    async fn test_back_on_root_is_noop() {
        let engine = engine();
        engine.navigate_back().await.unwrap();
        assert_eq!(engine.state().depth(), 1);
        assert_eq!(engine.state().current_full_path(), "home");
    }

    #[tokio::test]
    async fn test_unknown_route_leaves_state_untouched() {
        let engine = engine();
        let err = engine
            .navigate(|tx| tx.navigate_to("nowhere", Params::new()))
            .await
            .unwrap_err();

        assert!(err.is_route_not_found());
        assert_eq!(engine.state().depth(), 1);
    }

    #[tokio::test]
    async fn test_listeners_observe_commits() {
        use std::sync::Mutex as StdMutex;

        let engine = engine();
        let seen: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let id = engine.subscribe(move |event, _state| {
            sink.lock().unwrap().push(event.to.clone());
        });

        engine
            .navigate(|tx| tx.navigate_to("videos", Params::new()))
            .await
            .unwrap();
        engine.navigate_back().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["videos", "home"]);

        engine.unsubscribe(id);
        engine
            .navigate(|tx| tx.navigate_to("videos", Params::new()))
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_resume_without_pending_drops() {
        let engine = engine();
        let outcome = engine.resume_pending_navigation().await.unwrap();
        assert!(outcome.is_dropped());
    }

    #[tokio::test]
    async fn test_reset_reseeds() {
        let engine = engine();
        engine
            .navigate(|tx| tx.navigate_to("videos", Params::new()))
            .await
            .unwrap();
        engine.reset().await.unwrap();

        let state = engine.state();
        assert_eq!(state.depth(), 1);
        assert_eq!(state.current_full_path(), "home");
        assert!(state.pending_navigation().is_none());
        assert!(state.guided_flow_state().is_none());
    }

    #[tokio::test]
    async fn test_update_transition_state_dispatch() {
        let engine = engine();
        engine
            .dispatch(NavigationIntent::UpdateTransitionState {
                state: TransitionState::Animating,
            })
            .await
            .unwrap();
        assert!(engine.state().transition_state().is_animating());

        engine
            .dispatch(NavigationIntent::UpdateTransitionState {
                state: TransitionState::Idle,
            })
            .await
            .unwrap();
        assert!(!engine.state().transition_state().is_animating());
    }
}
