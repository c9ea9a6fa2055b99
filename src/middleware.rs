//! Navigation middleware and spam filtering.
//!
//! Middleware runs **before** and **after** each committed transaction.
//! Unlike guards (which decide *if* navigation happens), middleware handles
//! cross-cutting side effects: logging, analytics, context setup, cleanup.
//!
//! # Execution order
//!
//! When multiple middleware are attached, they execute in **priority order**
//! (higher [`priority`](NavigationMiddleware::priority) first) for
//! `before_navigation`, and in reverse order for `after_navigation` (onion
//! model).
//!
//! # Spam filtering
//!
//! [`SpamFilter`] is the engine's built-in admission middleware. It drops:
//!
//! - repeat `NextStep` actions for the same flow inside the debounce window
//!   (once the clock has actually advanced — same-tick bursts are governed
//!   by the rolling window instead);
//! - anything beyond `max_actions_per_window` accepted actions within a
//!   rolling window;
//! - any non-atomic transaction while the transition state is `Animating`.
//!
//! Actions emitted from a single atomic batch count as **one** unit and
//! never block each other. Time is read through a [`TimeSource`] so tests
//! can drive the clock by hand.

use crate::error::NavigationOutcome;
use crate::intent::{NavigationIntent, NavigationRequest, Transaction};
use crate::state::NavState;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

// ============================================================================
// NavigationMiddleware trait
// ============================================================================

/// Middleware that observes transactions around the commit point.
///
/// # Example
///
/// ```
/// use navigator_core::{NavigationMiddleware, NavigationRequest};
/// use navigator_core::error::NavigationOutcome;
///
/// struct AnalyticsMiddleware;
///
/// impl NavigationMiddleware for AnalyticsMiddleware {
///     fn before_navigation(&self, request: &NavigationRequest) {
///         println!("Tracking page view: {}", request.to);
///     }
///
///     fn after_navigation(&self, request: &NavigationRequest, outcome: &NavigationOutcome) {
///         println!("Navigated to {} ({outcome:?})", request.to);
///     }
/// }
/// ```
pub trait NavigationMiddleware: Send + Sync + 'static {
    /// Called before the transaction reaches the guard runner.
    fn before_navigation(&self, request: &NavigationRequest);

    /// Called after the transaction resolved, with its outcome.
    fn after_navigation(&self, request: &NavigationRequest, outcome: &NavigationOutcome);

    /// Middleware name for debugging.
    fn name(&self) -> &'static str {
        "NavigationMiddleware"
    }

    /// Middleware priority (higher runs first for `before`, last for `after`).
    fn priority(&self) -> i32 {
        0
    }
}

/// Create middleware from two closures (before and after).
///
/// # Example
///
/// ```
/// use navigator_core::middleware_fn;
///
/// let mw = middleware_fn(
///     |request| println!("Before: {}", request.to),
///     |request, outcome| println!("After: {} ({outcome:?})", request.to),
/// );
/// ```
pub const fn middleware_fn<B, A>(before: B, after: A) -> FnMiddleware<B, A>
where
    B: Fn(&NavigationRequest) + Send + Sync + 'static,
    A: Fn(&NavigationRequest, &NavigationOutcome) + Send + Sync + 'static,
{
    FnMiddleware { before, after }
}

/// Middleware created from two closures via [`middleware_fn`].
pub struct FnMiddleware<B, A> {
    before: B,
    after: A,
}

impl<B, A> NavigationMiddleware for FnMiddleware<B, A>
where
    B: Fn(&NavigationRequest) + Send + Sync + 'static,
    A: Fn(&NavigationRequest, &NavigationOutcome) + Send + Sync + 'static,
{
    fn before_navigation(&self, request: &NavigationRequest) {
        (self.before)(request);
    }

    fn after_navigation(&self, request: &NavigationRequest, outcome: &NavigationOutcome) {
        (self.after)(request, outcome);
    }
}

// ============================================================================
// TimeSource
// ============================================================================

/// Clock abstraction so spam-filter behavior is testable.
pub trait TimeSource: Send + Sync + 'static {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// Wall-clock time source (the production default).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Hand-driven time source for tests.
#[derive(Debug)]
pub struct ManualTimeSource {
    now: Mutex<Instant>,
}

impl ManualTimeSource {
    /// Create a manual clock anchored at the current instant.
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Advance the clock.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

// ============================================================================
// SpamFilter
// ============================================================================

/// Default debounce window for repeat `NextStep` actions.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Default cap on accepted actions per rolling window.
pub const DEFAULT_MAX_ACTIONS_PER_WINDOW: usize = 3;

/// Default rolling window size.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(1000);

/// Tuning knobs for the spam filter.
#[derive(Debug, Clone, Copy)]
pub struct SpamFilterConfig {
    /// Minimum spacing between accepted `NextStep` actions for one flow.
    pub debounce: Duration,
    /// Accepted-action cap within the rolling window.
    pub max_actions_per_window: usize,
    /// Rolling window size.
    pub window: Duration,
}

impl Default for SpamFilterConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            max_actions_per_window: DEFAULT_MAX_ACTIONS_PER_WINDOW,
            window: DEFAULT_WINDOW,
        }
    }
}

/// The filter's verdict for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Let the transaction through.
    Admit,
    /// Drop it before it touches state.
    Block {
        /// Why the transaction was dropped.
        reason: String,
    },
}

impl Admission {
    /// Check if the transaction was admitted.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit)
    }

    fn block(reason: impl Into<String>) -> Self {
        Self::Block {
            reason: reason.into(),
        }
    }
}

#[derive(Default)]
struct SpamWindow {
    accepted: VecDeque<Instant>,
    last_step_accept: HashMap<String, Instant>,
}

/// Admission middleware dropping redundant or too-rapid transactions.
pub struct SpamFilter {
    config: SpamFilterConfig,
    time: std::sync::Arc<dyn TimeSource>,
    window: Mutex<SpamWindow>,
}

impl SpamFilter {
    /// Create a filter with the given config and clock.
    pub fn new(config: SpamFilterConfig, time: std::sync::Arc<dyn TimeSource>) -> Self {
        Self {
            config,
            time,
            window: Mutex::new(SpamWindow::default()),
        }
    }

    /// Create a filter with default config on the system clock.
    pub fn with_defaults() -> Self {
        Self::new(SpamFilterConfig::default(), std::sync::Arc::new(SystemTimeSource))
    }

    /// Decide whether a transaction may proceed, recording it when admitted.
    /// A whole batch counts as one action.
    pub fn admit(&self, transaction: &Transaction, state: &NavState) -> Admission {
        if !transaction.is_atomic() && state.transition_state().is_animating() {
            return Admission::block("transition in flight");
        }

        let now = self.time.now();
        let mut window = self.window.lock();

        while let Some(front) = window.accepted.front() {
            if now.saturating_duration_since(*front) >= self.config.window {
                window.accepted.pop_front();
            } else {
                break;
            }
        }

        if window.accepted.len() >= self.config.max_actions_per_window {
            return Admission::block(format!(
                "rate limit: {} actions within {:?}",
                self.config.max_actions_per_window, self.config.window
            ));
        }

        let step_flow = transaction
            .intents()
            .iter()
            .any(|i| matches!(i, NavigationIntent::NextStep { .. }))
            .then(|| state.guided_flow_state().map(|f| f.flow_id.clone()))
            .flatten();

        if let Some(flow_id) = &step_flow {
            if let Some(last) = window.last_step_accept.get(flow_id) {
                let elapsed = now.saturating_duration_since(*last);
                // Same-tick bursts fall through to the window cap.
                if elapsed > Duration::ZERO && elapsed < self.config.debounce {
                    return Admission::block(format!(
                        "next_step for '{flow_id}' debounced ({elapsed:?})"
                    ));
                }
            }
        }

        window.accepted.push_back(now);
        if let Some(flow_id) = step_flow {
            window.last_step_accept.insert(flow_id, now);
        }
        Admission::Admit
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Destination;
    use crate::flow::GuidedFlowState;
    use crate::graph::Graph;
    use crate::intent::TransactionBuilder;
    use crate::params::Params;
    use crate::state::NavState;
    use crate::transition::TransitionState;
    use std::sync::Arc;

    fn idle_state() -> NavState {
        let table = Arc::new(
            Graph::builder("root")
                .entry(Destination::screen("home"))
                .build()
                .into_table()
                .unwrap(),
        );
        NavState::seeded(table).unwrap()
    }

    fn flow_state() -> NavState {
        let mut state = idle_state();
        state.active_flow = Some(GuidedFlowState::begin("signup", 5));
        state
    }

    fn next_step_tx() -> Transaction {
        Transaction::single(NavigationIntent::NextStep {
            params: Params::new(),
        })
    }

    fn navigate_tx() -> Transaction {
        TransactionBuilder::new()
            .navigate_to("home", Params::new())
            .build()
            .unwrap()
    }

    fn filter(time: Arc<ManualTimeSource>) -> SpamFilter {
        SpamFilter::new(
            SpamFilterConfig {
                debounce: Duration::from_millis(300),
                max_actions_per_window: 3,
                window: Duration::from_millis(1000),
            },
            time,
        )
    }

    #[test]
    fn test_window_caps_same_tick_burst() {
        let time = Arc::new(ManualTimeSource::new());
        let filter = filter(time.clone());
        let state = flow_state();

        let admitted = (0..10)
            .filter(|_| filter.admit(&next_step_tx(), &state).is_admitted())
            .count();
        assert_eq!(admitted, 3);

        // A full window later, one more action fits.
        time.advance(Duration::from_millis(1000));
        assert!(filter.admit(&next_step_tx(), &state).is_admitted());

        // 100 ms on, the debounce window applies again.
        time.advance(Duration::from_millis(100));
        assert!(!filter.admit(&next_step_tx(), &state).is_admitted());
    }

    #[test]
    fn test_debounce_blocks_rapid_steps() {
        let time = Arc::new(ManualTimeSource::new());
        let filter = filter(time.clone());
        let state = flow_state();

        assert!(filter.admit(&next_step_tx(), &state).is_admitted());

        // 100 ms later: inside the debounce window.
        time.advance(Duration::from_millis(100));
        assert!(!filter.admit(&next_step_tx(), &state).is_admitted());

        // 300 ms after the accept: debounce satisfied.
        time.advance(Duration::from_millis(200));
        assert!(filter.admit(&next_step_tx(), &state).is_admitted());
    }

    #[test]
    fn test_debounce_ignores_plain_navigations() {
        let time = Arc::new(ManualTimeSource::new());
        let filter = filter(time.clone());
        let state = flow_state();

        assert!(filter.admit(&navigate_tx(), &state).is_admitted());
        time.advance(Duration::from_millis(50));
        assert!(filter.admit(&navigate_tx(), &state).is_admitted());
    }

    #[test]
    fn test_animating_blocks_non_atomic() {
        let time = Arc::new(ManualTimeSource::new());
        let filter = filter(time);
        let mut state = idle_state();
        state.transition_state = TransitionState::Animating;

        assert!(!filter.admit(&navigate_tx(), &state).is_admitted());

        let atomic = Transaction::atomic(navigate_tx().into_intents());
        assert!(filter.admit(&atomic, &state).is_admitted());
    }

    #[test]
    fn test_middleware_fn_closures() {
        use std::sync::Mutex as StdMutex;

        let calls: Arc<StdMutex<Vec<String>>> = Arc::new(StdMutex::new(Vec::new()));
        let before_calls = calls.clone();
        let after_calls = calls.clone();

        let mw = middleware_fn(
            move |req| before_calls.lock().unwrap().push(format!("B:{}", req.to)),
            move |req, _outcome| after_calls.lock().unwrap().push(format!("A:{}", req.to)),
        );

        let request = NavigationRequest::new("page");
        mw.before_navigation(&request);
        mw.after_navigation(&request, &NavigationOutcome::Success);

        assert_eq!(*calls.lock().unwrap(), vec!["B:page", "A:page"]);
        assert_eq!(mw.name(), "NavigationMiddleware");
        assert_eq!(mw.priority(), 0);
    }
}
