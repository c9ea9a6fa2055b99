//! Navigation intents and the transaction builder.
//!
//! Every change to navigation state travels as a [`Transaction`] — an
//! ordered batch of [`NavigationIntent`]s applied atomically by the reducer.
//! The [`TransactionBuilder`] is the fluent DSL consumers use to assemble a
//! batch; [`TransactionBuilder::build`] validates mutually exclusive
//! combinations before anything reaches the reducer.
//!
//! # Example
//!
//! ```
//! use navigator_core::{Params, TransactionBuilder};
//!
//! let tx = TransactionBuilder::new()
//!     .pop_up_to("home", false)
//!     .navigate_to("profile/{userId}", Params::from_pairs([("userId", "42")]))
//!     .build()
//!     .unwrap();
//! assert_eq!(tx.intents().len(), 2);
//! ```
//!
//! Invalid combinations fail with
//! [`InvalidConfiguration`](crate::error::NavigationError::InvalidConfiguration):
//!
//! ```
//! use navigator_core::{Params, TransactionBuilder};
//!
//! let err = TransactionBuilder::new()
//!     .clear_back_stack()
//!     .pop_up_to("home", false)
//!     .navigate_to("profile", Params::new())
//!     .build()
//!     .unwrap_err();
//! assert!(err.is_invalid_configuration());
//! ```

use crate::destination::DestinationId;
use crate::error::{NavigationError, NavigationResult};
use crate::flow::FlowModification;
use crate::params::Params;
use crate::transition::TransitionState;
use std::fmt;

// ============================================================================
// NavigationRequest
// ============================================================================

/// Description of an in-flight navigation, passed to guards and middleware
/// so they can inspect the source and destination.
#[derive(Clone)]
pub struct NavigationRequest {
    /// Canonical route we are navigating from (if any).
    pub from: Option<String>,

    /// Canonical route we are navigating to.
    pub to: String,

    /// Merged parameters the target entry will carry.
    pub params: Params,
}

impl NavigationRequest {
    /// Create a new navigation request.
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            from: None,
            to: to.into(),
            params: Params::new(),
        }
    }

    /// Create a navigation request with a source route.
    pub fn with_from(to: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            from: Some(from.into()),
            to: to.into(),
            params: Params::new(),
        }
    }

    /// Attach parameters.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

impl fmt::Debug for NavigationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationRequest")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Intents
// ============================================================================

/// Target of a navigate intent: a partial route string or a destination
/// referenced by stable identity (object-based navigation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavTarget {
    /// Partial route string (`"profile"`, `"workspace/home"`, …).
    Route(String),
    /// Destination identity; the routing table supplies the canonical path.
    Destination(DestinationId),
}

impl From<&str> for NavTarget {
    fn from(s: &str) -> Self {
        Self::Route(s.to_string())
    }
}

impl From<String> for NavTarget {
    fn from(s: String) -> Self {
        Self::Route(s)
    }
}

impl From<DestinationId> for NavTarget {
    fn from(id: DestinationId) -> Self {
        Self::Destination(id)
    }
}

/// A single step of a transaction. The action taxonomy is also dispatchable
/// directly through [`NavigationEngine::dispatch`](crate::engine::NavigationEngine::dispatch).
pub enum NavigationIntent {
    /// Resolve `target` and push (or replace with) a new entry.
    Navigate {
        /// Route string or destination identity.
        target: NavTarget,
        /// Explicit caller parameters (highest merge priority).
        params: Params,
        /// Drop the current top before pushing.
        replace_current: bool,
        /// Inherit the current entry's params at the lowest merge priority.
        forward_params: bool,
    },
    /// Remove entries above the newest match; `inclusive` removes the match
    /// too. Plain route names match any graph, `graph/route` matches both.
    PopUpTo {
        /// Route to search for, newest match wins.
        route: String,
        /// Remove the matched entry as well.
        inclusive: bool,
    },
    /// Remove all entries. Must be followed by exactly one `Navigate` in the
    /// same batch.
    ClearBackStack,
    /// Pop the top entry (restoring a pending modal if one applies).
    Back,
    /// Forget all modal contexts so `Back` stops restoring modals.
    DismissModals,
    /// Rewrite through registered aliases, resolve, and push (synthesizing
    /// the graph entry underneath nested targets).
    DeepLink {
        /// `path?query` deep-link string.
        path: String,
    },
    /// Begin a guided flow at step 0 (no-op if one is already active).
    StartGuidedFlow {
        /// Flow to start.
        flow_id: String,
        /// Extra params merged into step 0.
        params: Params,
    },
    /// Advance the active flow (completing it from the final step).
    NextStep {
        /// Extra params merged into the next step.
        params: Params,
    },
    /// Rewind the active flow (exiting it from step 0).
    PreviousStep,
    /// Patch the stored modification map for a flow.
    ModifyGuidedFlow {
        /// Flow whose modifications to patch.
        flow_id: String,
        /// The patch.
        modification: FlowModification,
    },
    /// Drop the stored pending navigation.
    ClearPendingNavigation,
    /// Host-reported animation state change.
    UpdateTransitionState {
        /// The new flag value.
        state: TransitionState,
    },
}

impl fmt::Debug for NavigationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate {
                target,
                replace_current,
                ..
            } => f
                .debug_struct("Navigate")
                .field("target", target)
                .field("replace_current", replace_current)
                .finish_non_exhaustive(),
            Self::PopUpTo { route, inclusive } => f
                .debug_struct("PopUpTo")
                .field("route", route)
                .field("inclusive", inclusive)
                .finish(),
            Self::ClearBackStack => write!(f, "ClearBackStack"),
            Self::Back => write!(f, "Back"),
            Self::DismissModals => write!(f, "DismissModals"),
            Self::DeepLink { path } => f.debug_struct("DeepLink").field("path", path).finish(),
            Self::StartGuidedFlow { flow_id, .. } => f
                .debug_struct("StartGuidedFlow")
                .field("flow_id", flow_id)
                .finish_non_exhaustive(),
            Self::NextStep { .. } => write!(f, "NextStep"),
            Self::PreviousStep => write!(f, "PreviousStep"),
            Self::ModifyGuidedFlow { flow_id, .. } => f
                .debug_struct("ModifyGuidedFlow")
                .field("flow_id", flow_id)
                .finish_non_exhaustive(),
            Self::ClearPendingNavigation => write!(f, "ClearPendingNavigation"),
            Self::UpdateTransitionState { state } => f
                .debug_struct("UpdateTransitionState")
                .field("state", state)
                .finish(),
        }
    }
}

// ============================================================================
// Transaction
// ============================================================================

/// A validated, ordered batch of intents applied atomically.
#[derive(Debug)]
pub struct Transaction {
    intents: Vec<NavigationIntent>,
    atomic: bool,
}

impl Transaction {
    /// The intents in application order.
    pub fn intents(&self) -> &[NavigationIntent] {
        &self.intents
    }

    /// Whether this batch was assembled as one atomic unit (guided-flow
    /// blocks and engine-internal follow-ups). Atomic batches pass the spam
    /// filter as a single action and are admitted mid-animation.
    pub fn is_atomic(&self) -> bool {
        self.atomic
    }

    /// Wrap a single intent as a transaction (direct dispatch).
    pub fn single(intent: NavigationIntent) -> Self {
        Self {
            intents: vec![intent],
            atomic: false,
        }
    }

    pub(crate) fn atomic(intents: Vec<NavigationIntent>) -> Self {
        Self {
            intents,
            atomic: true,
        }
    }

    pub(crate) fn into_intents(self) -> Vec<NavigationIntent> {
        self.intents
    }

    /// First navigate-like intent's target route, if any. Used by the guard
    /// runner to decide which interceptors apply.
    pub(crate) fn primary_target(&self) -> Option<&NavigationIntent> {
        self.intents.iter().find(|intent| {
            matches!(
                intent,
                NavigationIntent::Navigate { .. } | NavigationIntent::DeepLink { .. }
            )
        })
    }
}

// ============================================================================
// TransactionBuilder
// ============================================================================

/// Fluent builder collecting intents into a batch.
#[must_use]
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    intents: Vec<NavigationIntent>,
    atomic: bool,
}

impl TransactionBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Navigate to a target with explicit params.
    pub fn navigate_to(mut self, target: impl Into<NavTarget>, params: Params) -> Self {
        self.intents.push(NavigationIntent::Navigate {
            target: target.into(),
            params,
            replace_current: false,
            forward_params: false,
        });
        self
    }

    /// Mark the most recent `navigate_to` as replacing the current entry.
    pub fn replace_current(mut self) -> Self {
        if let Some(NavigationIntent::Navigate {
            replace_current, ..
        }) = self.intents.last_mut()
        {
            *replace_current = true;
        }
        self
    }

    /// Mark the most recent `navigate_to` as inheriting the current entry's
    /// params (lowest merge priority).
    pub fn forward_params(mut self) -> Self {
        if let Some(NavigationIntent::Navigate { forward_params, .. }) = self.intents.last_mut() {
            *forward_params = true;
        }
        self
    }

    /// Pop entries above (and optionally including) the newest match.
    pub fn pop_up_to(mut self, route: impl Into<String>, inclusive: bool) -> Self {
        self.intents.push(NavigationIntent::PopUpTo {
            route: route.into(),
            inclusive,
        });
        self
    }

    /// Remove every entry. Requires exactly one `navigate_to` in the batch.
    pub fn clear_back_stack(mut self) -> Self {
        self.intents.push(NavigationIntent::ClearBackStack);
        self
    }

    /// Pop the top entry.
    pub fn back(mut self) -> Self {
        self.intents.push(NavigationIntent::Back);
        self
    }

    /// Forget all modal contexts.
    pub fn dismiss_modals(mut self) -> Self {
        self.intents.push(NavigationIntent::DismissModals);
        self
    }

    /// Navigate a deep link (`path?query`).
    pub fn deep_link(mut self, path: impl Into<String>) -> Self {
        self.intents.push(NavigationIntent::DeepLink {
            path: path.into(),
        });
        self
    }

    /// Drop the stored pending navigation.
    pub fn clear_pending_navigation(mut self) -> Self {
        self.intents.push(NavigationIntent::ClearPendingNavigation);
        self
    }

    /// Push a raw intent (direct action dispatch).
    pub fn intent(mut self, intent: NavigationIntent) -> Self {
        self.intents.push(intent);
        self
    }

    /// Validate and assemble the transaction.
    ///
    /// Rules enforced here (and re-checked by the reducer):
    /// - `clear_back_stack` is mutually exclusive with `pop_up_to` and with
    ///   `replace_current`;
    /// - `clear_back_stack` must be followed by exactly one `navigate_to`;
    /// - the batch must not be empty.
    pub fn build(self) -> NavigationResult<Transaction> {
        if self.intents.is_empty() {
            return Err(NavigationError::invalid_config("empty transaction"));
        }

        let clears = self
            .intents
            .iter()
            .filter(|i| matches!(i, NavigationIntent::ClearBackStack))
            .count();

        if clears > 0 {
            if self
                .intents
                .iter()
                .any(|i| matches!(i, NavigationIntent::PopUpTo { .. }))
            {
                return Err(NavigationError::invalid_config(
                    "clear_back_stack and pop_up_to are mutually exclusive in one batch",
                ));
            }

            let navigates: Vec<&NavigationIntent> = self
                .intents
                .iter()
                .filter(|i| matches!(i, NavigationIntent::Navigate { .. }))
                .collect();

            if navigates.len() != 1 {
                return Err(NavigationError::invalid_config(format!(
                    "clear_back_stack must be followed by exactly one push, found {}",
                    navigates.len()
                )));
            }

            if navigates.iter().any(|i| {
                matches!(
                    i,
                    NavigationIntent::Navigate {
                        replace_current: true,
                        ..
                    }
                )
            }) {
                return Err(NavigationError::invalid_config(
                    "clear_back_stack and replace_current are mutually exclusive in one batch",
                ));
            }

            if clears > 1 {
                return Err(NavigationError::invalid_config(
                    "at most one clear_back_stack per batch",
                ));
            }
        }

        Ok(Transaction {
            intents: self.intents,
            atomic: self.atomic,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
