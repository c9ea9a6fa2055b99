//! Guided flows: linear scripted sequences of destinations.
//!
//! A [`GuidedFlowDefinition`] declares an ordered list of steps, an optional
//! on-complete callback, and a teardown policy for runtime modifications.
//! While a flow is active its position lives in [`GuidedFlowState`];
//! runtime overrides (param patches, step surgery, replacement completion
//! callbacks) accumulate per-flow in [`FlowModifications`] and are combined
//! with the definition on demand by
//! [`effective_steps`](FlowModifications::effective_steps).
//!
//! At most one flow is active at a time; starting a second one is a no-op.
//!
//! # Example
//!
//! ```
//! use navigator_core::{FlowStep, GuidedFlowDefinition, Params};
//!
//! let onboarding = GuidedFlowDefinition::new("onboarding")
//!     .step(FlowStep::new("welcome"))
//!     .step(FlowStep::new("pick-name").params(Params::from_pairs([("hint", "letters only")])))
//!     .step(FlowStep::new("done"));
//!
//! assert_eq!(onboarding.steps().len(), 3);
//! ```

use crate::intent::{NavTarget, Transaction};
use crate::params::Params;
use crate::state::NavState;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Callback invoked when a flow completes from its final step.
///
/// Receives the state snapshot *after* the flow state was cleared and
/// produces an optional follow-up batch, scheduled as its own transaction —
/// the reducer is never re-entered during reduction.
pub type OnComplete = Arc<dyn Fn(&NavState) -> Option<Transaction> + Send + Sync>;

// ============================================================================
// Definition
// ============================================================================

/// What to do with stored modifications after a flow completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClearModificationsPolicy {
    /// Remove only this flow's modification entry.
    #[default]
    ClearSpecific,
    /// Wipe the entire modification map.
    ClearAll,
    /// Leave all modifications intact for subsequent runs.
    ClearNone,
}

/// One step of a guided flow: a destination plus per-step params.
#[derive(Debug, Clone)]
pub struct FlowStep {
    target: NavTarget,
    params: Params,
}

impl FlowStep {
    /// Create a step targeting a route or destination.
    pub fn new(target: impl Into<NavTarget>) -> Self {
        Self {
            target: target.into(),
            params: Params::new(),
        }
    }

    /// Attach per-step params (lowest priority in the step merge).
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// The step's navigation target.
    pub fn target(&self) -> &NavTarget {
        &self.target
    }

    /// The step's declared params.
    pub fn step_params(&self) -> &Params {
        &self.params
    }
}

/// Declaration of a guided flow.
pub struct GuidedFlowDefinition {
    id: String,
    steps: Vec<FlowStep>,
    on_complete: Option<OnComplete>,
    clear_policy: ClearModificationsPolicy,
}

impl GuidedFlowDefinition {
    /// Create a flow with the given unique id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: Vec::new(),
            on_complete: None,
            clear_policy: ClearModificationsPolicy::default(),
        }
    }

    /// Append a step.
    #[must_use]
    pub fn step(mut self, step: FlowStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Append several steps.
    #[must_use]
    pub fn steps_from(mut self, steps: impl IntoIterator<Item = FlowStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Register the completion callback.
    #[must_use]
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&NavState) -> Option<Transaction> + Send + Sync + 'static,
    {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    /// Set the teardown policy for stored modifications.
    #[must_use]
    pub fn clear_policy(mut self, policy: ClearModificationsPolicy) -> Self {
        self.clear_policy = policy;
        self
    }

    /// The flow id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The declared steps.
    pub fn steps(&self) -> &[FlowStep] {
        &self.steps
    }

    /// The declared completion callback.
    pub fn completion(&self) -> Option<&OnComplete> {
        self.on_complete.as_ref()
    }

    /// The teardown policy.
    pub fn policy(&self) -> ClearModificationsPolicy {
        self.clear_policy
    }
}

impl fmt::Debug for GuidedFlowDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuidedFlowDefinition")
            .field("id", &self.id)
            .field("steps", &self.steps)
            .field("has_on_complete", &self.on_complete.is_some())
            .field("clear_policy", &self.clear_policy)
            .finish()
    }
}

// ============================================================================
// Active-flow state
// ============================================================================

/// Position of the active flow. At most one exists at a time.
#[derive(Clone)]
pub struct GuidedFlowState {
    /// Which flow is active.
    pub flow_id: String,
    /// Current step index into the effective step list.
    pub step_index: usize,
    /// Number of effective steps at the last mutation.
    pub total_steps: usize,
    /// When the flow was started.
    pub started_at: Instant,
    /// Set the moment the final step completes, just before teardown.
    pub completed_at: Option<Instant>,
}

impl GuidedFlowState {
    pub(crate) fn begin(flow_id: impl Into<String>, total_steps: usize) -> Self {
        Self {
            flow_id: flow_id.into(),
            step_index: 0,
            total_steps,
            started_at: Instant::now(),
            completed_at: None,
        }
    }

    /// Whether the current step is the last one.
    pub fn is_on_final_step(&self) -> bool {
        self.total_steps != 0 && self.step_index + 1 == self.total_steps
    }

    /// Progress through the flow as `(index + 1) / total`, clamped to `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.total_steps == 0 {
            return 0.0;
        }
        (((self.step_index + 1) as f32) / (self.total_steps as f32)).clamp(0.0, 1.0)
    }
}

impl fmt::Debug for GuidedFlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuidedFlowState")
            .field("flow_id", &self.flow_id)
            .field("step_index", &self.step_index)
            .field("total_steps", &self.total_steps)
            .field("completed", &self.completed_at.is_some())
            .finish()
    }
}

// ============================================================================
// Runtime modifications
// ============================================================================

/// Selects which step(s) a param patch applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepSelector {
    /// A single step by index.
    Index(usize),
    /// Every step whose target matches (route string or destination id).
    Target(NavTarget),
}

/// A single runtime override for a flow.
#[derive(Clone)]
pub enum FlowModification {
    /// Merge a param patch into the selected step(s).
    UpdateStepParams {
        /// Which step(s) to patch.
        selector: StepSelector,
        /// Params merged over the step's declared params.
        patch: Params,
    },
    /// Replace the step at `index` wholesale.
    ReplaceStep {
        /// Index into the effective step list.
        index: usize,
        /// The replacement.
        step: FlowStep,
    },
    /// Insert steps at `insert_at` (clamped to the list length).
    AddSteps {
        /// Steps to insert.
        steps: Vec<FlowStep>,
        /// Insertion point.
        insert_at: usize,
    },
    /// Remove the steps at the given indices.
    RemoveSteps {
        /// Indices into the effective step list.
        indices: Vec<usize>,
    },
    /// Replace the completion callback for this flow.
    UpdateOnComplete {
        /// The replacement callback.
        callback: OnComplete,
    },
}

impl fmt::Debug for FlowModification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpdateStepParams { selector, .. } => f
                .debug_struct("UpdateStepParams")
                .field("selector", selector)
                .finish_non_exhaustive(),
            Self::ReplaceStep { index, .. } => f
                .debug_struct("ReplaceStep")
                .field("index", index)
                .finish_non_exhaustive(),
            Self::AddSteps { steps, insert_at } => f
                .debug_struct("AddSteps")
                .field("count", &steps.len())
                .field("insert_at", insert_at)
                .finish(),
            Self::RemoveSteps { indices } => f
                .debug_struct("RemoveSteps")
                .field("indices", indices)
                .finish(),
            Self::UpdateOnComplete { .. } => write!(f, "UpdateOnComplete"),
        }
    }
}

/// How a structural modification moved the step list, used by the reducer to
/// keep the active index pointing at the intended step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StepListChange {
    /// Only params changed.
    None,
    /// These (sorted, pre-removal) indices were removed.
    Removed(Vec<usize>),
    /// `count` steps were inserted at `at`.
    Inserted {
        /// Insertion point.
        at: usize,
        /// Number of inserted steps.
        count: usize,
    },
}

/// Accumulated runtime overrides for one flow.
#[derive(Clone, Default)]
pub struct FlowModifications {
    steps_override: Option<Vec<FlowStep>>,
    param_patches: Vec<(StepSelector, Params)>,
    on_complete_override: Option<OnComplete>,
}

impl FlowModifications {
    /// Whether any override is stored.
    pub fn is_empty(&self) -> bool {
        self.steps_override.is_none()
            && self.param_patches.is_empty()
            && self.on_complete_override.is_none()
    }

    /// Apply one modification, materializing a step override when the list
    /// structure changes. Returns how the list moved.
    pub(crate) fn apply(
        &mut self,
        base_steps: &[FlowStep],
        modification: FlowModification,
    ) -> StepListChange {
        match modification {
            FlowModification::UpdateStepParams { selector, patch } => {
                self.param_patches.push((selector, patch));
                StepListChange::None
            }
            FlowModification::ReplaceStep { index, step } => {
                let steps = self.materialize(base_steps);
                if index < steps.len() {
                    steps[index] = step;
                }
                StepListChange::None
            }
            FlowModification::AddSteps { steps, insert_at } => {
                let list = self.materialize(base_steps);
                let at = insert_at.min(list.len());
                let count = steps.len();
                for (offset, step) in steps.into_iter().enumerate() {
                    list.insert(at + offset, step);
                }
                StepListChange::Inserted { at, count }
            }
            FlowModification::RemoveSteps { mut indices } => {
                let list = self.materialize(base_steps);
                indices.sort_unstable();
                indices.dedup();
                indices.retain(|&i| i < list.len());
                // Remove from the back so earlier indices stay valid.
                for &i in indices.iter().rev() {
                    list.remove(i);
                }
                StepListChange::Removed(indices)
            }
            FlowModification::UpdateOnComplete { callback } => {
                self.on_complete_override = Some(callback);
                StepListChange::None
            }
        }
    }

    fn materialize(&mut self, base_steps: &[FlowStep]) -> &mut Vec<FlowStep> {
        self.steps_override
            .get_or_insert_with(|| base_steps.to_vec())
    }

    /// The effective step list: structural override (or the definition's
    /// steps) with param patches merged in.
    pub fn effective_steps(&self, definition: &GuidedFlowDefinition) -> Vec<FlowStep> {
        let mut steps: Vec<FlowStep> = self
            .steps_override
            .clone()
            .unwrap_or_else(|| definition.steps().to_vec());

        for (selector, patch) in &self.param_patches {
            for (index, step) in steps.iter_mut().enumerate() {
                let applies = match selector {
                    StepSelector::Index(i) => *i == index,
                    StepSelector::Target(target) => step.target == *target,
                };
                if applies {
                    step.params = Params::merge(&step.params, patch);
                }
            }
        }

        steps
    }

    /// The effective completion callback: the override if present, else the
    /// definition's.
    pub fn effective_on_complete<'a>(
        &'a self,
        definition: &'a GuidedFlowDefinition,
    ) -> Option<&'a OnComplete> {
        self.on_complete_override
            .as_ref()
            .or_else(|| definition.completion())
    }
}

impl fmt::Debug for FlowModifications {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowModifications")
            .field("has_steps_override", &self.steps_override.is_some())
            .field("param_patches", &self.param_patches.len())
            .field("has_on_complete_override", &self.on_complete_override.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
