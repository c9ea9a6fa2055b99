//! The pure reducer: `(state, batch) → state`.
//!
//! Every transaction funnels through [`reduce`], which clones the current
//! snapshot, applies the batch, and either returns the successor state or an
//! error with the original state untouched. The reducer never panics and
//! never suspends — guard evaluation and on-complete callbacks that await
//! happen around it, in the engine.
//!
//! # Intent ordering
//!
//! Within a batch, intents apply in phases regardless of the order they were
//! collected in (stable within a phase):
//!
//! 1. stack removals (`ClearBackStack`, `PopUpTo`, `Back`)
//! 2. pushes (`Navigate`, `DeepLink`)
//! 3. guided-flow updates
//! 4. modal-context bookkeeping (`DismissModals`)
//! 5. pending-navigation bookkeeping
//! 6. the transition-state flag
//!
//! # Parameter merge
//!
//! Lowest to highest priority: forwarded params (only with the
//! `forward_params` flag), path params extracted during resolution, explicit
//! caller params. The latest writer wins per key.

use crate::debug_log;
use crate::deeplink::DeepLinkRegistry;
use crate::error::{NavigationError, NavigationResult};
use crate::flow::{ClearModificationsPolicy, FlowModifications, GuidedFlowDefinition, GuidedFlowState, StepListChange};
use crate::graph::RoutingTable;
use crate::intent::{NavigationIntent, Transaction};
use crate::params::Params;
use crate::resolve::{resolve, resolve_route, Resolution};
use crate::state::{FlowContext, ModalContext, NavState, NavigationEntry};
use crate::transition::TransitionState;
use crate::url::parse_url_with_query_params;
use std::collections::HashMap;
use std::sync::Arc;

// ============================================================================
// Context and result types
// ============================================================================

/// Immutable registries the reducer resolves against.
pub struct ReducerContext<'a> {
    /// The precomputed routing table.
    pub table: &'a Arc<RoutingTable>,
    /// Registered guided-flow definitions by id.
    pub flows: &'a HashMap<String, Arc<GuidedFlowDefinition>>,
    /// Registered deep-link aliases.
    pub aliases: &'a DeepLinkRegistry,
}

/// Direction of a committed route change, for listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDirection {
    /// A push-like change.
    Forward,
    /// A pop-like change.
    Back,
    /// The top entry was replaced in place.
    Replace,
}

/// Output of a successful reduction.
pub struct Reduced {
    /// The successor state.
    pub state: NavState,
    /// On-complete batch to schedule as a follow-up transaction.
    pub follow_up: Option<Transaction>,
    /// Teardown to apply after the follow-up commits.
    pub pending_policy: Option<(String, ClearModificationsPolicy)>,
    /// Whether the visible route changed.
    pub route_changed: bool,
    /// Direction of the change.
    pub direction: NavigationDirection,
}

fn phase_of(intent: &NavigationIntent) -> u8 {
    match intent {
        NavigationIntent::ClearBackStack
        | NavigationIntent::PopUpTo { .. }
        | NavigationIntent::Back => 0,
        NavigationIntent::Navigate { .. } | NavigationIntent::DeepLink { .. } => 1,
        NavigationIntent::StartGuidedFlow { .. }
        | NavigationIntent::NextStep { .. }
        | NavigationIntent::PreviousStep
        | NavigationIntent::ModifyGuidedFlow { .. } => 2,
        NavigationIntent::DismissModals => 3,
        NavigationIntent::ClearPendingNavigation => 4,
        NavigationIntent::UpdateTransitionState { .. } => 5,
    }
}

// ============================================================================
// reduce
// ============================================================================

/// Apply a batch to a state snapshot, producing the successor atomically.
pub fn reduce(
    ctx: &ReducerContext<'_>,
    state: &NavState,
    transaction: &Transaction,
) -> NavigationResult<Reduced> {
    let mut next = state.clone();
    let mut follow_up = None;
    let mut pending_policy = None;
    let mut explicit_transition = false;
    let mut direction = NavigationDirection::Forward;

    let before_top = state.current().id();
    let before_route = state.current_full_path();

    let mut phased: Vec<&NavigationIntent> = transaction.intents().iter().collect();
    phased.sort_by_key(|intent| phase_of(intent));

    for intent in phased {
        match intent {
            NavigationIntent::ClearBackStack => {
                next.stack.clear();
                next.modal_contexts.clear();
            }

            NavigationIntent::PopUpTo { route, inclusive } => {
                apply_pop_up_to(ctx, &mut next, route, *inclusive)?;
            }

            NavigationIntent::Back => {
                direction = NavigationDirection::Back;
                if next.active_flow.is_some()
                    && next.stack.last().is_some_and(|e| e.flow().is_some())
                {
                    apply_previous_step(&mut next);
                } else {
                    apply_back(&mut next);
                }
            }

            NavigationIntent::Navigate {
                target,
                params,
                replace_current,
                forward_params,
            } => {
                if *replace_current {
                    direction = NavigationDirection::Replace;
                }
                let preferred = next.stack.last().map(|e| e.graph_id().clone());
                let resolution = resolve(ctx.table, target, preferred.as_ref())?;
                push_resolution(
                    &mut next,
                    resolution,
                    params,
                    *replace_current,
                    *forward_params,
                    None,
                );
            }

            NavigationIntent::DeepLink { path } => {
                apply_deep_link(ctx, &mut next, path)?;
            }

            NavigationIntent::StartGuidedFlow { flow_id, params } => {
                apply_start_flow(ctx, &mut next, flow_id, params)?;
            }

            NavigationIntent::NextStep { params } => {
                apply_next_step(
                    ctx,
                    &mut next,
                    params,
                    &mut follow_up,
                    &mut pending_policy,
                )?;
            }

            NavigationIntent::PreviousStep => {
                direction = NavigationDirection::Back;
                apply_previous_step(&mut next);
            }

            NavigationIntent::ModifyGuidedFlow {
                flow_id,
                modification,
            } => {
                apply_flow_modification(ctx, &mut next, flow_id, modification.clone())?;
            }

            NavigationIntent::DismissModals => {
                next.modal_contexts.clear();
            }

            NavigationIntent::ClearPendingNavigation => {
                next.pending = None;
            }

            NavigationIntent::UpdateTransitionState { state } => {
                explicit_transition = true;
                next.transition_state = *state;
            }
        }
    }

    if next.stack.is_empty() {
        return Err(NavigationError::invalid_config(
            "batch left the back-stack empty",
        ));
    }

    next.renumber();

    let route_changed =
        next.current().id() != before_top || next.current_full_path() != before_route;

    if route_changed && !explicit_transition {
        let enter = next.current().destination().enter();
        let exit = state.current().destination().exit();
        next.transition_state = if enter.is_none() && exit.is_none() {
            TransitionState::Idle
        } else {
            TransitionState::Animating
        };
    }

    debug_log!(
        "Reduced {} intents: '{}' -> '{}' ({:?})",
        transaction.intents().len(),
        before_route,
        next.current_full_path(),
        direction
    );

    Ok(Reduced {
        state: next,
        follow_up,
        pending_policy,
        route_changed,
        direction,
    })
}

// ============================================================================
// Stack primitives
// ============================================================================

fn top_is_modal(state: &NavState) -> bool {
    state.stack.last().is_some_and(NavigationEntry::is_modal)
}

/// Drop an entry's modal bookkeeping when it leaves the stack for good.
fn forget_entry(state: &mut NavState, entry: &NavigationEntry) {
    if entry.is_modal() {
        state
            .modal_contexts
            .retain(|c| c.modal.id() != entry.id());
    } else {
        // A removed screen can no longer anchor a restoration.
        state.modal_contexts.retain(|c| c.underlying != entry.id());
    }
}

fn push_resolution(
    state: &mut NavState,
    resolution: Resolution,
    user_params: &Params,
    replace_current: bool,
    forward_params: bool,
    flow: Option<FlowContext>,
) {
    let forwarded = if forward_params {
        state
            .stack
            .last()
            .map(|e| e.params().clone())
            .unwrap_or_default()
    } else {
        Params::new()
    };
    let merged = Params::layered([&forwarded, &resolution.path_params, user_params]);

    if replace_current {
        if let Some(removed) = state.stack.pop() {
            forget_entry(state, &removed);
        }
    }

    let destination = resolution.destination;

    if destination.is_modal() {
        // A modal stacks on the screen beneath the whole modal pile.
        let underlying = state
            .stack
            .last()
            .map(|top| {
                if top.is_modal() {
                    state
                        .modal_contexts
                        .iter()
                        .find(|c| c.modal.id() == top.id())
                        .map_or(top.id(), |c| c.underlying)
                } else {
                    top.id()
                }
            });

        let mut entry = NavigationEntry::new(destination, merged, resolution.graph_id);
        if let Some(flow) = flow {
            entry = entry.with_flow(flow);
        }

        if let Some(underlying) = underlying {
            state.modal_contexts.push(ModalContext {
                modal: entry.clone(),
                underlying,
                pending_restoration: false,
            });
            state.modal_contexts.sort_by(|a, b| {
                a.modal
                    .destination()
                    .elevation_value()
                    .total_cmp(&b.modal.destination().elevation_value())
            });
        }
        state.stack.push(entry);
    } else {
        // A screen reached while modals sit on top closes them; their
        // contexts stay behind, pending restoration.
        while top_is_modal(state) {
            if let Some(modal) = state.stack.pop() {
                if let Some(context) = state
                    .modal_contexts
                    .iter_mut()
                    .find(|c| c.modal.id() == modal.id())
                {
                    context.pending_restoration = true;
                }
            }
        }

        let mut entry = NavigationEntry::new(destination, merged, resolution.graph_id);
        if let Some(flow) = flow {
            entry = entry.with_flow(flow);
        }
        state.stack.push(entry);
    }
}

fn apply_back(state: &mut NavState) {
    if state.stack.len() <= 1 {
        return; // single entry: no-op
    }

    if let Some(popped) = state.stack.pop() {
        forget_entry(state, &popped);
    }

    // Restore the topmost modal still pending on the revealed screen.
    let Some(new_top) = state.stack.last().map(NavigationEntry::id) else {
        return;
    };
    let restore = state
        .modal_contexts
        .iter_mut()
        .rev()
        .find(|c| c.pending_restoration && c.underlying == new_top);
    if let Some(context) = restore {
        context.pending_restoration = false;
        let entry = context.modal.clone();
        state.stack.push(entry);
    }
}

fn apply_pop_up_to(
    ctx: &ReducerContext<'_>,
    state: &mut NavState,
    route: &str,
    inclusive: bool,
) -> NavigationResult<()> {
    let matches_entry = |entry: &NavigationEntry| -> bool {
        if entry.route() == route {
            return true; // plain route name matches any graph
        }
        route
            .split_once('/')
            .is_some_and(|(graph, rest)| entry.graph_id().as_str() == graph && entry.route() == rest)
    };

    let index = state
        .stack
        .iter()
        .rposition(matches_entry)
        .ok_or_else(|| {
            NavigationError::route_not_found(route, ctx.table.available_routes().to_vec())
        })?;

    let cutoff = if inclusive { index } else { index + 1 };
    while state.stack.len() > cutoff {
        if let Some(removed) = state.stack.pop() {
            forget_entry(state, &removed);
        }
    }
    Ok(())
}

fn apply_deep_link(
    ctx: &ReducerContext<'_>,
    state: &mut NavState,
    path: &str,
) -> NavigationResult<()> {
    let (clean, query) = parse_url_with_query_params(path);
    let (route, params) = ctx
        .aliases
        .rewrite(&clean, &query)
        .unwrap_or((clean, query));

    let resolution = resolve_route(ctx.table, &route, None)?;

    // A target nested below its graph's declared entry gets that entry
    // synthesized underneath, so back navigation is sensible.
    if let Some(entry_dest) = ctx.table.entry_destination(&resolution.graph_id) {
        if entry_dest != resolution.destination.id() && resolution.graph_id != *ctx.table.root() {
            if let Some(entry_destination) = ctx.table.destination(entry_dest).cloned() {
                let synthesized = Resolution {
                    destination: entry_destination,
                    graph_id: resolution.graph_id.clone(),
                    path_params: Params::new(),
                };
                push_resolution(state, synthesized, &Params::new(), false, false, None);
            }
        }
    }

    push_resolution(state, resolution, &params, false, false, None);
    Ok(())
}

// ============================================================================
// Guided-flow intents
// ============================================================================

fn flow_definition<'a>(
    ctx: &'a ReducerContext<'_>,
    flow_id: &str,
) -> NavigationResult<&'a Arc<GuidedFlowDefinition>> {
    ctx.flows.get(flow_id).ok_or_else(|| {
        NavigationError::invalid_config(format!("unknown guided flow '{flow_id}'"))
    })
}

fn apply_start_flow(
    ctx: &ReducerContext<'_>,
    state: &mut NavState,
    flow_id: &str,
    params: &Params,
) -> NavigationResult<()> {
    if state.active_flow.is_some() {
        debug_log!("Ignoring start of '{}': another flow is active", flow_id);
        return Ok(()); // no-op, not an error
    }

    let definition = flow_definition(ctx, flow_id)?;
    let mods = state
        .flow_modifications
        .get(flow_id)
        .cloned()
        .unwrap_or_default();
    let steps = mods.effective_steps(definition);
    if steps.is_empty() {
        return Err(NavigationError::invalid_config(format!(
            "guided flow '{flow_id}' has no steps"
        )));
    }

    let step = &steps[0];
    let preferred = state.stack.last().map(|e| e.graph_id().clone());
    let resolution = resolve(ctx.table, step.target(), preferred.as_ref())?;
    let merged = Params::merge(step.step_params(), params);

    push_resolution(
        state,
        resolution,
        &merged,
        false,
        false,
        Some(FlowContext {
            flow_id: flow_id.to_string(),
            step_index: 0,
            total_steps: steps.len(),
        }),
    );
    state.active_flow = Some(GuidedFlowState::begin(flow_id, steps.len()));
    Ok(())
}

fn apply_next_step(
    ctx: &ReducerContext<'_>,
    state: &mut NavState,
    params: &Params,
    follow_up: &mut Option<Transaction>,
    pending_policy: &mut Option<(String, ClearModificationsPolicy)>,
) -> NavigationResult<()> {
    let Some(flow) = state.active_flow.clone() else {
        return Ok(()); // no active flow: nothing to advance
    };

    let definition = flow_definition(ctx, &flow.flow_id)?;
    let mods = state
        .flow_modifications
        .get(&flow.flow_id)
        .cloned()
        .unwrap_or_default();
    let steps = mods.effective_steps(definition);

    if flow.step_index + 1 >= steps.len() {
        // Final step: complete. Flow state is cleared before the
        // on-complete batch commits; the teardown policy applies after.
        let callback = mods.effective_on_complete(definition).cloned();
        if let Some(active) = &mut state.active_flow {
            active.completed_at = Some(std::time::Instant::now());
        }
        state.active_flow = None;
        *pending_policy = Some((definition.id().to_string(), definition.policy()));
        if let Some(callback) = callback {
            *follow_up = (*callback)(state);
        }
        return Ok(());
    }

    let index = flow.step_index + 1;
    let step = &steps[index];
    let preferred = state.stack.last().map(|e| e.graph_id().clone());
    let resolution = resolve(ctx.table, step.target(), preferred.as_ref())?;
    let merged = Params::merge(step.step_params(), params);

    push_resolution(
        state,
        resolution,
        &merged,
        false,
        false,
        Some(FlowContext {
            flow_id: flow.flow_id.clone(),
            step_index: index,
            total_steps: steps.len(),
        }),
    );
    if let Some(active) = &mut state.active_flow {
        active.step_index = index;
        active.total_steps = steps.len();
    }
    Ok(())
}

fn apply_previous_step(state: &mut NavState) {
    let Some(flow) = state.active_flow.clone() else {
        return;
    };

    if flow.step_index == 0 {
        // Exit the flow: drop the step entry, revealing the pre-flow entry.
        state.active_flow = None;
        if state.stack.len() > 1 && state.stack.last().is_some_and(|e| e.flow().is_some()) {
            if let Some(popped) = state.stack.pop() {
                forget_entry(state, &popped);
            }
        }
        return;
    }

    if state.stack.len() > 1 && state.stack.last().is_some_and(|e| e.flow().is_some()) {
        if let Some(popped) = state.stack.pop() {
            forget_entry(state, &popped);
        }
    }
    if let Some(active) = &mut state.active_flow {
        active.step_index = flow.step_index - 1;
    }
}

fn apply_flow_modification(
    ctx: &ReducerContext<'_>,
    state: &mut NavState,
    flow_id: &str,
    modification: crate::flow::FlowModification,
) -> NavigationResult<()> {
    let definition = flow_definition(ctx, flow_id)?;
    let mods = state
        .flow_modifications
        .entry(flow_id.to_string())
        .or_insert_with(FlowModifications::default);
    let change = mods.apply(definition.steps(), modification);
    let new_total = mods.effective_steps(definition).len();

    let is_active = state
        .active_flow
        .as_ref()
        .is_some_and(|f| f.flow_id == flow_id);
    if !is_active {
        return Ok(());
    }

    if let Some(active) = &mut state.active_flow {
        match change {
            StepListChange::Removed(indices) => {
                let removed_before = indices.iter().filter(|&&i| i < active.step_index).count();
                active.step_index = active.step_index.saturating_sub(removed_before);
            }
            StepListChange::Inserted { at, count } => {
                if at <= active.step_index {
                    active.step_index += count;
                }
            }
            StepListChange::None => {}
        }
        active.total_steps = new_total;
        if new_total > 0 {
            active.step_index = active.step_index.min(new_total - 1);
        } else {
            active.step_index = 0;
        }
    }
    Ok(())
}
