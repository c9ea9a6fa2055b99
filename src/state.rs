//! Navigation state management.
//!
//! [`NavState`] is the immutable snapshot the whole engine revolves around:
//! an ordered back-stack of [`NavigationEntry`]s plus the transition flag,
//! pending navigation, modal contexts, and guided-flow bookkeeping. The
//! reducer produces successor snapshots; readers observe them through the
//! engine without locking.
//!
//! Invariants maintained by the reducer:
//!
//! - the back-stack is non-empty after initialization and `current` is
//!   always its last element;
//! - every entry's effective graph id reaches its destination through the
//!   precomputed routing data;
//! - modal contexts are ordered by elevation.

use crate::destination::Destination;
use crate::error::{NavigationError, NavigationResult};
use crate::flow::{FlowModifications, GuidedFlowState};
use crate::graph::{GraphId, RoutingTable};
use crate::params::Params;
use crate::transition::TransitionState;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// Entry identity
// ============================================================================

/// Identity of a back-stack entry. Fresh per push; an entry restored from a
/// modal context keeps its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

fn mint_entry_id() -> EntryId {
    EntryId(NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed))
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry#{}", self.0)
    }
}

// ============================================================================
// NavigationEntry
// ============================================================================

/// Guided-flow membership of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowContext {
    /// Which flow the entry belongs to.
    pub flow_id: String,
    /// The step this entry represents.
    pub step_index: usize,
    /// Step count when the entry was pushed.
    pub total_steps: usize,
}

/// One element of the back-stack.
#[derive(Debug, Clone)]
pub struct NavigationEntry {
    id: EntryId,
    destination: Arc<Destination>,
    params: Params,
    graph_id: GraphId,
    position: usize,
    flow: Option<FlowContext>,
}

impl NavigationEntry {
    pub(crate) fn new(
        destination: Arc<Destination>,
        params: Params,
        graph_id: GraphId,
    ) -> Self {
        Self {
            id: mint_entry_id(),
            destination,
            params,
            graph_id,
            position: 0,
            flow: None,
        }
    }

    pub(crate) fn with_flow(mut self, flow: FlowContext) -> Self {
        self.flow = Some(flow);
        self
    }

    pub(crate) fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Stable identity of this entry.
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// The destination this entry shows.
    pub fn destination(&self) -> &Arc<Destination> {
        &self.destination
    }

    /// The immutable parameters the entry carries.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The graph the destination was reached **through** — for alias-reached
    /// entries this differs from the declaring graph.
    pub fn graph_id(&self) -> &GraphId {
        &self.graph_id
    }

    /// Position in the back-stack, 0 at the bottom.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Guided-flow membership, if this entry is a flow step.
    pub fn flow(&self) -> Option<&FlowContext> {
        self.flow.as_ref()
    }

    /// Shorthand for the destination's route template.
    pub fn route(&self) -> &str {
        self.destination.route()
    }

    /// Whether this entry is a modal.
    pub fn is_modal(&self) -> bool {
        self.destination.is_modal()
    }
}

// ============================================================================
// Modal contexts
// ============================================================================

/// Pairing of an open (or temporarily closed) modal with the screen beneath
/// it. Ordered by elevation in [`NavState::modal_contexts`].
#[derive(Debug, Clone)]
pub struct ModalContext {
    pub(crate) modal: NavigationEntry,
    pub(crate) underlying: EntryId,
    pub(crate) pending_restoration: bool,
}

impl ModalContext {
    /// Snapshot of the modal entry (used to restore it).
    pub fn modal(&self) -> &NavigationEntry {
        &self.modal
    }

    /// The screen entry beneath the modal at insertion time.
    pub fn underlying(&self) -> EntryId {
        self.underlying
    }

    /// `true` once the modal was displaced by a screen navigation and will
    /// be restored by the next matching `Back`.
    pub fn is_pending_restoration(&self) -> bool {
        self.pending_restoration
    }
}

// ============================================================================
// Pending navigation
// ============================================================================

/// A navigation suspended by a guard, stored until resumed or cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingNavigation {
    /// Canonical route of the original target (template form).
    pub route: String,
    /// Merged params of the original navigation.
    pub params: Params,
    /// Guard-supplied metadata.
    pub metadata: Params,
    /// Optional hint for the redirect destination's UI.
    pub display_hint: Option<String>,
}

// ============================================================================
// NavState
// ============================================================================

/// Immutable snapshot of the whole navigation state.
#[derive(Clone)]
pub struct NavState {
    pub(crate) table: Arc<RoutingTable>,
    pub(crate) stack: Vec<NavigationEntry>,
    pub(crate) transition_state: TransitionState,
    pub(crate) pending: Option<PendingNavigation>,
    pub(crate) modal_contexts: Vec<ModalContext>,
    pub(crate) active_flow: Option<GuidedFlowState>,
    pub(crate) flow_modifications: HashMap<String, FlowModifications>,
}

impl NavState {
    /// Initial state: the root graph's entry destination (alias chains
    /// resolved) as the only back-stack element.
    pub fn seeded(table: Arc<RoutingTable>) -> NavigationResult<Self> {
        let root = table.root().clone();
        let effective = table.terminal_graph(&root);
        let entry_dest = table.entry_destination(&root).ok_or_else(|| {
            NavigationError::invalid_config(format!("root graph '{root}' has no entry"))
        })?;
        let destination = table
            .destination(entry_dest)
            .ok_or_else(|| {
                NavigationError::invalid_config(format!(
                    "root entry {entry_dest} missing from routing table"
                ))
            })?
            .clone();

        let mut entry = NavigationEntry::new(destination, Params::new(), effective);
        entry.set_position(0);

        Ok(Self {
            table,
            stack: vec![entry],
            transition_state: TransitionState::Idle,
            pending: None,
            modal_contexts: Vec::new(),
            active_flow: None,
            flow_modifications: HashMap::new(),
        })
    }

    /// The current entry — always the last back-stack element.
    pub fn current(&self) -> &NavigationEntry {
        &self.stack[self.stack.len() - 1]
    }

    /// The full back-stack, bottom first.
    pub fn back_stack(&self) -> &[NavigationEntry] {
        &self.stack
    }

    /// Number of entries on the back-stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The animation admission flag.
    pub fn transition_state(&self) -> TransitionState {
        self.transition_state
    }

    /// The stored pending navigation, if any.
    pub fn pending_navigation(&self) -> Option<&PendingNavigation> {
        self.pending.as_ref()
    }

    /// Active modal contexts, ordered by elevation.
    pub fn modal_contexts(&self) -> &[ModalContext] {
        &self.modal_contexts
    }

    /// The active guided flow, if any. At most one exists.
    pub fn guided_flow_state(&self) -> Option<&GuidedFlowState> {
        self.active_flow.as_ref()
    }

    /// Stored runtime modifications per flow id.
    pub fn guided_flow_modifications(&self) -> &HashMap<String, FlowModifications> {
        &self.flow_modifications
    }

    /// Modifications stored for one flow.
    pub fn modifications_for(&self, flow_id: &str) -> Option<&FlowModifications> {
        self.flow_modifications.get(flow_id)
    }

    /// The shared routing data.
    pub fn routing_table(&self) -> &Arc<RoutingTable> {
        &self.table
    }

    /// Whether the current entry is a modal.
    pub fn is_current_modal(&self) -> bool {
        self.current().is_modal()
    }

    /// Canonical full path of the current entry with `{name}` markers
    /// substituted from the entry's params.
    pub fn current_full_path(&self) -> String {
        let entry = self.current();
        let template = self
            .table
            .full_path(entry.destination().id())
            .unwrap_or_else(|| entry.route());

        template
            .split('/')
            .map(|segment| {
                segment
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                    .and_then(|name| entry.params().get(name))
                    .map_or_else(|| segment.to_string(), |value| value.to_string())
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// The current full path split into segments.
    pub fn current_path_segments(&self) -> Vec<String> {
        self.current_full_path()
            .split('/')
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    /// Back-stack depth (alias kept for observability parity).
    pub fn navigation_depth(&self) -> usize {
        self.depth()
    }

    /// Re-derive entry positions after stack surgery.
    pub(crate) fn renumber(&mut self) {
        for (index, entry) in self.stack.iter_mut().enumerate() {
            entry.set_position(index);
        }
    }

    #[cfg(test)]
    pub(crate) fn test_push(
        &self,
        destination: crate::destination::DestinationId,
        params: Params,
    ) -> Self {
        let dest = self
            .table
            .destination(destination)
            .expect("test destination must exist")
            .clone();
        let graph = self
            .table
            .declaring_graph(destination)
            .expect("test destination must be declared")
            .clone();
        let mut next = self.clone();
        next.stack.push(NavigationEntry::new(dest, params, graph));
        next.renumber();
        next
    }
}

impl fmt::Debug for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavState")
            .field(
                "stack",
                &self
                    .stack
                    .iter()
                    .map(|e| e.route())
                    .collect::<Vec<_>>(),
            )
            .field("transition_state", &self.transition_state)
            .field("pending", &self.pending.is_some())
            .field("modal_contexts", &self.modal_contexts.len())
            .field("active_flow", &self.active_flow)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
