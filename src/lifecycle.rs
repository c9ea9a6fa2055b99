//! Per-entry lifecycle hooks.
//!
//! After each committed state change the engine diffs the previous and new
//! back-stacks **by entry identity** and:
//!
//! - invokes the destination's created hook for every newly introduced
//!   entry, handing it an [`EntryLifecycle`] on which it may register
//!   removal callbacks;
//! - runs registered removal callbacks exactly once for every entry that
//!   left the stack.
//!
//! A full state reset is special-cased: removal hooks fire for every entry
//! of the pre-reset stack, then created hooks fire for every entry of the
//! post-reset stack — entries reintroduced by the reset see `created` again.
//!
//! # Example
//!
//! ```
//! use navigator_core::Destination;
//!
//! let home = Destination::screen("home").on_created(|lifecycle| {
//!     let route = lifecycle.route().to_string();
//!     lifecycle.invoke_on_removal(move || {
//!         println!("'{route}' left the back-stack");
//!     });
//! });
//! ```

use crate::state::{EntryId, NavState};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Hook invoked when an entry for a destination enters the back-stack.
pub type CreatedHook = Arc<dyn Fn(&mut EntryLifecycle) + Send + Sync>;

type RemovalHook = Box<dyn FnOnce() + Send>;

// ============================================================================
// EntryLifecycle
// ============================================================================

/// Handle passed to a destination's created hook.
///
/// Identifies the entry that just entered the back-stack and collects
/// removal callbacks to run when it leaves.
pub struct EntryLifecycle {
    entry: EntryId,
    route: String,
    removal_hooks: Vec<RemovalHook>,
}

impl EntryLifecycle {
    fn new(entry: EntryId, route: String) -> Self {
        Self {
            entry,
            route,
            removal_hooks: Vec::new(),
        }
    }

    /// Identity of the entry this lifecycle belongs to.
    pub fn entry_id(&self) -> EntryId {
        self.entry
    }

    /// Route template of the entry's destination.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Register a callback to run when the entry leaves the back-stack.
    ///
    /// Callbacks run exactly once, in registration order.
    pub fn invoke_on_removal<F>(&mut self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.removal_hooks.push(Box::new(hook));
    }
}

// ============================================================================
// LifecycleTracker
// ============================================================================

/// Tracks registered removal hooks and diffs committed stacks.
#[derive(Default)]
pub struct LifecycleTracker {
    removal_hooks: Mutex<HashMap<EntryId, Vec<RemovalHook>>>,
}

impl LifecycleTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire hooks for a normal commit: removals for entries that left the
    /// stack, then created hooks for entries that appeared.
    pub fn on_commit(&self, prev: &NavState, next: &NavState) {
        let prev_ids: Vec<EntryId> = prev.back_stack().iter().map(|e| e.id()).collect();
        let next_ids: Vec<EntryId> = next.back_stack().iter().map(|e| e.id()).collect();

        for entry in prev.back_stack() {
            if !next_ids.contains(&entry.id()) {
                self.fire_removal(entry.id());
            }
        }
        for entry in next.back_stack() {
            if !prev_ids.contains(&entry.id()) {
                self.fire_created(entry.id(), entry.destination().route(), entry);
            }
        }
    }

    /// Fire hooks for a full reset: removals for the whole pre-reset stack,
    /// then created hooks for the whole post-reset stack.
    pub fn on_reset(&self, prev: &NavState, next: &NavState) {
        for entry in prev.back_stack() {
            self.fire_removal(entry.id());
        }
        for entry in next.back_stack() {
            self.fire_created(entry.id(), entry.destination().route(), entry);
        }
    }

    /// Fire created hooks for an initial (seeded) stack.
    pub fn on_init(&self, state: &NavState) {
        for entry in state.back_stack() {
            self.fire_created(entry.id(), entry.destination().route(), entry);
        }
    }

    fn fire_created(&self, id: EntryId, route: &str, entry: &crate::state::NavigationEntry) {
        let Some(hook) = entry.destination().created_hook() else {
            return;
        };
        let mut lifecycle = EntryLifecycle::new(id, route.to_string());
        (**hook)(&mut lifecycle);
        if !lifecycle.removal_hooks.is_empty() {
            self.removal_hooks
                .lock()
                .entry(id)
                .or_default()
                .append(&mut lifecycle.removal_hooks);
        }
    }

    fn fire_removal(&self, id: EntryId) {
        let hooks = self.removal_hooks.lock().remove(&id);
        if let Some(hooks) = hooks {
            for hook in hooks {
                hook();
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
