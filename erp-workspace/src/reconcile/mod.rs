//! Parent to child selection cascade
//!
//! When a parent tab's selected record changes, its descendant tabs may point
//! at records of the old parent. The reconciler decides which of them lose
//! their selection and form state:
//!
//! - an unchanged selection does nothing, so repeated renders are harmless
//! - a save of a freshly created parent (`"new"` -> real id) clears nothing
//! - otherwise children are cleared, except those open in form view, which
//!   keep their state (and so do their own descendants) unless forced

pub mod graph;

use std::collections::HashMap;

use log::debug;

pub use graph::{TabGraph, TabNode};

use crate::window::{reduce, Action, WindowStore, WorkspaceState, NEW_RECORD_ID};

/// Why the parent selection changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionChangeKind {
    /// The user moved to another record (or cleared the selection)
    #[default]
    Navigation,
    /// The parent record was just saved and received its id
    Saved,
}

/// A parent selection transition to reconcile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentSelectionChange {
    pub window_identifier: String,
    pub parent_tab_id: String,
    pub previous: Option<String>,
    pub next: Option<String>,
    pub kind: SelectionChangeKind,
    /// Clear children even when they are in form view
    pub force: bool,
}

impl ParentSelectionChange {
    pub fn new(
        window_identifier: impl Into<String>,
        parent_tab_id: impl Into<String>,
        previous: Option<&str>,
        next: Option<&str>,
    ) -> Self {
        Self {
            window_identifier: window_identifier.into(),
            parent_tab_id: parent_tab_id.into(),
            previous: previous.map(|s| s.to_string()),
            next: next.map(|s| s.to_string()),
            kind: SelectionChangeKind::Navigation,
            force: false,
        }
    }

    pub fn saved(mut self) -> Self {
        self.kind = SelectionChangeKind::Saved;
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }

    fn is_save_transition(&self) -> bool {
        if self.kind == SelectionChangeKind::Saved {
            return true;
        }
        self.previous.as_deref() == Some(NEW_RECORD_ID)
            && self
                .next
                .as_deref()
                .is_some_and(|id| id != NEW_RECORD_ID && !id.is_empty())
    }
}

/// Outcome of a reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeDecision {
    Unchanged,
    SaveTransition,
    /// The parent has no child tabs
    NoChildren,
    Cascade {
        cleared: Vec<String>,
        preserved: Vec<String>,
    },
}

/// Compute the next state for a parent selection change
pub fn reconcile_parent_selection(
    state: &WorkspaceState,
    change: &ParentSelectionChange,
    graph: &TabGraph,
) -> (WorkspaceState, CascadeDecision) {
    if change.previous == change.next {
        return (state.clone(), CascadeDecision::Unchanged);
    }

    if change.is_save_transition() {
        debug!(
            "Parent {} saved as {:?}, keeping child state",
            change.parent_tab_id, change.next
        );
        return (state.clone(), CascadeDecision::SaveTransition);
    }

    let children = graph.children_of(&change.parent_tab_id);
    if children.is_empty() {
        return (state.clone(), CascadeDecision::NoChildren);
    }

    let mut cleared = Vec::new();
    let mut preserved = Vec::new();
    for child in children {
        let form = state.get_tab_form_state(&change.window_identifier, child);
        if form.is_form_view() && !change.force {
            preserved.push(child.clone());
            preserved.extend(graph.descendants_of(child));
        } else {
            cleared.push(child.clone());
            cleared.extend(graph.descendants_of(child));
        }
    }

    debug!(
        "Cascade from {}: cleared {:?}, preserved {:?}",
        change.parent_tab_id, cleared, preserved
    );

    let next = reduce(
        state,
        Action::ClearChildrenSelections {
            window_identifier: change.window_identifier.clone(),
            child_tab_ids: cleared.clone(),
            force: true,
        },
    );

    (next, CascadeDecision::Cascade { cleared, preserved })
}

/// Remembers the last parent selection seen per (window, tab).
///
/// Binding layers call [`SelectionTracker::observe`] on every render; only
/// real transitions reach the reconciler.
#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    last_seen: HashMap<(String, String), Option<String>>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the stored selection of `parent_tab_id` with the last one seen
    /// and cascade to its children when it moved.
    ///
    /// The first observation only records the value: state restored from the
    /// URL must survive the initial render.
    pub fn observe(
        &mut self,
        store: &mut WindowStore,
        graph: &TabGraph,
        window_identifier: &str,
        parent_tab_id: &str,
        kind: SelectionChangeKind,
        force: bool,
    ) -> CascadeDecision {
        let current = store.get_selected_record(window_identifier, parent_tab_id);
        let key = (window_identifier.to_string(), parent_tab_id.to_string());

        let Some(previous) = self.last_seen.insert(key, current.clone()) else {
            return CascadeDecision::Unchanged;
        };

        let change = ParentSelectionChange {
            window_identifier: window_identifier.to_string(),
            parent_tab_id: parent_tab_id.to_string(),
            previous,
            next: current,
            kind,
            force,
        };
        let (next, decision) = reconcile_parent_selection(store.state(), &change, graph);
        *store = WindowStore::from_state(next);
        decision
    }

    /// Forget everything recorded for a window (after it is closed)
    pub fn forget_window(&mut self, window_identifier: &str) {
        self.last_seen.retain(|(window, _), _| window != window_identifier);
    }
}
