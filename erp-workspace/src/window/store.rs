//! Window state store
//!
//! The store is a plain value ([`WorkspaceState`]) transformed by a pure
//! reducer ([`reduce`]). Every action produces a new state; the previous state
//! is never touched, so a reader holding an older snapshot never observes a
//! half-applied update. [`WindowStore`] wraps the reducer with named setters and
//! getters for call sites that prefer methods over actions.
//!
//! Getters are total: missing windows or tabs yield default values. Setters
//! create missing paths on demand, except the `clear_*` family, which logs a
//! warning and leaves the state unchanged when the path does not exist.

use std::collections::BTreeMap;

use log::{debug, warn};

use super::models::{
    ColumnFilter, ColumnSort, FormMode, NavigationState, TabFormState, TabMode, TabState,
    TableState, VisibilityState, WindowPatch, WindowState,
};

/// Property names readable through [`WorkspaceState::get_active_window_property`]
pub const WINDOW_PROPERTY_NAMES: &[&str] = &[
    "windowId",
    "windowIdentifier",
    "isActive",
    "order",
    "title",
    "formRecordId",
    "formMode",
    "navigation",
    "tabs",
];

/// Every state transition the store supports
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // Table state
    SetTableFilters {
        window_identifier: String,
        tab_id: String,
        filters: Vec<ColumnFilter>,
    },
    /// Shallow-merged into the existing visibility map
    SetTableVisibility {
        window_identifier: String,
        tab_id: String,
        visibility: VisibilityState,
    },
    SetTableSorting {
        window_identifier: String,
        tab_id: String,
        sorting: Vec<ColumnSort>,
    },
    SetTableOrder {
        window_identifier: String,
        tab_id: String,
        order: Vec<String>,
    },
    SetTableImplicitFilterApplied {
        window_identifier: String,
        tab_id: String,
        is_applied: bool,
    },

    // Navigation
    SetNavigationActiveLevels {
        window_identifier: String,
        active_levels: Vec<usize>,
    },
    SetNavigationActiveTabsByLevel {
        window_identifier: String,
        active_tabs_by_level: BTreeMap<usize, String>,
    },
    SetNavigationInitialized {
        window_identifier: String,
        initialized: bool,
    },

    // Window management
    SetWindowActive {
        window_identifier: String,
        window_data: Option<WindowPatch>,
    },
    SetWindowInactive {
        window_identifier: String,
    },
    SetAllWindowsInactive,
    ReorderWindows {
        window_identifiers: Vec<String>,
    },
    CleanupWindow {
        window_identifier: String,
    },
    CleanState,
    HydrateFromUrl {
        windows: Vec<WindowState>,
    },

    // Selection and form
    SetSelectedRecord {
        window_identifier: String,
        tab_id: String,
        record_id: String,
    },
    ClearSelectedRecord {
        window_identifier: String,
        tab_id: String,
    },
    SetSelectedRecordAndClearChildren {
        window_identifier: String,
        tab_id: String,
        record_id: String,
        child_tab_ids: Vec<String>,
    },
    ClearChildrenSelections {
        window_identifier: String,
        child_tab_ids: Vec<String>,
        force: bool,
    },
    SetTabFormState {
        window_identifier: String,
        tab_id: String,
        form: TabFormState,
    },
    ClearTabFormState {
        window_identifier: String,
        tab_id: String,
    },
}

/// The whole multi-window state, windows kept in tab-strip order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkspaceState {
    windows: Vec<WindowState>,
}

impl WorkspaceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from a list of windows, sorted by their `order`
    pub fn from_windows(mut windows: Vec<WindowState>) -> Self {
        windows.sort_by_key(|w| w.order);
        Self { windows }
    }

    fn position(&self, window_identifier: &str) -> Option<usize> {
        self.windows
            .iter()
            .position(|w| w.window_identifier == window_identifier)
    }

    fn window_ref(&self, window_identifier: &str) -> Option<&WindowState> {
        self.windows
            .iter()
            .find(|w| w.window_identifier == window_identifier)
    }

    fn tab_ref(&self, window_identifier: &str, tab_id: &str) -> Option<&TabState> {
        self.window_ref(window_identifier)
            .and_then(|w| w.tabs.get(tab_id))
    }

    fn next_order(&self) -> u32 {
        self.windows.iter().map(|w| w.order).max().unwrap_or(0) + 1
    }

    fn renumber(&mut self) {
        for (idx, window) in self.windows.iter_mut().enumerate() {
            window.order = idx as u32 + 1;
        }
    }

    fn ensure_window(&mut self, window_identifier: &str) -> &mut WindowState {
        let idx = match self.position(window_identifier) {
            Some(idx) => idx,
            None => {
                let order = self.next_order();
                debug!("Creating window state for {}", window_identifier);
                self.windows
                    .push(WindowState::new(window_identifier).with_order(order));
                self.windows.len() - 1
            }
        };
        &mut self.windows[idx]
    }

    fn ensure_tab(&mut self, window_identifier: &str, tab_id: &str) -> &mut TabState {
        self.ensure_window(window_identifier)
            .tabs
            .entry(tab_id.to_string())
            .or_default()
    }

    fn existing_tab_mut(&mut self, window_identifier: &str, tab_id: &str) -> Option<&mut TabState> {
        self.windows
            .iter_mut()
            .find(|w| w.window_identifier == window_identifier)
            .and_then(|w| w.tabs.get_mut(tab_id))
    }

    // ---- getters ----

    pub fn get_table_state(&self, window_identifier: &str, tab_id: &str) -> TableState {
        self.tab_ref(window_identifier, tab_id)
            .map(|t| t.table.clone())
            .unwrap_or_default()
    }

    pub fn get_navigation_state(&self, window_identifier: &str) -> NavigationState {
        self.window_ref(window_identifier)
            .map(|w| w.navigation.clone())
            .unwrap_or_default()
    }

    pub fn get_tab_state(&self, window_identifier: &str, tab_id: &str) -> TabState {
        self.tab_ref(window_identifier, tab_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_tab_form_state(&self, window_identifier: &str, tab_id: &str) -> TabFormState {
        self.tab_ref(window_identifier, tab_id)
            .map(|t| t.form.clone())
            .unwrap_or_default()
    }

    pub fn get_selected_record(&self, window_identifier: &str, tab_id: &str) -> Option<String> {
        self.tab_ref(window_identifier, tab_id)
            .and_then(|t| t.selected_record.clone())
    }

    pub fn get_window(&self, window_identifier: &str) -> Option<WindowState> {
        self.window_ref(window_identifier).cloned()
    }

    pub fn get_active_window(&self) -> Option<WindowState> {
        self.windows.iter().find(|w| w.is_active).cloned()
    }

    pub fn get_active_window_identifier(&self) -> Option<String> {
        self.windows
            .iter()
            .find(|w| w.is_active)
            .map(|w| w.window_identifier.clone())
    }

    /// All windows in tab-strip order
    pub fn get_all_windows(&self) -> Vec<WindowState> {
        let mut windows = self.windows.clone();
        windows.sort_by_key(|w| w.order);
        windows
    }

    pub fn get_all_window_identifiers(&self) -> Vec<String> {
        self.windows
            .iter()
            .map(|w| w.window_identifier.clone())
            .collect()
    }

    pub fn windows(&self) -> &[WindowState] {
        &self.windows
    }

    /// True when no window is active (the workspace home screen is shown)
    pub fn is_home_route(&self) -> bool {
        !self.windows.iter().any(|w| w.is_active)
    }

    /// Read one property of the active window.
    ///
    /// Only names in [`WINDOW_PROPERTY_NAMES`] are readable. Empty or unknown
    /// names, a missing active window and unset properties all yield `None`.
    pub fn get_active_window_property(&self, name: &str) -> Option<serde_json::Value> {
        if name.is_empty() || !WINDOW_PROPERTY_NAMES.contains(&name) {
            return None;
        }

        let window = self.windows.iter().find(|w| w.is_active)?;
        let value = serde_json::to_value(window).ok()?;
        value.get(name).filter(|v| !v.is_null()).cloned()
    }
}

/// Apply one action to a state, returning the next state
pub fn reduce(state: &WorkspaceState, action: Action) -> WorkspaceState {
    let mut next = state.clone();

    match action {
        Action::SetTableFilters {
            window_identifier,
            tab_id,
            filters,
        } => {
            next.ensure_tab(&window_identifier, &tab_id).table.filters = filters;
        }
        Action::SetTableVisibility {
            window_identifier,
            tab_id,
            visibility,
        } => {
            let table = &mut next.ensure_tab(&window_identifier, &tab_id).table;
            table.visibility.extend(visibility);
        }
        Action::SetTableSorting {
            window_identifier,
            tab_id,
            sorting,
        } => {
            next.ensure_tab(&window_identifier, &tab_id).table.sorting = sorting;
        }
        Action::SetTableOrder {
            window_identifier,
            tab_id,
            order,
        } => {
            next.ensure_tab(&window_identifier, &tab_id).table.order = order;
        }
        Action::SetTableImplicitFilterApplied {
            window_identifier,
            tab_id,
            is_applied,
        } => {
            next.ensure_tab(&window_identifier, &tab_id)
                .table
                .is_implicit_filter_applied = Some(is_applied);
        }

        Action::SetNavigationActiveLevels {
            window_identifier,
            active_levels,
        } => {
            next.ensure_window(&window_identifier).navigation.active_levels = active_levels;
        }
        Action::SetNavigationActiveTabsByLevel {
            window_identifier,
            active_tabs_by_level,
        } => {
            next.ensure_window(&window_identifier)
                .navigation
                .active_tabs_by_level = active_tabs_by_level;
        }
        Action::SetNavigationInitialized {
            window_identifier,
            initialized,
        } => {
            next.ensure_window(&window_identifier).navigation.initialized = initialized;
        }

        Action::SetWindowActive {
            window_identifier,
            window_data,
        } => {
            for window in next.windows.iter_mut() {
                window.is_active = false;
            }
            let window = next.ensure_window(&window_identifier);
            if let Some(patch) = &window_data {
                patch.apply(window);
            }
            window.is_active = true;
        }
        Action::SetWindowInactive { window_identifier } => {
            match next
                .windows
                .iter_mut()
                .find(|w| w.window_identifier == window_identifier)
            {
                Some(window) => window.is_active = false,
                None => warn!("Cannot deactivate unknown window {}", window_identifier),
            }
        }
        Action::SetAllWindowsInactive => {
            for window in next.windows.iter_mut() {
                window.is_active = false;
            }
        }
        Action::ReorderWindows { window_identifiers } => {
            let rank = |id: &str| {
                window_identifiers
                    .iter()
                    .position(|candidate| candidate == id)
                    .unwrap_or(usize::MAX)
            };
            // Stable: windows missing from the list keep their relative order at the end
            next.windows.sort_by_key(|w| rank(&w.window_identifier));
            next.renumber();
        }
        Action::CleanupWindow { window_identifier } => {
            let Some(idx) = next.position(&window_identifier) else {
                warn!("Cannot clean up unknown window {}", window_identifier);
                return next;
            };

            let removed = next.windows.remove(idx);
            if removed.is_active && !next.windows.is_empty() {
                let neighbour = if idx > 0 { idx - 1 } else { 0 };
                next.windows[neighbour].is_active = true;
                debug!(
                    "Closed active window {}, activating {}",
                    window_identifier, next.windows[neighbour].window_identifier
                );
            }
            next.renumber();
        }
        Action::CleanState => {
            next.windows.clear();
        }
        Action::HydrateFromUrl { windows } => {
            next = hydrate(state, windows);
        }

        Action::SetSelectedRecord {
            window_identifier,
            tab_id,
            record_id,
        } => {
            next.ensure_tab(&window_identifier, &tab_id).selected_record = Some(record_id);
        }
        Action::ClearSelectedRecord {
            window_identifier,
            tab_id,
        } => match next.existing_tab_mut(&window_identifier, &tab_id) {
            Some(tab) => tab.selected_record = None,
            None => warn!(
                "Cannot clear selected record: tab {} not found in window {}",
                tab_id, window_identifier
            ),
        },
        Action::SetSelectedRecordAndClearChildren {
            window_identifier,
            tab_id,
            record_id,
            child_tab_ids,
        } => {
            next.ensure_tab(&window_identifier, &tab_id).selected_record = Some(record_id);
            clear_children(&mut next, &window_identifier, &child_tab_ids, true);
        }
        Action::ClearChildrenSelections {
            window_identifier,
            child_tab_ids,
            force,
        } => {
            clear_children(&mut next, &window_identifier, &child_tab_ids, force);
        }
        Action::SetTabFormState {
            window_identifier,
            tab_id,
            form,
        } => {
            next.ensure_tab(&window_identifier, &tab_id).form = form;
        }
        Action::ClearTabFormState {
            window_identifier,
            tab_id,
        } => match next.existing_tab_mut(&window_identifier, &tab_id) {
            Some(tab) => tab.form = TabFormState::default(),
            None => warn!(
                "Cannot clear form state: tab {} not found in window {}",
                tab_id, window_identifier
            ),
        },
    }

    next
}

fn clear_children(
    state: &mut WorkspaceState,
    window_identifier: &str,
    child_tab_ids: &[String],
    force: bool,
) {
    for child_id in child_tab_ids {
        let Some(child) = state.existing_tab_mut(window_identifier, child_id) else {
            continue;
        };

        if !force && child.form.is_form_view() {
            debug!(
                "Preserving child tab {} in window {}: form view is open",
                child_id, window_identifier
            );
            continue;
        }

        child.selected_record = None;
        child.form = TabFormState::default();
    }
}

/// Merge windows decoded from the URL into the current state.
///
/// The URL owns activity, order, title and the selection/form pointers; the
/// store keeps table and navigation state for windows and tabs that survive.
fn hydrate(state: &WorkspaceState, decoded: Vec<WindowState>) -> WorkspaceState {
    let mut decoded = decoded;
    decoded.sort_by_key(|w| w.order);

    let mut windows = Vec::with_capacity(decoded.len());
    for url_window in decoded {
        let merged = match state.window_ref(&url_window.window_identifier) {
            Some(existing) => {
                let mut merged = existing.clone();
                merged.is_active = url_window.is_active;
                merged.order = url_window.order;
                if url_window.title.is_some() {
                    merged.title = url_window.title.clone();
                }
                merged.form_record_id = url_window.form_record_id.clone();
                merged.form_mode = url_window.form_mode;

                for tab in merged.tabs.values_mut() {
                    tab.selected_record = None;
                    tab.form = TabFormState::default();
                }
                for (tab_id, url_tab) in url_window.tabs {
                    let tab = merged.tabs.entry(tab_id).or_default();
                    tab.selected_record = url_tab.selected_record;
                    tab.form = url_tab.form;
                }
                merged
            }
            None => url_window,
        };
        windows.push(merged);
    }

    let mut seen_active = false;
    for window in windows.iter_mut() {
        if window.is_active {
            if seen_active {
                warn!(
                    "URL marks more than one window active; deactivating {}",
                    window.window_identifier
                );
                window.is_active = false;
            }
            seen_active = true;
        }
    }

    let mut next = WorkspaceState { windows };
    next.renumber();
    next
}

/// Mutable owner of a [`WorkspaceState`] with named setters
#[derive(Debug, Clone, Default)]
pub struct WindowStore {
    state: WorkspaceState,
}

impl WindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: WorkspaceState) -> Self {
        Self { state }
    }

    /// Current state (read-only view)
    pub fn state(&self) -> &WorkspaceState {
        &self.state
    }

    /// Owned copy of the current state
    pub fn snapshot(&self) -> WorkspaceState {
        self.state.clone()
    }

    pub fn dispatch(&mut self, action: Action) {
        self.state = reduce(&self.state, action);
    }

    // ---- table ----

    pub fn get_table_state(&self, window_identifier: &str, tab_id: &str) -> TableState {
        self.state.get_table_state(window_identifier, tab_id)
    }

    pub fn set_table_filters(&mut self, window_identifier: &str, tab_id: &str, filters: Vec<ColumnFilter>) {
        self.dispatch(Action::SetTableFilters {
            window_identifier: window_identifier.to_string(),
            tab_id: tab_id.to_string(),
            filters,
        });
    }

    pub fn set_table_visibility(
        &mut self,
        window_identifier: &str,
        tab_id: &str,
        visibility: VisibilityState,
    ) {
        self.dispatch(Action::SetTableVisibility {
            window_identifier: window_identifier.to_string(),
            tab_id: tab_id.to_string(),
            visibility,
        });
    }

    pub fn set_table_sorting(&mut self, window_identifier: &str, tab_id: &str, sorting: Vec<ColumnSort>) {
        self.dispatch(Action::SetTableSorting {
            window_identifier: window_identifier.to_string(),
            tab_id: tab_id.to_string(),
            sorting,
        });
    }

    pub fn set_table_order(&mut self, window_identifier: &str, tab_id: &str, order: Vec<String>) {
        self.dispatch(Action::SetTableOrder {
            window_identifier: window_identifier.to_string(),
            tab_id: tab_id.to_string(),
            order,
        });
    }

    pub fn set_table_implicit_filter_applied(
        &mut self,
        window_identifier: &str,
        tab_id: &str,
        is_applied: bool,
    ) {
        self.dispatch(Action::SetTableImplicitFilterApplied {
            window_identifier: window_identifier.to_string(),
            tab_id: tab_id.to_string(),
            is_applied,
        });
    }

    // ---- navigation ----

    pub fn get_navigation_state(&self, window_identifier: &str) -> NavigationState {
        self.state.get_navigation_state(window_identifier)
    }

    pub fn set_navigation_active_levels(&mut self, window_identifier: &str, active_levels: Vec<usize>) {
        self.dispatch(Action::SetNavigationActiveLevels {
            window_identifier: window_identifier.to_string(),
            active_levels,
        });
    }

    pub fn set_navigation_active_tabs_by_level(
        &mut self,
        window_identifier: &str,
        active_tabs_by_level: BTreeMap<usize, String>,
    ) {
        self.dispatch(Action::SetNavigationActiveTabsByLevel {
            window_identifier: window_identifier.to_string(),
            active_tabs_by_level,
        });
    }

    pub fn set_navigation_initialized(&mut self, window_identifier: &str, initialized: bool) {
        self.dispatch(Action::SetNavigationInitialized {
            window_identifier: window_identifier.to_string(),
            initialized,
        });
    }

    // ---- windows ----

    pub fn set_window_active(&mut self, window_identifier: &str, window_data: Option<WindowPatch>) {
        self.dispatch(Action::SetWindowActive {
            window_identifier: window_identifier.to_string(),
            window_data,
        });
    }

    pub fn set_window_inactive(&mut self, window_identifier: &str) {
        self.dispatch(Action::SetWindowInactive {
            window_identifier: window_identifier.to_string(),
        });
    }

    pub fn set_all_windows_inactive(&mut self) {
        self.dispatch(Action::SetAllWindowsInactive);
    }

    pub fn reorder_windows(&mut self, window_identifiers: Vec<String>) {
        self.dispatch(Action::ReorderWindows { window_identifiers });
    }

    pub fn cleanup_window(&mut self, window_identifier: &str) {
        self.dispatch(Action::CleanupWindow {
            window_identifier: window_identifier.to_string(),
        });
    }

    pub fn clean_state(&mut self) {
        self.dispatch(Action::CleanState);
    }

    pub fn hydrate_from_url(&mut self, windows: Vec<WindowState>) {
        self.dispatch(Action::HydrateFromUrl { windows });
    }

    pub fn get_active_window(&self) -> Option<WindowState> {
        self.state.get_active_window()
    }

    pub fn get_active_window_identifier(&self) -> Option<String> {
        self.state.get_active_window_identifier()
    }

    pub fn get_all_windows(&self) -> Vec<WindowState> {
        self.state.get_all_windows()
    }

    pub fn get_all_window_identifiers(&self) -> Vec<String> {
        self.state.get_all_window_identifiers()
    }

    pub fn get_active_window_property(&self, name: &str) -> Option<serde_json::Value> {
        self.state.get_active_window_property(name)
    }

    pub fn is_home_route(&self) -> bool {
        self.state.is_home_route()
    }

    // ---- selection & form ----

    pub fn get_selected_record(&self, window_identifier: &str, tab_id: &str) -> Option<String> {
        self.state.get_selected_record(window_identifier, tab_id)
    }

    pub fn set_selected_record(&mut self, window_identifier: &str, tab_id: &str, record_id: &str) {
        self.dispatch(Action::SetSelectedRecord {
            window_identifier: window_identifier.to_string(),
            tab_id: tab_id.to_string(),
            record_id: record_id.to_string(),
        });
    }

    pub fn clear_selected_record(&mut self, window_identifier: &str, tab_id: &str) {
        self.dispatch(Action::ClearSelectedRecord {
            window_identifier: window_identifier.to_string(),
            tab_id: tab_id.to_string(),
        });
    }

    pub fn set_selected_record_and_clear_children(
        &mut self,
        window_identifier: &str,
        tab_id: &str,
        record_id: &str,
        child_tab_ids: &[String],
    ) {
        self.dispatch(Action::SetSelectedRecordAndClearChildren {
            window_identifier: window_identifier.to_string(),
            tab_id: tab_id.to_string(),
            record_id: record_id.to_string(),
            child_tab_ids: child_tab_ids.to_vec(),
        });
    }

    pub fn clear_children_selections(
        &mut self,
        window_identifier: &str,
        child_tab_ids: &[String],
        force: bool,
    ) {
        self.dispatch(Action::ClearChildrenSelections {
            window_identifier: window_identifier.to_string(),
            child_tab_ids: child_tab_ids.to_vec(),
            force,
        });
    }

    pub fn get_tab_form_state(&self, window_identifier: &str, tab_id: &str) -> TabFormState {
        self.state.get_tab_form_state(window_identifier, tab_id)
    }

    /// Point a tab at a record form, filling in default modes
    pub fn set_tab_form_state(
        &mut self,
        window_identifier: &str,
        tab_id: &str,
        record_id: &str,
        mode: Option<TabMode>,
        form_mode: Option<FormMode>,
    ) {
        let form = TabFormState::for_record(record_id, mode, form_mode);
        self.replace_tab_form_state(window_identifier, tab_id, form);
    }

    pub fn replace_tab_form_state(&mut self, window_identifier: &str, tab_id: &str, form: TabFormState) {
        self.dispatch(Action::SetTabFormState {
            window_identifier: window_identifier.to_string(),
            tab_id: tab_id.to_string(),
            form,
        });
    }

    pub fn clear_tab_form_state(&mut self, window_identifier: &str, tab_id: &str) {
        self.dispatch(Action::ClearTabFormState {
            window_identifier: window_identifier.to_string(),
            tab_id: tab_id.to_string(),
        });
    }
}
