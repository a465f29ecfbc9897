//! Table state persistence facade
//!
//! A per-(window, tab) view over the [`WindowStore`]. Setters take either a new
//! value or an updater closure; closures are resolved against the value
//! currently in the store before the store setter runs, so independent callers
//! compose without reading and rewriting the whole window tree.

use std::collections::BTreeMap;

use log::debug;

use crate::window::{
    ColumnFilter, ColumnSort, NavigationState, TableState, VisibilityState, WindowStore,
};

/// Either a replacement value or a function of the previous value
pub enum Updater<T> {
    Value(T),
    Update(Box<dyn FnOnce(&T) -> T>),
}

impl<T> Updater<T> {
    pub fn with(f: impl FnOnce(&T) -> T + 'static) -> Self {
        Updater::Update(Box::new(f))
    }

    pub fn resolve(self, current: &T) -> T {
        match self {
            Updater::Value(value) => value,
            Updater::Update(f) => f(current),
        }
    }
}

impl<T> From<T> for Updater<T> {
    fn from(value: T) -> Self {
        Updater::Value(value)
    }
}

/// Table and navigation slice of one tab
pub struct TableStatePersistence<'a> {
    store: &'a mut WindowStore,
    window_identifier: String,
    tab_id: String,
}

impl<'a> TableStatePersistence<'a> {
    pub fn new(
        store: &'a mut WindowStore,
        window_identifier: impl Into<String>,
        tab_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            window_identifier: window_identifier.into(),
            tab_id: tab_id.into(),
        }
    }

    pub fn table_state(&self) -> TableState {
        self.store
            .get_table_state(&self.window_identifier, &self.tab_id)
    }

    pub fn navigation(&self) -> NavigationState {
        self.store.get_navigation_state(&self.window_identifier)
    }

    pub fn filters(&self) -> Vec<ColumnFilter> {
        self.table_state().filters
    }

    pub fn visibility(&self) -> VisibilityState {
        self.table_state().visibility
    }

    pub fn sorting(&self) -> Vec<ColumnSort> {
        self.table_state().sorting
    }

    pub fn order(&self) -> Vec<String> {
        self.table_state().order
    }

    pub fn is_implicit_filter_applied(&self) -> Option<bool> {
        self.table_state().is_implicit_filter_applied
    }

    pub fn set_filters(&mut self, update: impl Into<Updater<Vec<ColumnFilter>>>) {
        let filters = update.into().resolve(&self.filters());
        self.store
            .set_table_filters(&self.window_identifier, &self.tab_id, filters);
    }

    /// The resolved map is merged into the stored one
    pub fn set_visibility(&mut self, update: impl Into<Updater<VisibilityState>>) {
        let visibility = update.into().resolve(&self.visibility());
        self.store
            .set_table_visibility(&self.window_identifier, &self.tab_id, visibility);
    }

    pub fn set_sorting(&mut self, update: impl Into<Updater<Vec<ColumnSort>>>) {
        let sorting = update.into().resolve(&self.sorting());
        self.store
            .set_table_sorting(&self.window_identifier, &self.tab_id, sorting);
    }

    pub fn set_order(&mut self, update: impl Into<Updater<Vec<String>>>) {
        let order = update.into().resolve(&self.order());
        self.store
            .set_table_order(&self.window_identifier, &self.tab_id, order);
    }

    pub fn set_implicit_filter_applied(&mut self, is_applied: bool) {
        self.store.set_table_implicit_filter_applied(
            &self.window_identifier,
            &self.tab_id,
            is_applied,
        );
    }

    /// Focus a hierarchy level.
    ///
    /// With `expand` only that level stays open. Otherwise the level is shown
    /// next to its parent level, unless it is already visible.
    pub fn set_active_level(&mut self, level: usize, expand: bool) {
        let current = self.navigation().active_levels;
        let next = next_active_levels(&current, level, expand);
        if next != current {
            debug!(
                "Active levels for {}: {:?} -> {:?}",
                self.window_identifier, current, next
            );
        }
        self.store
            .set_navigation_active_levels(&self.window_identifier, next);
    }

    /// Record the tab shown at a level; `None` clears every level.
    ///
    /// Deeper levels are dropped since their tabs hang off the replaced one.
    pub fn set_active_tabs_by_level(&mut self, tab: Option<(usize, &str)>) {
        let next = match tab {
            None => BTreeMap::new(),
            Some((level, tab_id)) => {
                let mut map = self.navigation().active_tabs_by_level;
                map.retain(|l, _| *l < level);
                map.insert(level, tab_id.to_string());
                map
            }
        };
        self.store
            .set_navigation_active_tabs_by_level(&self.window_identifier, next);
    }
}

fn next_active_levels(current: &[usize], level: usize, expand: bool) -> Vec<usize> {
    if expand {
        return vec![level];
    }
    if level == 0 {
        return vec![0];
    }
    if current.contains(&level) {
        return current.to_vec();
    }

    let max = current.iter().copied().max().unwrap_or(0);
    if level > max {
        vec![max, level]
    } else {
        vec![level - 1, level]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_and_updater_setters() {
        let mut store = WindowStore::new();
        let mut table = TableStatePersistence::new(&mut store, "w_1", "t");

        table.set_sorting(vec![ColumnSort::asc("name")]);
        table.set_sorting(Updater::with(|prev: &Vec<ColumnSort>| {
            let mut next = prev.clone();
            next.push(ColumnSort::desc("date"));
            next
        }));

        assert_eq!(
            table.sorting(),
            vec![ColumnSort::asc("name"), ColumnSort::desc("date")]
        );
    }

    #[test]
    fn test_updaters_compose_against_current_value() {
        let mut store = WindowStore::new();
        {
            let mut table = TableStatePersistence::new(&mut store, "w_1", "t");
            table.set_filters(vec![ColumnFilter::new("a", "1")]);
        }
        {
            let mut table = TableStatePersistence::new(&mut store, "w_1", "t");
            table.set_filters(Updater::with(|prev: &Vec<ColumnFilter>| {
                let mut next = prev.clone();
                next.push(ColumnFilter::new("b", "2"));
                next
            }));
        }

        assert_eq!(store.get_table_state("w_1", "t").filters.len(), 2);
    }

    #[test]
    fn test_visibility_updater_merges() {
        let mut store = WindowStore::new();
        let mut table = TableStatePersistence::new(&mut store, "w_1", "t");

        table.set_visibility(VisibilityState::from([("Name".to_string(), false)]));
        table.set_visibility(Updater::with(|_: &VisibilityState| {
            VisibilityState::from([("Date".to_string(), true)])
        }));

        assert_eq!(table.visibility().len(), 2);
        assert!(!table.visibility()["Name"]);
    }

    #[test]
    fn test_next_active_levels() {
        assert_eq!(next_active_levels(&[0], 2, true), vec![2]);
        assert_eq!(next_active_levels(&[1, 2], 0, false), vec![0]);
        assert_eq!(next_active_levels(&[0, 1], 1, false), vec![0, 1]);
        assert_eq!(next_active_levels(&[0, 1], 2, false), vec![1, 2]);
        assert_eq!(next_active_levels(&[2, 3], 1, false), vec![0, 1]);
    }

    #[test]
    fn test_set_active_level_writes_navigation() {
        let mut store = WindowStore::new();
        let mut table = TableStatePersistence::new(&mut store, "w_1", "t");
        table.set_active_level(1, false);
        assert_eq!(table.navigation().active_levels, vec![0, 1]);
    }

    #[test]
    fn test_set_active_tabs_by_level() {
        let mut store = WindowStore::new();
        let mut table = TableStatePersistence::new(&mut store, "w_1", "t");

        table.set_active_tabs_by_level(Some((1, "lines")));
        table.set_active_tabs_by_level(Some((2, "taxes")));
        table.set_active_tabs_by_level(Some((1, "payments")));
        let tabs = table.navigation().active_tabs_by_level;
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[&1], "payments");

        table.set_active_tabs_by_level(None);
        assert!(table.navigation().active_tabs_by_level.is_empty());
    }
}
