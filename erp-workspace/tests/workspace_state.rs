use std::collections::HashMap;

use serde_json::json;

use erp_workspace::persistence::{TableStatePersistence, Updater};
use erp_workspace::reconcile::{
    reconcile_parent_selection, CascadeDecision, ParentSelectionChange, SelectionChangeKind,
    SelectionTracker, TabGraph, TabNode,
};
use erp_workspace::window::{
    reduce, Action, ColumnFilter, ColumnSort, WindowPatch, WindowStore, WorkspaceState,
    NEW_RECORD_ID,
};

const W: &str = "143_1";

fn order_graph() -> TabGraph {
    TabGraph::build(vec![
        TabNode::root("P"),
        TabNode::child("A", "P"),
        TabNode::child("B", "P"),
        TabNode::child("A1", "A"),
    ])
}

fn active_count(state: &WorkspaceState) -> usize {
    state.windows().iter().filter(|w| w.is_active).count()
}

#[test]
fn test_single_active_window_after_any_activation_sequence() {
    let mut state = WorkspaceState::new();
    assert_eq!(active_count(&state), 0);

    let sequence = ["a_1", "b_2", "a_1", "c_3", "c_3", "b_2", "d_4"];
    for identifier in sequence {
        state = reduce(
            &state,
            Action::SetWindowActive {
                window_identifier: identifier.to_string(),
                window_data: Some(WindowPatch::titled(identifier.to_uppercase())),
            },
        );
        assert_eq!(active_count(&state), 1);
        assert_eq!(state.get_active_window_identifier().as_deref(), Some(identifier));
    }

    let orders: Vec<u32> = state.get_all_windows().iter().map(|w| w.order).collect();
    assert_eq!(orders, vec![1, 2, 3, 4]);
}

#[test]
fn test_cleanup_activates_predecessor_then_successor() {
    let mut store = WindowStore::new();
    store.set_window_active("a_1", None);
    store.set_window_active("b_2", None);
    store.set_window_active("c_3", None);

    store.set_window_active("b_2", None);
    store.cleanup_window("b_2");
    assert_eq!(store.get_active_window_identifier().as_deref(), Some("a_1"));

    store.cleanup_window("a_1");
    assert_eq!(store.get_active_window_identifier().as_deref(), Some("c_3"));
    assert_eq!(store.get_all_windows()[0].order, 1);

    store.cleanup_window("c_3");
    assert!(store.is_home_route());
}

#[test]
fn test_cascade_preserves_editing_child_and_clears_table_child() {
    let mut store = WindowStore::new();
    store.set_window_active(W, None);
    store.set_selected_record(W, "P", "r1");
    store.set_selected_record(W, "A", "a1");
    store.set_tab_form_state(W, "A", "a1", None, None);
    store.set_selected_record(W, "A1", "x1");
    store.set_selected_record(W, "B", "b1");

    let graph = order_graph();
    let mut tracker = SelectionTracker::new();
    tracker.observe(&mut store, &graph, W, "P", SelectionChangeKind::Navigation, false);

    let form_before = store.get_tab_form_state(W, "A");
    store.set_selected_record(W, "P", "r2");
    let decision = tracker.observe(&mut store, &graph, W, "P", SelectionChangeKind::Navigation, false);

    assert!(matches!(decision, CascadeDecision::Cascade { .. }));
    assert_eq!(store.get_tab_form_state(W, "A"), form_before);
    assert_eq!(store.get_selected_record(W, "A").as_deref(), Some("a1"));
    assert_eq!(store.get_selected_record(W, "A1").as_deref(), Some("x1"));
    assert_eq!(store.get_selected_record(W, "B"), None);
}

#[test]
fn test_clearing_parent_selection_cascades_through_tracker() {
    let mut store = WindowStore::new();
    store.set_window_active(W, None);
    store.set_selected_record(W, "P", "r1");
    store.set_selected_record(W, "A", "a1");
    store.set_selected_record(W, "A1", "x1");
    store.set_selected_record(W, "B", "b1");
    store.set_tab_form_state(W, "B", "b1", None, None);

    let graph = order_graph();
    let mut tracker = SelectionTracker::new();
    tracker.observe(&mut store, &graph, W, "P", SelectionChangeKind::Navigation, false);

    store.clear_selected_record(W, "P");
    let decision = tracker.observe(&mut store, &graph, W, "P", SelectionChangeKind::Navigation, false);

    assert_eq!(
        decision,
        CascadeDecision::Cascade {
            cleared: vec!["A".to_string(), "A1".to_string()],
            preserved: vec!["B".to_string()],
        }
    );
    assert_eq!(store.get_selected_record(W, "A"), None);
    assert_eq!(store.get_selected_record(W, "A1"), None);
    assert_eq!(store.get_selected_record(W, "B").as_deref(), Some("b1"));
    assert!(store.get_tab_form_state(W, "B").is_form_view());
}

#[test]
fn test_save_transition_does_not_clear_children() {
    let mut store = WindowStore::new();
    store.set_selected_record(W, "P", NEW_RECORD_ID);
    store.set_selected_record(W, "B", "b1");
    store.set_selected_record(W, "A", "a1");

    let change = ParentSelectionChange::new(W, "P", Some(NEW_RECORD_ID), Some("r1"));
    let (next, decision) = reconcile_parent_selection(store.state(), &change, &order_graph());

    assert_eq!(decision, CascadeDecision::SaveTransition);
    assert_eq!(&next, store.state());
}

#[test]
fn test_visibility_merges_filters_replace() {
    let mut store = WindowStore::new();

    store.set_table_visibility(W, "P", HashMap::from([("c1".to_string(), false)]));
    store.set_table_visibility(W, "P", HashMap::from([("c2".to_string(), true)]));
    assert_eq!(
        store.get_table_state(W, "P").visibility,
        HashMap::from([("c1".to_string(), false), ("c2".to_string(), true)])
    );

    store.set_table_filters(W, "P", vec![ColumnFilter::new("status", json!(["CO"]))]);
    store.set_table_filters(W, "P", vec![ColumnFilter::new("docNo", json!("100"))]);
    assert_eq!(
        store.get_table_state(W, "P").filters,
        vec![ColumnFilter::new("docNo", json!("100"))]
    );

    assert!(store.get_table_state(W, "B").filters.is_empty());
}

#[test]
fn test_persistence_updaters_compose() {
    let mut store = WindowStore::new();
    {
        let mut table = TableStatePersistence::new(&mut store, W, "P");
        table.set_sorting(vec![ColumnSort::asc("documentNo")]);
        table.set_sorting(Updater::with(|prev: &Vec<ColumnSort>| {
            let mut next = prev.clone();
            next.push(ColumnSort::desc("orderDate"));
            next
        }));
        table.set_active_level(1, false);
        table.set_active_tabs_by_level(Some((1, "A")));
    }

    assert_eq!(
        store.get_table_state(W, "P").sorting,
        vec![ColumnSort::asc("documentNo"), ColumnSort::desc("orderDate")]
    );
    let navigation = store.get_navigation_state(W);
    assert_eq!(navigation.active_levels, vec![0, 1]);
    assert_eq!(navigation.active_tabs_by_level.get(&1).map(String::as_str), Some("A"));
}
