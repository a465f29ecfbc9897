use proptest::prelude::*;

use erp_workspace::url::{decode, encode, MemoryHistory, UrlNavigator};
use erp_workspace::window::{
    FormMode, TabFormState, TabMode, TabState, WindowState, WindowStore, NEW_RECORD_ID,
};

// Bare ids, ids sharing a definition, ids with extra `_` segments and an id
// shaped like a minted token
const IDENTIFIERS: [&str; 9] = [
    "a", "a_b", "143", "143_1", "143_2", "143_2_x", "143~2", "SalesOrder_7", "800_5",
];
const WINDOW_ID_OVERRIDES: [&str; 3] = ["SalesOrder", "143", "a"];
const TAB_IDS: [&str; 5] = ["186", "2_x", "lines", "a_b", "C2E5"];

fn tab_strategy() -> impl Strategy<Value = TabState> {
    (
        prop::option::of("r[0-9]{1,4}"),
        0..3u8,
        "r[0-9]{1,4}",
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(selected_record, form_kind, form_record, form_view, editing)| {
            let form = match form_kind {
                0 => TabFormState::default(),
                1 => TabFormState::for_record(NEW_RECORD_ID, None, None),
                _ => {
                    let mode = if form_view { TabMode::Form } else { TabMode::Table };
                    let form_mode = if editing { FormMode::Edit } else { FormMode::View };
                    TabFormState::for_record(form_record, Some(mode), Some(form_mode))
                }
            };
            TabState {
                selected_record,
                form,
                ..TabState::default()
            }
        })
}

fn window_strategy(identifier: &'static str) -> impl Strategy<Value = WindowState> {
    (
        prop::option::of(prop::sample::select(WINDOW_ID_OVERRIDES.to_vec())),
        prop::option::of("[A-Za-z &=%+#]{1,12}"),
        prop::collection::btree_map(
            prop::sample::select(TAB_IDS.to_vec()).prop_map(str::to_string),
            tab_strategy(),
            0..4,
        ),
    )
        .prop_map(move |(window_id, title, tabs)| {
            let mut window = WindowState::new(identifier);
            if let Some(window_id) = window_id {
                window.window_id = window_id.to_string();
            }
            window.title = title;
            window.tabs = tabs;
            window
        })
}

fn windows_strategy() -> impl Strategy<Value = Vec<WindowState>> {
    prop::sample::subsequence(IDENTIFIERS.to_vec(), 1..=4)
        .prop_shuffle()
        .prop_flat_map(|identifiers| {
            let count = identifiers.len();
            let windows: Vec<_> = identifiers.into_iter().map(window_strategy).collect();
            (windows, 0..=count)
        })
        .prop_map(|(mut windows, active)| {
            for (i, window) in windows.iter_mut().enumerate() {
                window.order = i as u32 + 1;
                window.is_active = i == active;
            }
            windows
        })
}

proptest! {
    #[test]
    fn test_round_trip_generated_windows(windows in windows_strategy()) {
        let expected: Vec<WindowState> = windows.iter().map(WindowState::normalized).collect();
        let query = encode(&windows);

        prop_assert_eq!(decode(&query), expected, "query: {}", query);
    }
}

#[test]
fn test_round_trip_is_order_normalized() {
    let windows = vec![
        WindowState::new("800_2").with_order(3),
        WindowState::new("143_1").with_order(1).active(),
        WindowState::new("181_9").with_order(2),
    ];

    let identifiers: Vec<String> = decode(&encode(&windows))
        .into_iter()
        .map(|w| w.window_identifier)
        .collect();
    assert_eq!(identifiers, vec!["143_1", "181_9", "800_2"]);
}

#[test]
fn test_navigator_hydrates_store_from_url() {
    let mut store = WindowStore::new();
    store.set_window_active("143_1", None);
    store.set_selected_record("143_1", "186", "r1");
    store.set_tab_form_state("143_1", "187", "l1", None, None);
    store.set_window_active("181_2", None);

    let mut navigator = UrlNavigator::new(MemoryHistory::new("/"), "/window");
    assert!(navigator.sync(&store.get_all_windows()));
    assert!(!navigator.sync(&store.get_all_windows()));

    // A reload starts from an empty store and the URL alone
    let mut reloaded = WindowStore::new();
    reloaded.hydrate_from_url(navigator.current_windows());

    assert_eq!(reloaded.get_active_window_identifier().as_deref(), Some("181_2"));
    assert_eq!(reloaded.get_selected_record("143_1", "186").as_deref(), Some("r1"));
    assert!(reloaded.get_tab_form_state("143_1", "187").is_form_view());
    assert_eq!(reloaded.get_all_window_identifiers(), vec!["143_1", "181_2"]);
}

#[test]
fn test_stale_keys_are_ignored() {
    let windows = decode("w_143=active&o_143=1&s_143_186=r1&s_999_186=ghost&tf_777_1=x");
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].tabs.len(), 1);
}
