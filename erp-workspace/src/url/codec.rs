//! Window list <-> query string codec
//!
//! `decode` is total: malformed pairs, unknown keys and keys belonging to a
//! window without a `w_` entry are dropped silently. `encode` writes only
//! non-default values, so `decode(&encode(ws))` equals `ws` normalized
//! (see [`WindowState::normalized`]).

use std::collections::{HashMap, HashSet};

use log::debug;

use super::keys::{
    self, tab_key, window_key, ACTIVE, FORM_MODE_PREFIX, FORM_RECORD_PREFIX, INACTIVE,
    ORDER_PREFIX, SELECTED_PREFIX, TAB_FORM_MODE_PREFIX, TAB_FORM_PREFIX, TAB_MODE_PREFIX,
    TAB_PREFIXES, TITLE_PREFIX, TOKEN_SUFFIX_SEPARATOR, WINDOW_IDENTIFIER_PREFIX,
    WINDOW_ID_PREFIX, WINDOW_PREFIX,
};
use crate::window::{window_id_from_identifier, FormMode, TabMode, WindowState};

/// Split a query string into decoded `(key, value)` pairs.
///
/// Accepts a bare query, a query with a leading `?` or a full href.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    let query = match query.split_once('?') {
        Some((_, rest)) => rest,
        None => query,
    };
    let query = query.split('#').next().unwrap_or_default();

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match (decode_component(key), decode_component(value)) {
                (Some(key), Some(value)) => Some((key, value)),
                _ => {
                    debug!("Dropping undecodable query pair: {}", pair);
                    None
                }
            }
        })
        .collect()
}

fn decode_component(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|s| s.into_owned())
}

/// Rebuild the window list from a query string, ordered by `o_` ascending.
///
/// Windows without an order sort after the ordered ones and are numbered
/// after the highest order seen.
pub fn decode(query: &str) -> Vec<WindowState> {
    let pairs = parse_query(query);

    // Last occurrence of a key wins
    let mut params: HashMap<&str, &str> = HashMap::new();
    let mut tokens: Vec<&str> = Vec::new();
    for (key, value) in &pairs {
        if let Some(token) = key.strip_prefix(WINDOW_PREFIX)
            && !token.is_empty()
            && !tokens.contains(&token)
        {
            tokens.push(token);
        }
        params.insert(key.as_str(), value.as_str());
    }

    let get = |prefix: &str, token: &str| -> Option<String> {
        params
            .get(window_key(prefix, token).as_str())
            .filter(|v| !v.is_empty())
            .map(|v| v.to_string())
    };

    let mut decoded: Vec<(&str, Option<u32>, WindowState)> = tokens
        .iter()
        .map(|token| {
            let instance = get(WINDOW_IDENTIFIER_PREFIX, token);
            // A token next to `wi_` is the definition id; a bare token is the identifier
            let window_id = get(WINDOW_ID_PREFIX, token).unwrap_or_else(|| match instance {
                Some(_) => token.to_string(),
                None => window_id_from_identifier(token).to_string(),
            });
            let mut window = WindowState::new(instance.unwrap_or_else(|| token.to_string()));
            window.window_id = window_id;
            window.is_active = get(WINDOW_PREFIX, token).as_deref() == Some(ACTIVE);
            window.title = get(TITLE_PREFIX, token);
            window.form_record_id = get(FORM_RECORD_PREFIX, token);
            window.form_mode = get(FORM_MODE_PREFIX, token).and_then(|m| FormMode::parse(&m));
            let order = get(ORDER_PREFIX, token).and_then(|o| o.trim().parse::<u32>().ok());
            (*token, order, window)
        })
        .collect();

    for (key, value) in &params {
        if value.is_empty() {
            continue;
        }
        let Some((prefix, rest)) = TAB_PREFIXES
            .iter()
            .find_map(|prefix| key.strip_prefix(prefix).map(|rest| (*prefix, rest)))
        else {
            continue;
        };
        let Some((idx, tab_id)) = match_tab_key(&tokens, rest) else {
            debug!("Ignoring key for unknown window: {}", key);
            continue;
        };

        let tab = decoded[idx].2.tabs.entry(tab_id.to_string()).or_default();
        match prefix {
            SELECTED_PREFIX => tab.selected_record = Some(value.to_string()),
            TAB_FORM_PREFIX => tab.form.record_id = Some(value.to_string()),
            TAB_MODE_PREFIX => tab.form.mode = TabMode::parse(value),
            TAB_FORM_MODE_PREFIX => tab.form.form_mode = FormMode::parse(value),
            _ => {}
        }
    }

    decoded.sort_by_key(|(_, order, _)| order.unwrap_or(u32::MAX));
    let mut next_order = decoded
        .iter()
        .filter_map(|(_, order, _)| *order)
        .max()
        .unwrap_or(0);

    decoded
        .into_iter()
        .map(|(_, order, mut window)| {
            window.order = match order {
                Some(order) => order,
                None => {
                    next_order += 1;
                    next_order
                }
            };
            window.tabs.retain(|_, tab| tab.has_url_state());
            window
        })
        .collect()
}

/// Find the window a tab-level key belongs to (longest token wins)
fn match_tab_key<'a>(tokens: &[&str], rest: &'a str) -> Option<(usize, &'a str)> {
    tokens
        .iter()
        .enumerate()
        .filter_map(|(idx, token)| {
            rest.strip_prefix(token)
                .and_then(|r| r.strip_prefix('_'))
                .filter(|tab_id| !tab_id.is_empty())
                .map(|tab_id| (idx, token.len(), tab_id))
        })
        .max_by_key(|(_, len, _)| *len)
        .map(|(idx, _, tab_id)| (idx, tab_id))
}

/// Two tokens clash when they are equal or one of them followed by `_`
/// starts the other, which would make tab-level keys ambiguous.
fn tokens_clash(a: &str, b: &str) -> bool {
    fn extends(longer: &str, shorter: &str) -> bool {
        longer
            .strip_prefix(shorter)
            .is_some_and(|rest| rest.starts_with('_'))
    }
    a == b || extends(a, b) || extends(b, a)
}

/// Pick the key token for each window.
///
/// The first window of a definition is keyed by its `windowId`, further
/// instances by their identifier. When both are taken (or would clash with a
/// token already in use) a `{windowId}~{n}` token is minted and the ids travel
/// in `wi_`/`wd_`.
fn assign_tokens(windows: &[&WindowState]) -> Vec<String> {
    let mut used: Vec<String> = Vec::with_capacity(windows.len());
    for window in windows {
        let is_free =
            |token: &str| !token.is_empty() && !used.iter().any(|other| tokens_clash(token, other));

        let token = if is_free(window.window_id.as_str()) {
            window.window_id.clone()
        } else if is_free(window.window_identifier.as_str()) {
            window.window_identifier.clone()
        } else {
            let base = if window.window_id.is_empty() {
                "w"
            } else {
                window.window_id.as_str()
            };
            (2..)
                .map(|n| format!("{}{}{}", base, TOKEN_SUFFIX_SEPARATOR, n))
                .find(|candidate| is_free(candidate.as_str()))
                .unwrap_or_default()
        };
        used.push(token);
    }
    used
}

/// Serialize windows into a query string (without the leading `?`)
pub fn encode(windows: &[WindowState]) -> String {
    let mut ordered: Vec<&WindowState> = windows.iter().collect();
    ordered.sort_by_key(|w| w.order);
    let tokens = assign_tokens(&ordered);

    let mut pairs: Vec<(String, String)> = Vec::new();
    for (window, token) in ordered.iter().zip(&tokens) {
        let window = window.normalized();
        let state = if window.is_active { ACTIVE } else { INACTIVE };

        pairs.push((window_key(WINDOW_PREFIX, token), state.to_string()));
        pairs.push((window_key(ORDER_PREFIX, token), window.order.to_string()));
        let writes_identifier = &window.window_identifier != token;
        if writes_identifier {
            pairs.push((
                window_key(WINDOW_IDENTIFIER_PREFIX, token),
                window.window_identifier.clone(),
            ));
        }
        let implied_window_id = if writes_identifier {
            token.as_str()
        } else {
            window_id_from_identifier(token)
        };
        if window.window_id != implied_window_id {
            pairs.push((window_key(WINDOW_ID_PREFIX, token), window.window_id.clone()));
        }
        if let Some(title) = &window.title {
            pairs.push((window_key(TITLE_PREFIX, token), title.clone()));
        }
        if let Some(record_id) = &window.form_record_id {
            pairs.push((window_key(FORM_RECORD_PREFIX, token), record_id.clone()));
        }
        if let Some(form_mode) = window.form_mode {
            pairs.push((window_key(FORM_MODE_PREFIX, token), form_mode.as_str().to_string()));
        }

        for (tab_id, tab) in &window.tabs {
            if let Some(record_id) = &tab.selected_record {
                pairs.push((tab_key(SELECTED_PREFIX, token, tab_id), record_id.clone()));
            }
            if let Some(record_id) = &tab.form.record_id {
                pairs.push((tab_key(TAB_FORM_PREFIX, token, tab_id), record_id.clone()));
            }
            if let Some(mode) = tab.form.mode {
                pairs.push((tab_key(TAB_MODE_PREFIX, token, tab_id), mode.as_str().to_string()));
            }
            if let Some(form_mode) = tab.form.form_mode {
                pairs.push((
                    tab_key(TAB_FORM_MODE_PREFIX, token, tab_id),
                    form_mode.as_str().to_string(),
                ));
            }
        }
    }

    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Whether a query string carries any window state
pub fn has_windows(query: &str) -> bool {
    parse_query(query)
        .iter()
        .any(|(key, _)| key.len() > keys::WINDOW_PREFIX.len() && key.starts_with(WINDOW_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{TabFormState, TabState, NEW_RECORD_ID};

    fn window_with_tabs(identifier: &str, order: u32, active: bool) -> WindowState {
        let mut window = WindowState::new(identifier).with_order(order).with_title("Sales Order");
        window.is_active = active;
        window.tabs.insert(
            "header".to_string(),
            TabState {
                selected_record: Some("ABC123".to_string()),
                ..TabState::default()
            },
        );
        window.tabs.insert(
            "lines".to_string(),
            TabState {
                selected_record: Some("L1".to_string()),
                form: TabFormState::for_record("L1", None, None),
                ..TabState::default()
            },
        );
        window
    }

    #[test]
    fn test_decode_basic_keys() {
        let windows = decode("?w_143=active&o_143=1&t_143=Sales%20Order&s_143_header=ABC");

        assert_eq!(windows.len(), 1);
        let window = &windows[0];
        assert_eq!(window.window_id, "143");
        assert_eq!(window.window_identifier, "143");
        assert!(window.is_active);
        assert_eq!(window.order, 1);
        assert_eq!(window.title.as_deref(), Some("Sales Order"));
        assert_eq!(window.tabs["header"].selected_record.as_deref(), Some("ABC"));
    }

    #[test]
    fn test_decode_ignores_keys_without_window_entry() {
        let windows = decode("s_999_header=ABC&tf_999_lines=L1&w_143=inactive&o_143=1");

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].window_id, "143");
        assert!(windows[0].tabs.is_empty());
    }

    #[test]
    fn test_decode_sorts_by_order() {
        let windows = decode("w_b=inactive&o_b=2&w_a=active&o_a=1&w_c=inactive");

        let ids: Vec<&str> = windows.iter().map(|w| w.window_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(windows[2].order, 3);
    }

    #[test]
    fn test_decode_tab_form_state() {
        let windows = decode("w_143=active&tf_143_lines=new&tm_143_lines=form&tfm_143_lines=new");

        let form = &windows[0].tabs["lines"].form;
        assert_eq!(form.record_id.as_deref(), Some(NEW_RECORD_ID));
        assert_eq!(form.mode, Some(TabMode::Form));
        assert_eq!(form.form_mode, Some(FormMode::New));
    }

    #[test]
    fn test_decode_uses_instance_identifier() {
        let windows = decode("w_143=active&wi_143=143_1700000000000");
        assert_eq!(windows[0].window_identifier, "143_1700000000000");
        assert_eq!(windows[0].window_id, "143");
    }

    #[test]
    fn test_decode_malformed_values_are_dropped() {
        let windows = decode("w_143=active&o_143=abc&fm_143=bogus&&=x&tm_143_t=weird");
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].order, 1);
        assert_eq!(windows[0].form_mode, None);
        assert!(windows[0].tabs.is_empty());
    }

    #[test]
    fn test_encode_omits_table_mode_and_empty_values() {
        let mut window = WindowState::new("143").active().with_order(1);
        window.tabs.insert(
            "header".to_string(),
            TabState {
                selected_record: Some("ABC".to_string()),
                form: TabFormState::for_record("ABC", Some(TabMode::Table), None),
                ..TabState::default()
            },
        );

        let query = encode(&[window]);
        assert!(query.contains("w_143=active"));
        assert!(query.contains("o_143=1"));
        assert!(query.contains("s_143_header=ABC"));
        assert!(!query.contains("tm_"));
        assert!(!query.contains("t_143="));
        assert!(!query.contains("wi_"));
    }

    #[test]
    fn test_round_trip() {
        let windows = vec![
            window_with_tabs("143_1700000000000", 1, false),
            window_with_tabs("200_1700000000001", 2, true),
        ];

        let decoded = decode(&encode(&windows));
        let expected: Vec<WindowState> = windows.iter().map(|w| w.normalized()).collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_round_trip_with_duplicate_window_ids() {
        let windows = vec![
            window_with_tabs("143_1", 1, true),
            window_with_tabs("143_2", 2, false),
        ];

        let query = encode(&windows);
        assert!(query.contains("w_143=active"));
        assert!(query.contains("w_143~2=inactive"));
        assert!(query.contains("wi_143~2=143_2"));

        let decoded = decode(&query);
        let expected: Vec<WindowState> = windows.iter().map(|w| w.normalized()).collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_bare_identifier_does_not_reuse_taken_token() {
        let windows = vec![
            WindowState::new("a_b").with_order(1).active(),
            WindowState::new("a").with_order(2),
        ];

        let decoded = decode(&encode(&windows));
        let identifiers: Vec<&str> = decoded.iter().map(|w| w.window_identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["a_b", "a"]);
        assert!(decoded[0].is_active);
        assert_eq!(decoded[1].order, 2);
    }

    #[test]
    fn test_tab_ids_with_underscores_stay_with_their_window() {
        let mut first = WindowState::new("143_1").with_order(1).active();
        first.tabs.insert(
            "2_x".to_string(),
            TabState {
                selected_record: Some("r1".to_string()),
                ..TabState::default()
            },
        );
        let windows = vec![first, WindowState::new("143_2").with_order(2)];

        let decoded = decode(&encode(&windows));
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].tabs["2_x"].selected_record.as_deref(), Some("r1"));
        assert!(decoded[1].tabs.is_empty());
    }

    #[test]
    fn test_tokens_never_prefix_each_other() {
        let windows = [
            WindowState::new("143_1"),
            WindowState::new("143_2"),
            WindowState::new("143"),
            WindowState::new("143_2_x"),
        ];
        let refs: Vec<&WindowState> = windows.iter().collect();
        let tokens = assign_tokens(&refs);

        for (i, a) in tokens.iter().enumerate() {
            for b in &tokens[i + 1..] {
                assert!(!tokens_clash(a, b), "{} clashes with {}", a, b);
            }
        }
    }

    #[test]
    fn test_explicit_window_id_survives_round_trip() {
        let mut window = WindowState::new("143_1").with_order(1).active();
        window.window_id = "SalesOrder".to_string();
        let mut other = WindowState::new("SalesOrder_7").with_order(2);
        other.window_id = "SalesOrder".to_string();
        let windows = vec![window, other];

        let decoded = decode(&encode(&windows));
        assert_eq!(decoded[0].window_id, "SalesOrder");
        assert_eq!(decoded[0].window_identifier, "143_1");
        assert_eq!(decoded[1].window_id, "SalesOrder");
        assert_eq!(decoded[1].window_identifier, "SalesOrder_7");
    }

    #[test]
    fn test_decode_token_is_window_id_next_to_instance_identifier() {
        let windows = decode("w_SalesOrder=active&wi_SalesOrder=143_1");
        assert_eq!(windows[0].window_id, "SalesOrder");
        assert_eq!(windows[0].window_identifier, "143_1");
    }

    #[test]
    fn test_round_trip_special_characters() {
        let window = WindowState::new("143_1")
            .active()
            .with_order(1)
            .with_title("Orders & Invoices = 100%");

        let decoded = decode(&encode(std::slice::from_ref(&window)));
        assert_eq!(decoded[0].title.as_deref(), Some("Orders & Invoices = 100%"));
    }

    #[test]
    fn test_encode_is_stable() {
        let windows = vec![window_with_tabs("143_1", 1, true)];
        assert_eq!(encode(&windows), encode(&windows));
    }

    #[test]
    fn test_has_windows() {
        assert!(has_windows("?w_1=active"));
        assert!(!has_windows("?foo=bar"));
        assert!(!has_windows(""));
    }
}
