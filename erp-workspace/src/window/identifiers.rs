//! Window identifier helpers

use chrono::Utc;

/// Extract the window definition id from an instance identifier.
///
/// Identifiers have the shape `{windowId}_{suffix}`; an identifier without an
/// underscore is its own window id.
pub fn window_id_from_identifier(window_identifier: &str) -> &str {
    match window_identifier.find('_') {
        Some(idx) => &window_identifier[..idx],
        None => window_identifier,
    }
}

/// Mint a new instance identifier for a window definition (`{windowId}_{millis}`)
pub fn new_window_identifier(window_id: &str) -> String {
    format!("{}_{}", window_id, Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_id_from_identifier() {
        assert_eq!(window_id_from_identifier("12345_67890"), "12345");
        assert_eq!(window_id_from_identifier("12345"), "12345");
        assert_eq!(window_id_from_identifier("a_b_c"), "a");
    }

    #[test]
    fn test_new_window_identifier_round_trips() {
        let identifier = new_window_identifier("143");
        assert!(identifier.starts_with("143_"));
        assert_eq!(window_id_from_identifier(&identifier), "143");
    }
}
