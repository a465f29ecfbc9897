//! Query-parameter key grammar
//!
//! Window-level keys are `{prefix}{token}`; tab-level keys are
//! `{prefix}{token}_{tabId}`. The token is normally the window's `windowId`.
//! Tokens in one query are distinct and no token followed by `_` starts
//! another one, so every tab-level key belongs to exactly one window.

/// `w_{w}` = `active` | `inactive`
pub const WINDOW_PREFIX: &str = "w_";
/// `o_{w}` = tab-strip position
pub const ORDER_PREFIX: &str = "o_";
/// `wi_{w}` = stable instance identifier
pub const WINDOW_IDENTIFIER_PREFIX: &str = "wi_";
/// `wd_{w}` = window definition id, written when the token does not imply it
pub const WINDOW_ID_PREFIX: &str = "wd_";
/// `r_{w}` = top-level form record id
pub const FORM_RECORD_PREFIX: &str = "r_";
/// `fm_{w}` = top-level form mode
pub const FORM_MODE_PREFIX: &str = "fm_";
/// `t_{w}` = window title
pub const TITLE_PREFIX: &str = "t_";

/// `s_{w}_{t}` = selected record of a tab
pub const SELECTED_PREFIX: &str = "s_";
/// `tf_{w}_{t}` = form record id of a tab
pub const TAB_FORM_PREFIX: &str = "tf_";
/// `tm_{w}_{t}` = tab mode, only written for `form`
pub const TAB_MODE_PREFIX: &str = "tm_";
/// `tfm_{w}_{t}` = form mode of a tab
pub const TAB_FORM_MODE_PREFIX: &str = "tfm_";

pub const ACTIVE: &str = "active";
pub const INACTIVE: &str = "inactive";

/// Separator for tokens minted when neither id of a window is free
pub const TOKEN_SUFFIX_SEPARATOR: char = '~';

/// Tab-level prefixes, each followed by `{token}_{tabId}`
pub const TAB_PREFIXES: [&str; 4] = [
    SELECTED_PREFIX,
    TAB_FORM_PREFIX,
    TAB_MODE_PREFIX,
    TAB_FORM_MODE_PREFIX,
];

pub fn window_key(prefix: &str, token: &str) -> String {
    format!("{}{}", prefix, token)
}

pub fn tab_key(prefix: &str, token: &str, tab_id: &str) -> String {
    format!("{}{}_{}", prefix, token, tab_id)
}
