//! URL state: key grammar, codec and history writer

pub mod codec;
pub mod history;
pub mod keys;

pub use codec::{decode, encode, has_windows, parse_query};
pub use history::{History, MemoryHistory, UrlNavigator};
