//! Window and tab state: data model, reducer store and provider access

pub mod identifiers;
pub mod models;
pub mod provider;
pub mod store;

pub use identifiers::{new_window_identifier, window_id_from_identifier};
pub use models::{
    ColumnFilter, ColumnSort, FormMode, NavigationState, TabFormState, TabMode, TabState,
    TableState, VisibilityState, WindowPatch, WindowState, NEW_RECORD_ID,
};
pub use provider::{try_window_store, window_store, WindowProvider};
pub use store::{reduce, Action, WindowStore, WorkspaceState};
