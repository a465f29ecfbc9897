//! Next/previous navigation between loaded records in form view

use crate::api::{record_id, Record};
use crate::window::NEW_RECORD_ID;

/// Where the open record sits in the loaded list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordNavigation {
    pub can_navigate_next: bool,
    pub can_navigate_previous: bool,
    /// `None` for no record, the `new` sentinel or a record not in the list
    pub current_index: Option<usize>,
    pub total_records: usize,
}

/// Result of asking for the neighbouring record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationStep {
    Go(String),
    /// The open record is the last loaded one and the server has more
    FetchMore,
    Stay,
}

impl RecordNavigation {
    pub fn compute(current_record_id: Option<&str>, records: &[Record], has_more_records: bool) -> Self {
        let total_records = records.len();
        let current_index = current_record_id
            .filter(|id| !id.is_empty() && *id != NEW_RECORD_ID)
            .and_then(|id| {
                records
                    .iter()
                    .position(|record| record_id(record).as_deref() == Some(id))
            });

        match current_index {
            Some(idx) => Self {
                can_navigate_next: idx + 1 < total_records || has_more_records,
                can_navigate_previous: idx > 0,
                current_index: Some(idx),
                total_records,
            },
            None => Self {
                can_navigate_next: false,
                can_navigate_previous: false,
                current_index: None,
                total_records,
            },
        }
    }

    pub fn next(&self, records: &[Record]) -> NavigationStep {
        let Some(idx) = self.current_index else {
            return NavigationStep::Stay;
        };
        match records.get(idx + 1).and_then(record_id) {
            Some(id) => NavigationStep::Go(id),
            None if self.can_navigate_next => NavigationStep::FetchMore,
            None => NavigationStep::Stay,
        }
    }

    pub fn previous(&self, records: &[Record]) -> NavigationStep {
        match self.current_index {
            Some(idx) if idx > 0 => records
                .get(idx - 1)
                .and_then(record_id)
                .map_or(NavigationStep::Stay, NavigationStep::Go),
            _ => NavigationStep::Stay,
        }
    }
}
