//! Query criteria
//!
//! The backend understands nested `{fieldName, operator, value}` criteria
//! combined with `and`/`or` groups. This module builds them from free-text
//! search, the table's column filters and the sort keys.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::window::{ColumnFilter, ColumnSort};

/// Suffix addressing the display value of a foreign-key column
pub const IDENTIFIER_SUFFIX: &str = "$_identifier";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    IEquals,
    IContains,
    GreaterOrEqual,
    LessOrEqual,
    IsNull,
    NotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseCriteria {
    pub field_name: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Criteria {
    Composite {
        operator: LogicalOperator,
        criteria: Vec<Criteria>,
    },
    Base(BaseCriteria),
}

impl Criteria {
    pub fn base(field_name: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Criteria::Base(BaseCriteria {
            field_name: field_name.into(),
            operator,
            value: value.into(),
        })
    }

    pub fn equals(field_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::base(field_name, Operator::Equals, value)
    }

    pub fn or(criteria: Vec<Criteria>) -> Self {
        Criteria::Composite {
            operator: LogicalOperator::Or,
            criteria,
        }
    }

    pub fn and(criteria: Vec<Criteria>) -> Self {
        Criteria::Composite {
            operator: LogicalOperator::And,
            criteria,
        }
    }

    /// Value compared against `id`, searching nested groups
    pub fn id_target(&self) -> Option<&Value> {
        match self {
            Criteria::Base(base) if base.field_name == "id" => Some(&base.value),
            Criteria::Base(_) => None,
            Criteria::Composite { criteria, .. } => criteria.iter().find_map(|c| c.id_target()),
        }
    }
}

/// Record id pinned by an `id` criterion, if any
pub fn direct_navigation_target(criteria: &[Criteria]) -> Option<String> {
    criteria
        .iter()
        .find_map(|c| c.id_target())
        .and_then(|value| match value {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
}

/// How a column takes part in search and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKind {
    #[default]
    Text,
    Date,
    Numeric,
    Boolean,
    /// Fixed list of values
    Select,
    /// Foreign key shown through its identifier
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub column_name: String,
    #[serde(default)]
    pub kind: ColumnKind,
    #[serde(default = "default_searchable")]
    pub searchable: bool,
}

fn default_searchable() -> bool {
    true
}

impl Column {
    pub fn new(column_name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            column_name: column_name.into(),
            kind,
            searchable: true,
        }
    }

    pub fn not_searchable(mut self) -> Self {
        self.searchable = false;
        self
    }

    fn display_field(&self) -> String {
        match self.kind {
            ColumnKind::Reference => format!("{}{}", self.column_name, IDENTIFIER_SUFFIX),
            _ => self.column_name.clone(),
        }
    }
}

static FULL_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static YEAR_MONTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}$").unwrap());
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-?$").unwrap());

/// Inclusive date bounds a date-shaped search text stands for
fn date_range(query: &str) -> Option<(String, Option<String>)> {
    if FULL_DATE.is_match(query) {
        Some((query.to_string(), None))
    } else if YEAR_MONTH.is_match(query) {
        Some((format!("{}-01", query), Some(format!("{}-31", query))))
    } else if YEAR.is_match(query) {
        let year = query.trim_end_matches('-');
        Some((format!("{}-01-01", year), Some(format!("{}-12-31", year))))
    } else {
        None
    }
}

fn date_criteria(field_name: &str, query: &str) -> Vec<Criteria> {
    match date_range(query) {
        Some((exact, None)) => vec![Criteria::equals(field_name, exact)],
        Some((from, Some(to))) => vec![
            Criteria::base(field_name, Operator::GreaterOrEqual, from),
            Criteria::base(field_name, Operator::LessOrEqual, to),
        ],
        None => Vec::new(),
    }
}

/// Free-text search across searchable columns.
///
/// Date-shaped text (`2024`, `2024-`, `2024-03`, `2024-03-15`) matches date
/// columns by range when the tab has any; everything else is a
/// case-insensitive contains over text-like columns.
pub fn search_criteria(columns: &[Column], query: &str) -> Option<Criteria> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    let searchable: Vec<&Column> = columns.iter().filter(|c| c.searchable).collect();

    if date_range(query).is_some() {
        let by_date: Vec<Criteria> = searchable
            .iter()
            .filter(|c| c.kind == ColumnKind::Date)
            .flat_map(|c| date_criteria(&c.column_name, query))
            .collect();
        if !by_date.is_empty() {
            return Some(Criteria::or(by_date));
        }
    }

    let by_text: Vec<Criteria> = searchable
        .iter()
        .filter(|c| matches!(c.kind, ColumnKind::Text | ColumnKind::Select | ColumnKind::Reference))
        .map(|c| Criteria::base(c.display_field(), Operator::IContains, query))
        .collect();

    if by_text.is_empty() {
        None
    } else {
        Some(Criteria::or(by_text))
    }
}

fn option_value(value: &Value) -> Option<Value> {
    match value {
        Value::Object(option) => option.get("value").or_else(|| option.get("id")).cloned(),
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        other => Some(other.clone()),
    }
}

fn filter_criteria(filter: &ColumnFilter, column: Option<&Column>) -> Vec<Criteria> {
    let kind = column.map(|c| c.kind).unwrap_or_default();
    let is_reference = kind == ColumnKind::Reference;
    let field_name = if is_reference {
        format!("{}{}", filter.id, IDENTIFIER_SUFFIX)
    } else {
        filter.id.clone()
    };

    match &filter.value {
        Value::Null => Vec::new(),
        Value::Array(options) => {
            let operator = if is_reference { Operator::IEquals } else { Operator::Equals };
            let mut selected: Vec<Criteria> = options
                .iter()
                .filter_map(option_value)
                .map(|value| Criteria::base(field_name.clone(), operator, value))
                .collect();
            match selected.len() {
                0 => Vec::new(),
                1 => vec![selected.remove(0)],
                _ => vec![Criteria::or(selected)],
            }
        }
        Value::Object(range) if range.contains_key("from") || range.contains_key("to") => {
            let mut bounds = Vec::new();
            if let Some(from) = range.get("from").and_then(option_value) {
                bounds.push(Criteria::base(field_name.clone(), Operator::GreaterOrEqual, from));
            }
            if let Some(to) = range.get("to").and_then(option_value) {
                bounds.push(Criteria::base(field_name.clone(), Operator::LessOrEqual, to));
            }
            bounds
        }
        Value::String(text) if text.trim().is_empty() => Vec::new(),
        Value::String(text) => {
            let operator = match kind {
                ColumnKind::Date | ColumnKind::Numeric | ColumnKind::Boolean | ColumnKind::Select => {
                    Operator::Equals
                }
                ColumnKind::Text | ColumnKind::Reference => Operator::IContains,
            };
            vec![Criteria::base(field_name, operator, text.trim())]
        }
        other => match option_value(other) {
            Some(value) => vec![Criteria::base(field_name, Operator::Equals, value)],
            None => Vec::new(),
        },
    }
}

/// Criteria for the table's active column filters (implicitly AND-ed)
pub fn column_filter_criteria(filters: &[ColumnFilter], columns: &[Column]) -> Vec<Criteria> {
    filters
        .iter()
        .flat_map(|filter| {
            let column = columns.iter().find(|c| c.column_name == filter.id);
            filter_criteria(filter, column)
        })
        .collect()
}

/// Backend sort parameter: the first sort key, `-` prefixed when descending
pub fn sort_by(sorting: &[ColumnSort]) -> Option<String> {
    sorting.first().map(|sort| {
        if sort.desc {
            format!("-{}", sort.id)
        } else {
            sort.id.clone()
        }
    })
}

/// Union of base criteria, search and column filters
pub fn combine(
    base: &[Criteria],
    columns: &[Column],
    search_query: &str,
    filters: &[ColumnFilter],
) -> Vec<Criteria> {
    let mut criteria = base.to_vec();
    criteria.extend(search_criteria(columns, search_query));
    criteria.extend(column_filter_criteria(filters, columns));
    criteria
}
