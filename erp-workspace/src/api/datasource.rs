//! Datasource request/response contract
//!
//! The fetch engine talks to the backend through the [`Datasource`] trait. The
//! HTTP implementation lives in [`super::http`]; tests use in-memory doubles.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::criteria::Criteria;

/// Parent id the tree root request uses
pub const TREE_ROOT_PARENT: &str = "-1";

/// One row as returned by the backend
pub type Record = Map<String, Value>;

/// Id of a record (`id` field), if it has a string or numeric one
pub fn record_id(record: &Record) -> Option<String> {
    match record.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Parameters of one fetch call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceRequest {
    pub entity: String,
    pub start_row: usize,
    pub end_row: usize,
    pub page_size: usize,
    #[serde(default)]
    pub criteria: Vec<Criteria>,
    pub is_implicit_filter_applied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<String>,
    /// Tree mode: parent node whose children are requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Tree mode: table holding the tree structure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_table_id: Option<String>,
    /// Set when a criterion pins a single record by `id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_navigation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseBody {
    #[serde(default)]
    pub data: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub response: ResponseBody,
}

/// `{ok, data: {response: {data: [...]}}}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasourceResponse {
    pub ok: bool,
    #[serde(default)]
    pub data: ResponseEnvelope,
}

impl DatasourceResponse {
    pub fn success(records: Vec<Record>) -> Self {
        Self {
            ok: true,
            data: ResponseEnvelope {
                response: ResponseBody {
                    data: records,
                    error: None,
                },
            },
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: ResponseEnvelope {
                response: ResponseBody {
                    data: Vec::new(),
                    error: Some(Value::String(message.into())),
                },
            },
        }
    }

    /// Records of a successful response; an `ok: false` response is an error
    pub fn into_records(self) -> Result<Vec<Record>> {
        if !self.ok {
            let message = match self.data.response.error {
                Some(Value::String(message)) => message,
                Some(Value::Object(error)) => error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
                    .to_string(),
                Some(other) => other.to_string(),
                None => "unknown error".to_string(),
            };
            bail!("Datasource request failed: {}", message);
        }
        Ok(self.data.response.data)
    }
}

#[async_trait]
pub trait Datasource: Send + Sync {
    async fn fetch(&self, request: &DatasourceRequest) -> Result<DatasourceResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id() {
        let record: Record = serde_json::from_value(json!({"id": "A1", "name": "x"})).unwrap();
        assert_eq!(record_id(&record), Some("A1".to_string()));

        let numeric: Record = serde_json::from_value(json!({"id": 7})).unwrap();
        assert_eq!(record_id(&numeric), Some("7".to_string()));

        let missing: Record = serde_json::from_value(json!({"name": "x"})).unwrap();
        assert_eq!(record_id(&missing), None);
    }

    #[test]
    fn test_response_parses_wire_shape() {
        let response: DatasourceResponse = serde_json::from_value(json!({
            "ok": true,
            "data": {"response": {"data": [{"id": "1"}, {"id": "2"}]}}
        }))
        .unwrap();

        assert_eq!(response.into_records().unwrap().len(), 2);
    }

    #[test]
    fn test_failed_response_is_error() {
        let response: DatasourceResponse = serde_json::from_value(json!({
            "ok": false,
            "data": {"response": {"error": {"message": "Access denied"}}}
        }))
        .unwrap();

        let error = response.into_records().unwrap_err();
        assert!(error.to_string().contains("Access denied"));
    }
}
