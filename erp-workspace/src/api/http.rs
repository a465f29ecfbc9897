//! HTTP datasource
//!
//! Posts `{entity, params}` to `{base_url}/api/datasource`. Params follow the
//! backend's fetch conventions: row window, sort, JSON-encoded criteria and
//! string flags.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use log::debug;
use serde_json::{json, Map, Value};

use super::datasource::{Datasource, DatasourceRequest, DatasourceResponse};

pub struct HttpDatasource {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpDatasource {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            bail!("datasource.base_url must not be empty");
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            token,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/datasource", self.base_url)
    }
}

/// Wire parameters for a request
pub fn build_params(request: &DatasourceRequest) -> Result<Map<String, Value>> {
    let mut params = Map::new();
    params.insert("_noCount".into(), json!("true"));
    params.insert("_operationType".into(), json!("fetch"));
    params.insert("_startRow".into(), json!(request.start_row.to_string()));
    params.insert("_endRow".into(), json!(request.end_row.to_string()));
    params.insert(
        "isImplicitFilterApplied".into(),
        json!(request.is_implicit_filter_applied.to_string()),
    );

    if let Some(sort_by) = &request.sort_by {
        params.insert("_sortBy".into(), json!(sort_by));
    }

    if !request.criteria.is_empty() {
        let encoded = request
            .criteria
            .iter()
            .map(|c| serde_json::to_string(c).map(Value::String))
            .collect::<serde_json::Result<Vec<_>>>()
            .context("Failed to encode criteria")?;
        params.insert("criteria".into(), Value::Array(encoded));
        params.insert("operator".into(), json!("and"));
    }

    let optional = [
        ("windowId", &request.window_id),
        ("tabId", &request.tab_id),
        ("parentId", &request.parent_id),
        ("referencedTableId", &request.referenced_table_id),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            params.insert(key.into(), json!(value));
        }
    }

    if let Some(target) = &request.direct_navigation {
        params.insert("_directNavigation".into(), json!("true"));
        params.insert("_targetRecordId".into(), json!(target));
    }

    Ok(params)
}

#[async_trait]
impl Datasource for HttpDatasource {
    async fn fetch(&self, request: &DatasourceRequest) -> Result<DatasourceResponse> {
        let body = json!({
            "entity": request.entity,
            "params": build_params(request)?,
        });

        debug!(
            "POST {} entity={} rows {}..{}",
            self.endpoint(),
            request.entity,
            request.start_row,
            request.end_row
        );

        let mut builder = self.client.post(self.endpoint()).json(&body);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to reach datasource for {}", request.entity))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("Datasource returned {}: {}", status, text.trim());
        }

        response
            .json::<DatasourceResponse>()
            .await
            .context("Failed to decode datasource response")
    }
}
