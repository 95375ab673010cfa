//! HTTP client for a document gateway
//!
//! Endpoints (all JSON, bearer auth when an api key is configured):
//! - `GET  {base}/v1/collections/{collection}/documents` with optional
//!   `field`+`eq` or `field`+`gte`/`lte` filters → `{"documents": [...]}`
//! - `GET  {base}/v1/collections/{collection}/documents/{id}` → document, 404 if absent
//! - `PATCH {base}/v1/collections/{collection}/documents/{id}` with `{"fields": {...}}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Document, DocumentStore, FieldRange};
use crate::config::StoreConfig;
use crate::error::{Error, Result};

/// Response body for collection queries
#[derive(Debug, Deserialize)]
struct DocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
}

/// Request body for merge writes
#[derive(Serialize)]
struct MergeRequest<'a> {
    fields: &'a Map<String, Value>,
}

/// Remote document store reached over HTTP.
pub struct HttpStore {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpStore {
    /// Create a new client from configuration
    ///
    /// Returns an error if the configuration is missing a base URL or carries
    /// an api key that is not a valid header value.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| Error::Config("store.base_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/collections/{}/documents",
            self.base_url,
            urlencoding::encode(collection)
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(collection),
            urlencoding::encode(id)
        )
    }

    async fn query(&self, collection: &str, params: &[(&str, String)]) -> Result<Vec<Document>> {
        let url = self.collection_url(collection);

        tracing::debug!(collection, ?params, "Querying document gateway");

        let response = self
            .http_client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| Error::fetch(collection, format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            let body: DocumentsResponse = response
                .json()
                .await
                .map_err(|e| Error::fetch(collection, format!("failed to parse response: {}", e)))?;
            Ok(body.documents)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::fetch(
                collection,
                format!("API error ({}): {}", status, error_text),
            ))
        }
    }
}

/// Render a filter value as a query parameter.
fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn range_params(field: &str, range: &FieldRange) -> Vec<(&'static str, String)> {
    let mut params = vec![("field", field.to_string())];
    if let Some(min) = &range.min {
        params.push(("gte", param_value(min)));
    }
    if let Some(max) = &range.max {
        params.push(("lte", param_value(max)));
    }
    params
}

#[async_trait]
impl DocumentStore for HttpStore {
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>> {
        self.query(collection, &[]).await
    }

    async fn where_equals(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>> {
        let params = [("field", field.to_string()), ("eq", param_value(value))];
        self.query(collection, &params).await
    }

    async fn where_in_range(
        &self,
        collection: &str,
        field: &str,
        range: &FieldRange,
    ) -> Result<Vec<Document>> {
        self.query(collection, &range_params(field, range)).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let url = self.document_url(collection, id);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::fetch(collection, format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            let doc: Document = response
                .json()
                .await
                .map_err(|e| Error::fetch(collection, format!("failed to parse response: {}", e)))?;
            Ok(Some(doc))
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::fetch(
                collection,
                format!("API error ({}): {}", status, error_text),
            ))
        }
    }

    async fn merge_document(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<()> {
        let url = self.document_url(collection, id);

        let response = self
            .http_client
            .patch(&url)
            .json(&MergeRequest { fields: &fields })
            .send()
            .await
            .map_err(|e| Error::fetch(collection, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(collection, id, "Document merged");
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::fetch(
                collection,
                format!("API error ({}): {}", status, error_text),
            ))
        }
    }
}
