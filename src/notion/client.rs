//! HTTP client for the Notion API.
//!
//! Implements [`RemoteGateway`] over the database query, page creation and
//! database retrieval endpoints.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use liftlog_core::{GatewayError, RemoteGateway};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::NotionConfig;

/// Results per query request. Notion caps this at 100.
const PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Value>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedPage {
    id: String,
}

pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_version: String,
}

impl NotionClient {
    /// Creates a client from config.
    ///
    /// Returns an error if no API key is configured.
    pub fn from_config(config: &NotionConfig) -> Result<Self, GatewayError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            GatewayError::Http(
                "Notion API key not configured. Set notion.api_key or LIFTLOG_NOTION_TOKEN."
                    .to_string(),
            )
        })?;

        Self::new(
            &config.base_url,
            api_key,
            config.api_version.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn new(
        base_url: &str,
        api_key: String,
        api_version: String,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            api_version,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Notion-Version", self.api_version.as_str())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value, GatewayError> {
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Runs a database query, following cursors until every page is read.
    async fn query(
        &self,
        database_id: &str,
        filter: Option<Value>,
    ) -> Result<Vec<Value>, GatewayError> {
        let path = format!("databases/{}/query", database_id);
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let body = query_body(filter.as_ref(), cursor.as_deref());
            let raw = self
                .send(self.request(reqwest::Method::POST, &path).json(&body))
                .await?;
            let response: QueryResponse =
                serde_json::from_value(raw).map_err(|e| GatewayError::Decode(e.to_string()))?;

            tracing::debug!(
                database = database_id,
                count = response.results.len(),
                has_more = response.has_more,
                "Fetched query page"
            );
            pages.extend(response.results);

            match response.next_cursor {
                Some(next) if response.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(pages)
    }
}

#[async_trait]
impl RemoteGateway for NotionClient {
    async fn list_all(&self, collection_ref: &str) -> Result<Vec<Value>, GatewayError> {
        self.query(collection_ref, None).await
    }

    async fn list_since(
        &self,
        collection_ref: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Value>, GatewayError> {
        self.query(collection_ref, Some(since_filter(since))).await
    }

    async fn create_document(
        &self,
        collection_ref: &str,
        properties: Value,
    ) -> Result<String, GatewayError> {
        let body = json!({
            "parent": { "database_id": collection_ref },
            "properties": properties,
        });
        let raw = self
            .send(self.request(reqwest::Method::POST, "pages").json(&body))
            .await?;
        let page: CreatedPage =
            serde_json::from_value(raw).map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok(page.id)
    }

    async fn get_collection_metadata(&self, collection_ref: &str) -> Result<Value, GatewayError> {
        let path = format!("databases/{}", collection_ref);
        self.send(self.request(reqwest::Method::GET, &path)).await
    }
}

/// Request body for one query page.
fn query_body(filter: Option<&Value>, cursor: Option<&str>) -> Value {
    let mut body = json!({ "page_size": PAGE_SIZE });
    if let Some(filter) = filter {
        body["filter"] = filter.clone();
    }
    if let Some(cursor) = cursor {
        body["start_cursor"] = json!(cursor);
    }
    body
}

/// Filter for pages edited at or after `since`.
///
/// Notion stores edit times at minute precision, so `since` is floored to
/// the minute.
fn since_filter(since: DateTime<Utc>) -> Value {
    let floored = since
        .with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(since);

    json!({
        "timestamp": "last_edited_time",
        "last_edited_time": {
            "on_or_after": floored.to_rfc3339_opts(SecondsFormat::Millis, true)
        }
    })
}
