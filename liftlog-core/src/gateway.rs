//! Contract for the remote side of a sync.
//!
//! The engine only ever talks to the remote through [`RemoteGateway`].
//! Listing operations drain every page before returning; retries and
//! timeouts belong to the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::GatewayError;

#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Every document in the remote collection.
    async fn list_all(&self, collection_ref: &str) -> Result<Vec<Value>, GatewayError>;

    /// Documents last edited at or after `since`.
    async fn list_since(
        &self,
        collection_ref: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Value>, GatewayError>;

    /// Creates a document from encoded properties and returns its remote id.
    async fn create_document(
        &self,
        collection_ref: &str,
        properties: Value,
    ) -> Result<String, GatewayError>;

    /// Raw description of the remote collection.
    async fn get_collection_metadata(&self, collection_ref: &str) -> Result<Value, GatewayError>;
}

