//! Experiment persistence in a vector index
//!
//! Records are written with `upsert` and listed with a `query` using an
//! all-zero query vector. That vector carries no information, so listing order
//! is whatever the index returns for a degenerate query and is not recency
//! order.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::models::{ExperimentMetadata, ExperimentRecord, ExperimentSummary};

/// Persists and lists experiment records
#[async_trait]
pub trait ExperimentStore: Send + Sync {
    async fn save(&self, record: &ExperimentRecord) -> Result<(), StoreError>;

    async fn list_recent(&self, limit: u32) -> Result<Vec<ExperimentSummary>, StoreError>;
}

/// Client for a Pinecone-compatible vector index data plane
pub struct VectorIndexStore {
    http_client: Client,
    host: String,
    api_key: String,
    namespace: Option<String>,
    dimension: usize,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: [UpsertVector<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Serialize)]
struct UpsertVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: &'a ExperimentMetadata,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: Vec<f32>,
    top_k: u32,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<ExperimentSummary>,
}

impl VectorIndexStore {
    pub fn new(
        host: impl Into<String>,
        api_key: impl Into<String>,
        namespace: Option<String>,
        dimension: usize,
    ) -> Self {
        Self {
            http_client: Client::new(),
            host: host.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            namespace,
            dimension,
        }
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, StoreError> {
        let response = self
            .http_client
            .post(format!("{}{}", self.host, path))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ExperimentStore for VectorIndexStore {
    async fn save(&self, record: &ExperimentRecord) -> Result<(), StoreError> {
        let body = UpsertRequest {
            vectors: [UpsertVector {
                id: &record.id,
                values: &record.vector,
                metadata: &record.metadata,
            }],
            namespace: self.namespace.as_deref(),
        };

        self.post("/vectors/upsert", &body).await?;
        tracing::debug!(id = %record.id, "experiment stored");
        Ok(())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<ExperimentSummary>, StoreError> {
        let body = QueryRequest {
            vector: vec![0.0; self.dimension],
            top_k: limit,
            include_metadata: true,
            namespace: self.namespace.as_deref(),
        };

        let response = self.post("/query", &body).await?;
        let text = response.text().await?;
        let parsed: QueryResponse =
            serde_json::from_str(&text).map_err(|e| StoreError::Parse(e.to_string()))?;

        Ok(parsed.matches)
    }
}
