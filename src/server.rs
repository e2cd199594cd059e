//! HTTP interface: `POST /evaluate`, `GET /evaluate` and `GET /health`

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::config::{Config, resolve_api_key};
use crate::dispatcher::Dispatcher;
use crate::embedding::EmbeddingClient;
use crate::error::{EvalError, StoreError};
use crate::evaluation::JudgeEvaluator;
use crate::models::{EvaluateRequest, EvaluateResponse, ExperimentsResponse};
use crate::providers::{OpenAiAdapter, ProviderRegistry};
use crate::store::{ExperimentStore, VectorIndexStore};

/// Long-lived clients shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub store: Arc<dyn ExperimentStore>,
    /// Default number of experiments listed by `GET /evaluate`
    pub listing_limit: u32,
}

impl AppState {
    /// Construct every upstream client once, resolving credentials from the environment
    pub fn from_config(config: &Config) -> Self {
        let openai_key = resolve_api_key(&config.openai.env_var_api_key);
        let openai = Arc::new(OpenAiAdapter::new(
            openai_key.clone(),
            &config.openai.api_base,
        ));

        let providers = ProviderRegistry::from_config(config, openai.clone());
        let judge = JudgeEvaluator::new(openai, &config.judge.model);
        let embedder = Arc::new(EmbeddingClient::new(
            openai_key,
            &config.openai.api_base,
            &config.embedding.model,
            config.embedding.dimension,
        ));
        let store: Arc<dyn ExperimentStore> = Arc::new(VectorIndexStore::new(
            &config.index.host,
            resolve_api_key(&config.index.env_var_api_key),
            config.index.namespace.clone(),
            config.index.dimension,
        ));

        let dispatcher = Dispatcher::new(providers, judge, embedder, store.clone());

        Self {
            dispatcher: Arc::new(dispatcher),
            store,
            listing_limit: config.server.listing_limit,
        }
    }
}

/// Body of every failed response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Any unrecovered failure; always rendered as HTTP 500
#[derive(Debug)]
pub struct ApiError(String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: self.0 }),
        )
            .into_response()
    }
}

impl From<EvalError> for ApiError {
    fn from(e: EvalError) -> Self {
        tracing::error!(error = %e, "evaluation failed");
        Self(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "listing experiments failed");
        Self(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        tracing::error!(error = %e, "invalid evaluate request body");
        Self(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        tracing::error!(error = %e, "invalid experiment listing query");
        Self(e.body_text())
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Create the HTTP router with all routes configured
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/evaluate", get(list_experiments).post(evaluate))
        .route("/health", get(health))
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, create_router(state))
        .await
        .context("Server terminated unexpectedly")
}

async fn evaluate(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let Json(request) = payload?;
    let results = state
        .dispatcher
        .run(&request.prompt, &request.llm_configs)
        .await?;

    Ok(Json(EvaluateResponse {
        prompt: request.prompt,
        results,
    }))
}

async fn list_experiments(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ExperimentsResponse>, ApiError> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(state.listing_limit);
    let experiments = state.store.list_recent(limit).await?;
    Ok(Json(ExperimentsResponse { experiments }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
