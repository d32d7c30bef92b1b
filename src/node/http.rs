//! HTTP API of a storage node
//!
//! - `GET /health`: probe used by the coordinator at startup
//! - `POST /documents`: insert one document (409 on duplicate key)
//! - `GET /documents?key=...`: fetch one document (404 with a `missing` body when absent)
//! - `DELETE /documents`: delete everything
//! - `GET /count`: exact document count
//!
//! Collections are synchronous, so every call runs on the blocking pool.

use crate::common::{Error, NodeBackend, Result, StoredDocument};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct CollectionState {
    pub collection: Arc<dyn NodeBackend>,
    pub node_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InsertResponse {
    pub acknowledged: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

/// Lookup parameters. The key travels in the query string so that keys
/// such as `..` or `a\b` are never rewritten as URL path segments.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyQuery {
    pub key: String,
}

/// Body of a 404 for a key the collection does not hold
#[derive(Debug, Serialize, Deserialize)]
pub struct MissingResponse {
    pub missing: String,
}

pub fn create_router(state: CollectionState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/documents",
            get(find_document)
                .post(insert_document)
                .delete(delete_documents),
        )
        .route("/count", get(count_documents))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("blocking task failed: {}", e)))?
}

fn error_response(e: Error) -> Response {
    tracing::warn!("Request failed: {}", e);
    (e.to_http_status(), Json(json!({ "error": e.to_string() }))).into_response()
}

async fn health(State(state): State<CollectionState>) -> Response {
    let collection = state.collection.clone();
    match run_blocking(move || collection.ping()).await {
        Ok(()) => Json(json!({ "status": "ok", "node": state.node_id })).into_response(),
        Err(e) => error_response(e),
    }
}

async fn insert_document(
    State(state): State<CollectionState>,
    Json(document): Json<StoredDocument>,
) -> Response {
    let collection = state.collection.clone();
    match run_blocking(move || collection.insert_one(&document)).await {
        Ok(acknowledged) => {
            (StatusCode::CREATED, Json(InsertResponse { acknowledged })).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn find_document(
    State(state): State<CollectionState>,
    Query(KeyQuery { key }): Query<KeyQuery>,
) -> Response {
    let collection = state.collection.clone();
    let lookup = key.clone();
    match run_blocking(move || collection.find_one(&lookup)).await {
        Ok(Some(document)) => Json(document).into_response(),
        Ok(None) => {
            (StatusCode::NOT_FOUND, Json(MissingResponse { missing: key })).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn count_documents(State(state): State<CollectionState>) -> Response {
    let collection = state.collection.clone();
    match run_blocking(move || collection.count_all()).await {
        Ok(count) => Json(CountResponse { count }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn delete_documents(State(state): State<CollectionState>) -> Response {
    let collection = state.collection.clone();
    match run_blocking(move || collection.delete_all()).await {
        Ok(deleted) => {
            tracing::info!("Deleted {} documents", deleted);
            Json(DeleteResponse { deleted }).into_response()
        }
        Err(e) => error_response(e),
    }
}
