use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::debug;

use memorydb_common::API_PREFIX;
use memorydb_storage::{Db, Entry, Value};

use crate::ApiError;

#[derive(Debug, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub value: serde_json::Value,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PushRequest {
    pub value: String,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RowResponse {
    pub key: String,
    pub kind: &'static str,
    pub value: Value,
    pub ttl: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RowResponse {
    fn new(key: String, entry: Entry) -> Self {
        Self {
            key,
            kind: entry.kind().as_str(),
            ttl: entry.expires_at(),
            created_at: entry.created_at(),
            updated_at: entry.updated_at(),
            value: entry.into_value(),
        }
    }
}

const OK: OkResponse = OkResponse { message: "ok" };

/// Monta o router HTTP: `/health` + rotas de dados sob `/api/v1`.
pub fn router(db: Db) -> Router {
    let v1 = Router::new()
        .route("/set", post(handle_set))
        .route(
            "/:key",
            get(handle_get).patch(handle_update).delete(handle_remove),
        )
        .route("/:key/push", patch(handle_push))
        .route("/:key/pop", patch(handle_pop));

    Router::new()
        .route("/health", get(handle_health))
        .nest(API_PREFIX, v1)
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

fn ttl(ttl_ms: Option<u64>) -> Option<Duration> {
    ttl_ms.map(Duration::from_millis)
}

async fn handle_health() -> Json<OkResponse> {
    Json(OK)
}

async fn handle_set(
    State(db): State<Db>,
    payload: Result<Json<SetRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let Json(body) = payload?;
    if body.key.is_empty() {
        return Err(ApiError::BadRequest("key é obrigatória".into()));
    }

    let value = Value::try_from(body.value)?;
    debug!("set {} ({})", body.key, value.kind().as_str());
    db.set(body.key, value, ttl(body.ttl_ms));
    Ok(Json(OK))
}

async fn handle_get(
    State(db): State<Db>,
    Path(key): Path<String>,
) -> Result<Json<RowResponse>, ApiError> {
    let entry = db.get(&key)?;
    Ok(Json(RowResponse::new(key, entry)))
}

async fn handle_update(
    State(db): State<Db>,
    Path(key): Path<String>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let Json(body) = payload?;
    let value = Value::try_from(body.value)?;
    db.update(&key, value, ttl(body.ttl_ms))?;
    Ok(Json(OK))
}

async fn handle_remove(
    State(db): State<Db>,
    Path(key): Path<String>,
) -> Result<Json<OkResponse>, ApiError> {
    db.remove(&key)?;
    Ok(Json(OK))
}

async fn handle_push(
    State(db): State<Db>,
    Path(key): Path<String>,
    payload: Result<Json<PushRequest>, JsonRejection>,
) -> Result<Json<RowResponse>, ApiError> {
    let Json(body) = payload?;
    if body.value.is_empty() {
        return Err(ApiError::BadRequest("value é obrigatório".into()));
    }

    let entry = db.push(&key, body.value, ttl(body.ttl_ms))?;
    Ok(Json(RowResponse::new(key, entry)))
}

async fn handle_pop(
    State(db): State<Db>,
    Path(key): Path<String>,
) -> Result<Json<RowResponse>, ApiError> {
    let entry = db.pop(&key)?;
    Ok(Json(RowResponse::new(key, entry)))
}
