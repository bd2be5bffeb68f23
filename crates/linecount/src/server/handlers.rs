//! Control API handlers.

use std::collections::HashMap;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use linecount_core::{
    Client, CoreError, Device, NewReading, NewSession, Page, PageRequest, Product, SessionDetail,
    SessionId, SessionSummary, coerce,
};

use super::AppState;
use super::body;
use super::error::ApiError;

type ApiResult<T> = Result<T, ApiError>;

/// Run a storage-bound call on the blocking pool.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> Result<T, CoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CoreError::Internal(format!("blocking task failed: {e}")))?
        .map_err(ApiError::from)
}

// ── Health ───────────────────────────────────────────────────────────

#[allow(clippy::unused_async)]
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "database": state.service.store().location(),
        "mqtt_host": &*state.mqtt_host,
        "ingest": state.service.ingest_stats().snapshot(),
    }))
}

// ── Catalog ──────────────────────────────────────────────────────────

pub async fn clients(State(state): State<AppState>) -> ApiResult<Json<Vec<Client>>> {
    let service = state.service;
    blocking(move || service.query().clients()).await.map(Json)
}

pub async fn products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    let service = state.service;
    blocking(move || service.query().products()).await.map(Json)
}

pub async fn devices(State(state): State<AppState>) -> ApiResult<Json<Vec<Device>>> {
    let service = state.service;
    blocking(move || service.query().devices()).await.map(Json)
}

// ── Sessions ─────────────────────────────────────────────────────────

const CREATE_REQUIRED: [&str; 4] = ["cliente_id", "produto_id", "operador_id", "dispositivo_codigo"];

pub async fn create_session(
    State(state): State<AppState>,
    raw: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let fields = body::object(&raw)?;
    let missing = body::missing(&fields, &CREATE_REQUIRED);
    if !missing.is_empty() {
        return Err(ApiError::bad_request(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }

    let new = NewSession {
        client_id: body::int(&fields, "cliente_id")?,
        product_id: body::int(&fields, "produto_id")?,
        operator_id: body::int(&fields, "operador_id")?,
        lot: body::opt_text(&fields, "lote").map(str::to_owned),
        device_code: body::text(&fields, "dispositivo_codigo"),
    };

    let service = state.service;
    let created = blocking(move || service.registry().create(&new)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "sessao_id": created.session_id })),
    ))
}

pub async fn finalize_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    raw: Bytes,
) -> ApiResult<Json<Value>> {
    let fields = body::object(&raw)?;
    let device_code = body::text(&fields, "dispositivo_codigo");

    let service = state.service;
    blocking(move || service.registry().finalize(SessionId(id), &device_code)).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SessionDetail>> {
    let service = state.service;
    blocking(move || service.query().get(SessionId(id)))
        .await
        .map(Json)
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Page<SessionSummary>>> {
    let request = PageRequest::parse(
        params.get("page").map(String::as_str),
        params.get("size").map(String::as_str),
    );
    let service = state.service;
    blocking(move || service.query().list(request)).await.map(Json)
}

// ── Readings ─────────────────────────────────────────────────────────

pub async fn add_reading(State(state): State<AppState>, raw: Bytes) -> ApiResult<Json<Value>> {
    let fields = body::object(&raw)?;
    let session_id = body::int_or_zero(&fields, "sessao_id")?;
    let inc = body::int_or_zero(&fields, "inc")?;
    let device_code = body::text(&fields, "device_code");

    let mut reading = NewReading::new(SessionId(session_id), device_code, inc);
    if let Some(ts) = body::opt_text(&fields, "ts").and_then(coerce::timestamp) {
        reading = reading.at(ts);
    }

    let service = state.service;
    blocking(move || service.ledger().append(&reading)).await?;
    Ok(Json(json!({ "ok": true, "sessao_id": session_id, "inc": inc })))
}
