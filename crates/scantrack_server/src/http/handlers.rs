use crate::error::ScanError;
use crate::service::{LogQuery, ScanRequest};
use crate::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scantrack_db::{ScanLogEntry, ScanRecord, ScanTotals};
use serde_json::{json, Value};

pub(crate) async fn record_scan_handler(
    State(state): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanRecord>, ScanError> {
    let Json(request) = payload.map_err(|rejection| ScanError::validation(rejection.body_text()))?;
    let record = state.service.record_scan(request).await?;
    Ok(Json(record))
}

pub(crate) async fn list_scans_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ScanRecord>>, ScanError> {
    Ok(Json(state.service.records().await?))
}

pub(crate) async fn scan_logs_handler(
    State(state): State<AppState>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Result<Json<Vec<ScanLogEntry>>, ScanError> {
    let Query(query) = query.map_err(|rejection| ScanError::validation(rejection.body_text()))?;
    Ok(Json(state.service.history(query).await?))
}

pub(crate) async fn scan_totals_handler(
    State(state): State<AppState>,
) -> Result<Json<ScanTotals>, ScanError> {
    Ok(Json(state.service.totals().await?))
}

pub(crate) async fn healthz_handler(State(state): State<AppState>) -> Result<Json<Value>, ScanError> {
    state.service.health().await?;
    Ok(Json(json!({ "status": "ok" })))
}

pub(crate) async fn not_found_handler() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" }))).into_response()
}
