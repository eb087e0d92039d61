//! Workflow session routes under `/api/workflows`.

use super::{created, ok, optional_body};
use crate::error::{ApiError, ApiJson, ApiPath, ApiQuery};
use crate::state::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use insight_rs_protocol::{DomainKind, WorkflowId};
use log::info;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct CreateWorkflowRequest {
    domain: DomainKind,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct GenerateRequest {
    #[serde(default)]
    count: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RecordsQuery {
    #[serde(default)]
    filtered: bool,
}

/// POST /api/workflows
pub(crate) async fn handle_create(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CreateWorkflowRequest>,
) -> impl IntoResponse {
    let workflow = state.registry.create(request.domain);
    info!(
        "workflow created over http (workflow_id={}, domain={})",
        workflow.id(),
        request.domain
    );
    created(workflow.snapshot())
}

/// GET /api/workflows
pub(crate) async fn handle_list(State(state): State<Arc<AppState>>) -> Json<Value> {
    ok(state.registry.list())
}

/// GET /api/workflows/{id}
pub(crate) async fn handle_get(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<WorkflowId>,
) -> Result<Json<Value>, ApiError> {
    let workflow = state.registry.get(id)?;
    Ok(ok(workflow.snapshot()))
}

/// DELETE /api/workflows/{id}
pub(crate) async fn handle_delete(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<WorkflowId>,
) -> Result<Json<Value>, ApiError> {
    if !state.registry.remove(id) {
        return Err(ApiError::NotFound(format!("unknown workflow: {id}")));
    }
    Ok(ok(json!({ "workflow_id": id, "removed": true })))
}

/// POST /api/workflows/{id}/generate
pub(crate) async fn handle_generate(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<WorkflowId>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: GenerateRequest = optional_body(&body)?;
    let workflow = state.registry.get(id)?;
    workflow.generate(request.count)?;
    Ok(ok(workflow.snapshot()))
}

/// POST /api/workflows/{id}/stream/start
pub(crate) async fn handle_stream_start(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<WorkflowId>,
) -> Result<Json<Value>, ApiError> {
    let workflow = state.registry.get(id)?;
    workflow.start_stream()?;
    Ok(ok(workflow.snapshot()))
}

/// POST /api/workflows/{id}/stream/stop
pub(crate) async fn handle_stream_stop(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<WorkflowId>,
) -> Result<Json<Value>, ApiError> {
    let workflow = state.registry.get(id)?;
    let stopped = workflow.stop_stream();
    Ok(ok(json!({ "stopped": stopped, "workflow": workflow.snapshot() })))
}

/// PUT /api/workflows/{id}/criteria
pub(crate) async fn handle_set_criteria(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<WorkflowId>,
    ApiJson(params): ApiJson<BTreeMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let workflow = state.registry.get(id)?;
    let matched = workflow.set_criteria_params(&params)?;
    Ok(ok(json!({ "matched": matched, "workflow": workflow.snapshot() })))
}

/// GET /api/workflows/{id}/records?filtered=bool
pub(crate) async fn handle_records(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<WorkflowId>,
    ApiQuery(query): ApiQuery<RecordsQuery>,
) -> Result<Json<Value>, ApiError> {
    let workflow = state.registry.get(id)?;
    let records = workflow.records(query.filtered);
    Ok(ok(json!({
        "filtered": query.filtered,
        "count": records.len(),
        "records": records,
    })))
}

/// POST /api/workflows/{id}/capsule
pub(crate) async fn handle_capsule(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<WorkflowId>,
) -> Result<Json<Value>, ApiError> {
    let workflow = state.registry.get(id)?;
    let capsule = workflow.create_capsule().await?;
    Ok(ok(capsule))
}

/// POST /api/workflows/{id}/anchor
pub(crate) async fn handle_anchor(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<WorkflowId>,
) -> Result<Json<Value>, ApiError> {
    let workflow = state.registry.get(id)?;
    let anchor = workflow.anchor().await?;
    Ok(ok(anchor))
}

/// POST /api/workflows/{id}/verify
pub(crate) async fn handle_verify(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<WorkflowId>,
) -> Result<Json<Value>, ApiError> {
    let workflow = state.registry.get(id)?;
    let report = workflow.verify().await?;
    Ok(ok(report))
}

/// POST /api/workflows/{id}/reset
pub(crate) async fn handle_reset(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<WorkflowId>,
) -> Result<Json<Value>, ApiError> {
    let workflow = state.registry.get(id)?;
    workflow.reset();
    Ok(ok(workflow.snapshot()))
}
