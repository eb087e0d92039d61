//! Mock REST services: dataset anchoring, provenance, inference receipts,
//! verification, and compliance reports.
//!
//! Every POST body is checked against a static schema before it is decoded.
//! Responses are fabricated after the configured API latency and kept in
//! memory for the lifetime of the server.

use super::{created, ok};
use crate::error::{ApiError, ApiJson, ApiPath, FieldIssue};
use crate::state::AppState;
use crate::validation::{FieldKind, FieldRule, decode_body, optional, required};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use insight_rs_core::{IdKind, pick};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

const DATA_TYPES: &[&str] = &["tabular", "image", "text", "audio", "time_series"];
const FRAMEWORKS: &[&str] = &["pytorch", "tensorflow", "jax", "sklearn"];
const TARGET_TYPES: &[&str] = &["dataset_anchor", "provenance", "inference", "report"];
const REPORT_FRAMEWORKS: &[&str] = &["eu_ai_act", "nist_ai_rmf", "iso_42001", "soc2"];
const PREDICTIONS: &[&str] = &["approve", "review", "deny"];

const DATASET_METADATA: &[FieldRule] = &[
    optional("owner", FieldKind::Text),
    optional("license", FieldKind::Text),
    optional("description", FieldKind::Text),
];
const DATASET_ANCHOR_RULES: &[FieldRule] = &[
    required("dataset_name", FieldKind::Text),
    optional("dataset_version", FieldKind::Text),
    required("record_count", FieldKind::Count),
    required("data_type", FieldKind::OneOf(DATA_TYPES)),
    optional("metadata", FieldKind::Object(DATASET_METADATA)),
];

const TRAINING_RULES: &[FieldRule] = &[
    required("framework", FieldKind::OneOf(FRAMEWORKS)),
    optional("epochs", FieldKind::Count),
    optional("hyperparameters", FieldKind::AnyObject),
];
const PROVENANCE_RULES: &[FieldRule] = &[
    required("model_id", FieldKind::Text),
    required("dataset_anchor_id", FieldKind::Text),
    required("training", FieldKind::Object(TRAINING_RULES)),
];

const INFERENCE_RULES: &[FieldRule] = &[
    required("model_id", FieldKind::Text),
    required("input", FieldKind::AnyObject),
    optional("provenance_id", FieldKind::Text),
    optional("explain", FieldKind::Flag),
];

const VERIFY_RULES: &[FieldRule] = &[
    required("target_id", FieldKind::Text),
    required("target_type", FieldKind::OneOf(TARGET_TYPES)),
];

const REPORT_PERIOD: &[FieldRule] = &[
    required("start", FieldKind::Text),
    required("end", FieldKind::Text),
];
const REPORT_RULES: &[FieldRule] = &[
    required("title", FieldKind::Text),
    required("framework", FieldKind::OneOf(REPORT_FRAMEWORKS)),
    optional("scope", FieldKind::TextList),
    optional("period", FieldKind::Object(REPORT_PERIOD)),
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub(crate) struct DatasetMetadata {
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatasetAnchorRequest {
    dataset_name: String,
    #[serde(default)]
    dataset_version: Option<String>,
    record_count: u64,
    data_type: String,
    #[serde(default)]
    metadata: Option<DatasetMetadata>,
}

/// Stored dataset anchor.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct DatasetAnchorRecord {
    anchor_id: String,
    dataset_name: String,
    dataset_version: Option<String>,
    record_count: u64,
    data_type: String,
    metadata: Option<DatasetMetadata>,
    /// Fabricated, not computed from any content.
    merkle_root: String,
    tx_hash: String,
    block_number: u64,
    network: String,
    status: &'static str,
    anchored_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TrainingRequest {
    framework: String,
    #[serde(default)]
    epochs: Option<u64>,
    #[serde(default)]
    hyperparameters: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ProvenanceRequest {
    model_id: String,
    dataset_anchor_id: String,
    training: TrainingRequest,
}

/// Stored provenance capsule linking a model to an anchored dataset.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ProvenanceRecord {
    provenance_id: String,
    model_id: String,
    dataset_anchor_id: String,
    capsule_id: String,
    proof_ref: String,
    framework: String,
    epochs: Option<u64>,
    hyperparameters: Option<Map<String, Value>>,
    recorded_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct InferenceRequest {
    model_id: String,
    input: Map<String, Value>,
    #[serde(default)]
    provenance_id: Option<String>,
    #[serde(default)]
    explain: bool,
}

#[derive(Debug, Clone, Serialize)]
struct InferenceReceipt {
    receipt_id: String,
    proof_ref: String,
    provenance_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct FeatureContribution {
    feature: String,
    weight: f64,
}

/// Stored inference with its receipt.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct InferenceRecord {
    inference_id: String,
    model_id: String,
    prediction: &'static str,
    confidence: f64,
    receipt: InferenceReceipt,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<Vec<FeatureContribution>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct VerifyRequest {
    target_id: String,
    target_type: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct ReportPeriod {
    start: String,
    end: String,
}

#[derive(Debug, Deserialize)]
struct ReportRequest {
    title: String,
    framework: String,
    #[serde(default)]
    scope: Vec<String>,
    #[serde(default)]
    period: Option<ReportPeriod>,
}

/// Stored compliance report.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ReportRecord {
    report_id: String,
    title: String,
    framework: String,
    scope: Vec<String>,
    period: Option<ReportPeriod>,
    dataset_anchors: usize,
    provenance_records: usize,
    inferences: usize,
    status: &'static str,
    generated_at: DateTime<Utc>,
}

/// Hold the response for the configured mock latency.
async fn simulate_latency(state: &AppState) {
    let delay = state.config.latency.api();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// POST /api/dataset-anchor
pub(crate) async fn handle_create_dataset_anchor(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let request: DatasetAnchorRequest = decode_body(body, DATASET_ANCHOR_RULES)?;
    simulate_latency(&state).await;

    let anchor = &state.config.anchor;
    let offset = state
        .random
        .range("block_offset", 0, anchor.block_spread.max(1));
    let record = DatasetAnchorRecord {
        anchor_id: state.ids.next_id(IdKind::Resource),
        dataset_name: request.dataset_name,
        dataset_version: request.dataset_version,
        record_count: request.record_count,
        data_type: request.data_type,
        metadata: request.metadata,
        merkle_root: state.ids.next_id(IdKind::ProofRef),
        tx_hash: state.ids.next_id(IdKind::Transaction),
        block_number: anchor.base_block.saturating_add(offset),
        network: anchor.network.clone(),
        status: "anchored",
        anchored_at: state.clock.now(),
    };
    info!(
        "dataset anchored (anchor_id={}, dataset={}, records={})",
        record.anchor_id, record.dataset_name, record.record_count
    );
    state
        .store
        .dataset_anchors
        .write()
        .insert(record.anchor_id.clone(), record.clone());
    Ok(created(record))
}

/// GET /api/dataset-anchor/{id}
pub(crate) async fn handle_get_dataset_anchor(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<Value>, ApiError> {
    simulate_latency(&state).await;
    let record = state
        .store
        .dataset_anchors
        .read()
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("dataset anchor not found: {id}")))?;
    Ok(ok(record))
}

/// POST /api/provenance
pub(crate) async fn handle_create_provenance(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let request: ProvenanceRequest = decode_body(body, PROVENANCE_RULES)?;
    if !state
        .store
        .dataset_anchors
        .read()
        .contains_key(&request.dataset_anchor_id)
    {
        return Err(ApiError::validation(vec![FieldIssue::new(
            "dataset_anchor_id",
            "unknown dataset anchor",
        )]));
    }
    simulate_latency(&state).await;

    let record = ProvenanceRecord {
        provenance_id: state.ids.next_id(IdKind::Resource),
        model_id: request.model_id,
        dataset_anchor_id: request.dataset_anchor_id,
        capsule_id: state.ids.next_id(IdKind::Capsule),
        proof_ref: state.ids.next_id(IdKind::ProofRef),
        framework: request.training.framework,
        epochs: request.training.epochs,
        hyperparameters: request.training.hyperparameters,
        recorded_at: state.clock.now(),
    };
    info!(
        "provenance recorded (provenance_id={}, model_id={}, dataset_anchor_id={})",
        record.provenance_id, record.model_id, record.dataset_anchor_id
    );
    state
        .store
        .provenance
        .write()
        .insert(record.provenance_id.clone(), record.clone());
    Ok(created(record))
}

/// GET /api/provenance/{id}
pub(crate) async fn handle_get_provenance(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<Value>, ApiError> {
    simulate_latency(&state).await;
    let record = state
        .store
        .provenance
        .read()
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("provenance record not found: {id}")))?;
    Ok(ok(record))
}

/// POST /api/inference
pub(crate) async fn handle_inference(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Value>, ApiError> {
    let request: InferenceRequest = decode_body(body, INFERENCE_RULES)?;
    if let Some(provenance_id) = &request.provenance_id
        && !state.store.provenance.read().contains_key(provenance_id)
    {
        return Err(ApiError::validation(vec![FieldIssue::new(
            "provenance_id",
            "unknown provenance record",
        )]));
    }
    simulate_latency(&state).await;

    let random = state.random.as_ref();
    let prediction = *pick(random, "prediction", PREDICTIONS);
    let confidence = round4(0.70 + random.unit("confidence") * 0.29);
    let explanation = request.explain.then(|| {
        let mut features: Vec<FeatureContribution> = request
            .input
            .keys()
            .map(|feature| FeatureContribution {
                feature: feature.clone(),
                weight: round4(random.unit("feature_weight")),
            })
            .collect();
        features.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        features
    });
    let record = InferenceRecord {
        inference_id: state.ids.next_id(IdKind::Resource),
        model_id: request.model_id,
        prediction,
        confidence,
        receipt: InferenceReceipt {
            receipt_id: state.ids.next_id(IdKind::Resource),
            proof_ref: state.ids.next_id(IdKind::ProofRef),
            provenance_id: request.provenance_id,
        },
        explanation,
        created_at: state.clock.now(),
    };
    debug!(
        "inference served (inference_id={}, prediction={}, inputs={})",
        record.inference_id,
        record.prediction,
        request.input.len()
    );
    state
        .store
        .inferences
        .write()
        .insert(record.inference_id.clone(), record.clone());
    Ok(ok(record))
}

/// POST /api/verify
pub(crate) async fn handle_verify(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<Value>,
) -> Result<Json<Value>, ApiError> {
    let request: VerifyRequest = decode_body(body, VERIFY_RULES)?;
    let store = &state.store;
    let known = match request.target_type.as_str() {
        "dataset_anchor" => store.dataset_anchors.read().contains_key(&request.target_id),
        "provenance" => store.provenance.read().contains_key(&request.target_id),
        "inference" => store.inferences.read().contains_key(&request.target_id),
        _ => store
            .reports
            .read()
            .iter()
            .any(|report| report.report_id == request.target_id),
    };
    if !known {
        return Err(ApiError::NotFound(format!(
            "{} not found: {}",
            request.target_type, request.target_id
        )));
    }
    simulate_latency(&state).await;

    let checks: BTreeMap<&str, bool> = [
        ("record_exists", true),
        ("proof_reference_valid", true),
        ("timestamp_valid", true),
    ]
    .into_iter()
    .collect();
    Ok(ok(json!({
        "target_id": request.target_id,
        "target_type": request.target_type,
        "verified": true,
        "checks": checks,
        "latency_ms": state.random.range("verify_latency_ms", 40, 250),
        "verified_at": state.clock.now(),
    })))
}

/// POST /api/reports
pub(crate) async fn handle_create_report(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let request: ReportRequest = decode_body(body, REPORT_RULES)?;
    simulate_latency(&state).await;

    let store = &state.store;
    let record = ReportRecord {
        report_id: state.ids.next_id(IdKind::Resource),
        title: request.title,
        framework: request.framework,
        scope: request.scope,
        period: request.period,
        dataset_anchors: store.dataset_anchors.read().len(),
        provenance_records: store.provenance.read().len(),
        inferences: store.inferences.read().len(),
        status: "generated",
        generated_at: state.clock.now(),
    };
    info!(
        "report generated (report_id={}, framework={})",
        record.report_id, record.framework
    );
    store.reports.write().push(record.clone());
    Ok(created(record))
}

/// GET /api/reports
pub(crate) async fn handle_list_reports(State(state): State<Arc<AppState>>) -> Json<Value> {
    simulate_latency(&state).await;
    let reports: Vec<ReportRecord> = state.store.reports.read().iter().rev().cloned().collect();
    ok(json!({ "count": reports.len(), "reports": reports }))
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
