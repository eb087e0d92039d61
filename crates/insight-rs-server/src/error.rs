//! API error type and the extractors that report through it.

use crate::mail::MailError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use insight_rs_core::{TIME_RANGE_KEY, WorkflowError};
use log::{error, warn};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

/// Message shown to contact form users when delivery fails.
pub(crate) const MAIL_RETRY_MESSAGE: &str =
    "We could not send your message right now. Please try again later.";

/// One offending field in a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// Dotted path into the request body, or `body` for the whole payload.
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors returned by HTTP handlers.
///
/// Every variant renders as `{success: false, error, details}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body or parameters failed validation (400).
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<FieldIssue>,
    },
    /// Unknown route or resource id (404).
    #[error("{0}")]
    NotFound(String),
    /// Action rejected in the workflow's current state (409).
    #[error("{0}")]
    Conflict(String),
    /// A simulated step was forced to fail (502).
    #[error("{0}")]
    StepFailed(String),
    /// Contact mail could not be relayed (500).
    #[error(transparent)]
    Mail(#[from] MailError),
    /// Anything else (500).
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Validation failure listing every offending field.
    pub fn validation(details: Vec<FieldIssue>) -> Self {
        Self::Validation {
            message: "Validation failed".to_string(),
            details,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::StepFailed(_) => StatusCode::BAD_GATEWAY,
            ApiError::Mail(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, details): (String, Value) = match self {
            ApiError::Validation { message, details } => (message, json!(details)),
            ApiError::Mail(err) => {
                error!("contact mail failed: {err}");
                (MAIL_RETRY_MESSAGE.to_string(), json!([]))
            }
            ApiError::Internal(detail) => {
                error!("internal error: {detail}");
                ("Internal server error".to_string(), json!([]))
            }
            other => (other.to_string(), json!([])),
        };
        let body = json!({
            "success": false,
            "error": message,
            "details": details,
        });
        (status, Json(body)).into_response()
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::UnknownWorkflow(_) => ApiError::NotFound(err.to_string()),
            WorkflowError::UnknownField { ref field, .. } => ApiError::Validation {
                details: vec![FieldIssue::new(field.clone(), "unknown filter field")],
                message: err.to_string(),
            },
            WorkflowError::InvalidWindow(ref window) => ApiError::Validation {
                details: vec![FieldIssue::new(TIME_RANGE_KEY, window.to_string())],
                message: err.to_string(),
            },
            WorkflowError::StepFailed { .. } => ApiError::StepFailed(err.to_string()),
            WorkflowError::EmptySelection
            | WorkflowError::AlreadyGenerated
            | WorkflowError::AlreadyCompleted(_)
            | WorkflowError::StepInFlight(_)
            | WorkflowError::Unsupported { .. }
            | WorkflowError::StreamUnavailable(_)
            | WorkflowError::StreamActive
            | WorkflowError::MissingCapsule
            | WorkflowError::Superseded(_) => {
                warn!("workflow action rejected: {err}");
                ApiError::Conflict(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation {
            message: "Invalid JSON body".to_string(),
            details: vec![FieldIssue::new("body", rejection.body_text())],
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation {
            message: "Invalid path parameter".to_string(),
            details: vec![FieldIssue::new("path", rejection.body_text())],
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation {
            message: "Invalid query string".to_string(),
            details: vec![FieldIssue::new("query", rejection.body_text())],
        }
    }
}

/// `Json` extractor whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub(crate) struct ApiJson<T>(pub T);

/// `Path` extractor whose rejections use the API error shape.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub(crate) struct ApiPath<T>(pub T);

/// `Query` extractor whose rejections use the API error shape.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub(crate) struct ApiQuery<T>(pub T);
