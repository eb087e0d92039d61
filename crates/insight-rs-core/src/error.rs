//! Error types for the workflow engine.

use insight_rs_protocol::{DomainKind, InvalidWindow, WorkflowId, WorkflowStep};
use thiserror::Error;

/// Errors returned by workflow operations.
///
/// Every variant except `StepFailed` describes an action that was rejected
/// without changing workflow state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// Workflow id is unknown to the registry.
    #[error("unknown workflow: {0}")]
    UnknownWorkflow(WorkflowId),
    /// Capsule creation was requested over an empty filtered view.
    #[error("no records match the current criteria")]
    EmptySelection,
    /// Batch generation requested on a buffer that already holds records.
    #[error("records already generated for this run")]
    AlreadyGenerated,
    /// The step's artifact already exists for this run.
    #[error("{0} already completed for this run")]
    AlreadyCompleted(WorkflowStep),
    /// A simulated step is still suspended in its delay.
    #[error("{0} is still in progress")]
    StepInFlight(WorkflowStep),
    /// The domain does not offer this step.
    #[error("{step} is not available for the {domain} workflow")]
    Unsupported {
        step: WorkflowStep,
        domain: DomainKind,
    },
    /// The domain has no live stream.
    #[error("live streaming is not available for the {0} workflow")]
    StreamUnavailable(DomainKind),
    /// Live stream already running.
    #[error("live stream already running")]
    StreamActive,
    /// Anchor or verification requested before a capsule exists.
    #[error("no capsule exists for this run")]
    MissingCapsule,
    /// A reset landed while the step was suspended; its result was discarded.
    #[error("{0} was superseded by a reset")]
    Superseded(WorkflowStep),
    /// Criteria named a field the domain does not filter on.
    #[error("unknown filter field for {domain}: {field}")]
    UnknownField { domain: DomainKind, field: String },
    /// Criteria carried a malformed time window.
    #[error(transparent)]
    InvalidWindow(#[from] InvalidWindow),
    /// The fault hook forced a simulated step to fail.
    #[error("{step} failed: {message}")]
    StepFailed { step: WorkflowStep, message: String },
}
