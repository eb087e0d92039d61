//! Wire protocol types for Insight workflows: records, criteria, derived
//! artifacts, snapshots, and workflow events.

#[macro_use]
mod label;
mod capsule;
mod criteria;
mod record;

pub use capsule::{
    Anchor, AnchorPhase, CHECK_ANCHOR_CONFIRMED, CHECK_CAPSULE_INTEGRITY,
    CHECK_METADATA_CONSISTENCY, CHECK_TIMESTAMP_VALIDITY, Capsule, MetadataSummary, TimeRange,
    VerificationReport,
};
pub use criteria::{
    Criterion, FilterCriteria, InvalidWindow, MATCH_ALL, MAX_WINDOW_DAYS, MatchMode, TimeWindow,
};
pub use label::UnknownLabel;
pub use record::{
    ComplianceStatus, DataEntry, DataPoint, DataType, DatasetSplit, DomainKind, FeatureCategory,
    Label, LogEntry, LogSource, Record, Region, Severity,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a workflow run.
pub type WorkflowId = Uuid;

labelled_enum! {
    /// Observable state of a workflow, derived from what it currently owns.
    WorkflowStage {
        /// No records and no derived artifacts.
        Idle => "idle",
        /// Live stream is appending records.
        Streaming => "streaming",
        /// Records exist, no criteria applied.
        Generated => "generated",
        /// Records exist and criteria constrain the view.
        Filtered => "filtered",
        CapsuleReady => "capsule_ready",
        Anchored => "anchored",
        Verified => "verified",
    }
}

labelled_enum! {
    /// User-triggered workflow action.
    WorkflowStep {
        Capsule => "capsule",
        Anchor => "anchor",
        Verify => "verify",
    }
}

/// Point-in-time view of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub workflow_id: WorkflowId,
    pub domain: DomainKind,
    pub stage: WorkflowStage,
    pub streaming: bool,
    /// Step currently suspended in a simulated delay.
    pub pending: Option<WorkflowStep>,
    pub record_count: usize,
    pub filtered_count: usize,
    pub criteria: FilterCriteria,
    pub capsule: Option<Capsule>,
    pub anchor: Option<Anchor>,
    pub report: Option<VerificationReport>,
    pub created_at: DateTime<Utc>,
}

/// Summary view of a workflow for listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowSummary {
    pub workflow_id: WorkflowId,
    pub domain: DomainKind,
    pub stage: WorkflowStage,
    pub record_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Wrapper for events emitted by a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// Unique id for the event.
    pub id: Uuid,
    /// Workflow that emitted the event.
    pub workflow_id: WorkflowId,
    /// Timestamp when the event was created.
    pub created_at: DateTime<Utc>,
    /// Event payload content.
    pub payload: WorkflowEventPayload,
}

impl WorkflowEvent {
    /// Stamp a payload with a fresh id. `created_at` comes from the emitter's clock.
    pub fn new(
        workflow_id: WorkflowId,
        created_at: DateTime<Utc>,
        payload: WorkflowEventPayload,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id,
            created_at,
            payload,
        }
    }
}

/// All events emitted while a workflow runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum WorkflowEventPayload {
    /// A batch of records replaced the empty buffer.
    RecordsGenerated { count: usize, matched: usize },
    /// The live stream appended one record.
    RecordAppended {
        record_id: String,
        matched: bool,
        evicted: Option<String>,
    },
    StreamStarted { interval_ms: u64 },
    StreamStopped,
    /// Criteria were replaced and the view recomputed.
    CriteriaChanged { matched: usize, total: usize },
    /// A simulated step entered its delay.
    StepStarted { step: WorkflowStep },
    AnchorProgress { phase: AnchorPhase },
    CapsuleCreated {
        capsule_id: String,
        total_events: usize,
    },
    AnchorConfirmed {
        capsule_id: String,
        tx_hash: String,
        block_number: u64,
    },
    VerificationCompleted { capsule_id: String, ok: bool },
    /// A simulated step did not produce its artifact.
    StepFailed { step: WorkflowStep, message: String },
    /// Everything was cleared back to idle.
    Reset,
}

/// Sink interface for workflow events.
pub trait EventSink: Send + Sync {
    /// Emit an event to downstream listeners.
    fn emit(&self, event: WorkflowEvent);
}
