//! Workflow state machine.
//!
//! A `Workflow` owns one run of a demo: the bounded record buffer, the active
//! criteria, the optional live stream task, and the derived capsule, anchor,
//! and report. The observable stage is derived from what the run currently
//! owns rather than stored separately.

use crate::anchor::AnchorSimulator;
use crate::capsule::build_capsule;
use crate::clock::{Clock, SystemClock};
use crate::domain::DomainSchema;
use crate::error::WorkflowError;
use crate::fault::{FaultHook, NoFaults};
use crate::filter::{filter_records, matches};
use crate::generator::RecordGenerator;
use crate::ids::{IdProvider, SimulatedIdProvider};
use crate::random::{RandomSource, StdRandom};
use crate::verify::VerificationSimulator;
use chrono::{DateTime, TimeDelta, Utc};
use insight_rs_config::{InsightConfig, WorkflowConfig};
use insight_rs_protocol::{
    Anchor, Capsule, DomainKind, EventSink, FilterCriteria, Record, VerificationReport,
    WorkflowEvent, WorkflowEventPayload, WorkflowId, WorkflowSnapshot, WorkflowStage,
    WorkflowStep, WorkflowSummary,
};
use log::{debug, info};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

/// Shortest stream period; a zero interval would never yield.
const MIN_STREAM_PERIOD: Duration = Duration::from_millis(1);

/// Collaborators injected into every workflow.
#[derive(Clone)]
pub struct WorkflowServices {
    pub random: Arc<dyn RandomSource>,
    pub ids: Arc<dyn IdProvider>,
    pub clock: Arc<dyn Clock>,
    pub faults: Arc<dyn FaultHook>,
}

impl WorkflowServices {
    /// OS-seeded randomness, simulated ids, the system clock, and no faults.
    pub fn simulated() -> Self {
        let random: Arc<dyn RandomSource> = Arc::new(StdRandom::new());
        Self {
            ids: Arc::new(SimulatedIdProvider::new(random.clone())),
            random,
            clock: Arc::new(SystemClock),
            faults: Arc::new(NoFaults),
        }
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdProvider>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_faults(mut self, faults: Arc<dyn FaultHook>) -> Self {
        self.faults = faults;
        self
    }
}

impl Default for WorkflowServices {
    fn default() -> Self {
        Self::simulated()
    }
}

/// Mutable state of the current run.
#[derive(Default)]
struct RunState {
    /// Newest first.
    records: VecDeque<Record>,
    criteria: FilterCriteria,
    capsule: Option<Capsule>,
    anchor: Option<Anchor>,
    report: Option<VerificationReport>,
    pending: Option<WorkflowStep>,
    /// Bumped on every reset so suspended steps can detect they were superseded.
    generation: u64,
    stream: Option<JoinHandle<()>>,
}

impl RunState {
    fn stage(&self) -> WorkflowStage {
        if self.report.is_some() {
            WorkflowStage::Verified
        } else if self.anchor.is_some() {
            WorkflowStage::Anchored
        } else if self.capsule.is_some() {
            WorkflowStage::CapsuleReady
        } else if self.stream.is_some() {
            WorkflowStage::Streaming
        } else if self.records.is_empty() {
            WorkflowStage::Idle
        } else if self.criteria.is_unconstrained() {
            WorkflowStage::Generated
        } else {
            WorkflowStage::Filtered
        }
    }

    fn ensure_no_pending(&self) -> Result<(), WorkflowError> {
        match self.pending {
            Some(step) => Err(WorkflowError::StepInFlight(step)),
            None => Ok(()),
        }
    }
}

/// One demo run for a single domain.
pub struct Workflow {
    id: WorkflowId,
    schema: &'static DomainSchema,
    settings: WorkflowConfig,
    capsule_delay: Duration,
    generator: RecordGenerator,
    anchors: AnchorSimulator,
    verifier: VerificationSimulator,
    ids: Arc<dyn IdProvider>,
    clock: Arc<dyn Clock>,
    event_sink: Option<Arc<dyn EventSink>>,
    created_at: DateTime<Utc>,
    state: Mutex<RunState>,
}

impl Workflow {
    /// Create an idle workflow for `domain`.
    pub fn new(
        domain: DomainKind,
        config: &InsightConfig,
        services: WorkflowServices,
        event_sink: Option<Arc<dyn EventSink>>,
    ) -> Self {
        let WorkflowServices {
            random,
            ids,
            clock,
            faults,
        } = services;
        let workflow = Self {
            id: Uuid::new_v4(),
            schema: DomainSchema::for_kind(domain),
            settings: config.workflow.clone(),
            capsule_delay: config.latency.capsule(),
            generator: RecordGenerator::new(random.clone(), ids.clone(), clock.clone()),
            anchors: AnchorSimulator::new(
                config.anchor.clone(),
                &config.latency,
                random.clone(),
                ids.clone(),
                clock.clone(),
                faults.clone(),
            ),
            verifier: VerificationSimulator::new(
                config.latency.verify(),
                random,
                clock.clone(),
                faults,
            ),
            created_at: clock.now(),
            ids,
            clock,
            event_sink,
            state: Mutex::new(RunState::default()),
        };
        info!(
            "created workflow (workflow_id={}, domain={})",
            workflow.id, domain
        );
        workflow
    }

    pub fn id(&self) -> WorkflowId {
        self.id
    }

    pub fn domain(&self) -> DomainKind {
        self.schema.kind
    }

    pub fn schema(&self) -> &'static DomainSchema {
        self.schema
    }

    pub fn stage(&self) -> WorkflowStage {
        self.state.lock().stage()
    }

    /// Fill the empty buffer with a batch of records.
    ///
    /// `count` defaults to the configured batch size and is capped at the
    /// buffer capacity. Returns the number of records generated.
    pub fn generate(&self, count: Option<usize>) -> Result<usize, WorkflowError> {
        let capacity = self.settings.buffer_capacity.max(1);
        let count = count
            .unwrap_or(self.settings.batch_size)
            .clamp(1, capacity);
        let lookback = i64::try_from(self.settings.batch_lookback_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::days(1));

        let matched = {
            let mut state = self.state.lock();
            state.ensure_no_pending()?;
            if state.stream.is_some() {
                return Err(WorkflowError::StreamActive);
            }
            if !state.records.is_empty() {
                return Err(WorkflowError::AlreadyGenerated);
            }
            let records = self
                .generator
                .generate_batch(self.schema.kind, count, lookback);
            let now = self.clock.now();
            let matched = records
                .iter()
                .filter(|record| matches(record, &state.criteria, now))
                .count();
            state.records = records.into();
            matched
        };
        info!(
            "generated records (workflow_id={}, count={}, matched={})",
            self.id, count, matched
        );
        self.emit(WorkflowEventPayload::RecordsGenerated { count, matched });
        Ok(count)
    }

    /// Start appending one record per stream interval.
    ///
    /// The first record lands one interval after the call. Must be called
    /// from within a tokio runtime.
    pub fn start_stream(self: &Arc<Self>) -> Result<(), WorkflowError> {
        if !self.schema.streams {
            return Err(WorkflowError::StreamUnavailable(self.schema.kind));
        }
        let period = self.settings.stream_interval().max(MIN_STREAM_PERIOD);
        {
            let mut state = self.state.lock();
            if state.stream.is_some() {
                return Err(WorkflowError::StreamActive);
            }
            let generation = state.generation;
            let workflow = Arc::downgrade(self);
            state.stream = Some(tokio::spawn(async move {
                let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let Some(workflow) = workflow.upgrade() else {
                        break;
                    };
                    if !workflow.append_live(generation) {
                        break;
                    }
                }
            }));
        }
        let interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        info!(
            "stream started (workflow_id={}, interval_ms={})",
            self.id, interval_ms
        );
        self.emit(WorkflowEventPayload::StreamStarted { interval_ms });
        Ok(())
    }

    /// Stop the live stream. Returns whether one was running.
    pub fn stop_stream(&self) -> bool {
        let handle = self.state.lock().stream.take();
        let Some(handle) = handle else {
            return false;
        };
        handle.abort();
        info!("stream stopped (workflow_id={})", self.id);
        self.emit(WorkflowEventPayload::StreamStopped);
        true
    }

    /// Whether the live stream is running.
    pub fn is_streaming(&self) -> bool {
        self.state.lock().stream.is_some()
    }

    /// Append one live record. Returns false once the stream should end.
    fn append_live(&self, generation: u64) -> bool {
        let record = self.generator.generate(self.schema.kind);
        let record_id = record.id().to_string();
        let now = self.clock.now();
        let (matched, evicted) = {
            let mut state = self.state.lock();
            if state.generation != generation || state.stream.is_none() {
                return false;
            }
            let matched = matches(&record, &state.criteria, now);
            state.records.push_front(record);
            let mut evicted = None;
            while state.records.len() > self.settings.buffer_capacity.max(1) {
                evicted = state.records.pop_back().map(|old| old.id().to_string());
            }
            (matched, evicted)
        };
        debug!(
            "record appended (workflow_id={}, record_id={}, matched={})",
            self.id, record_id, matched
        );
        self.emit(WorkflowEventPayload::RecordAppended {
            record_id,
            matched,
            evicted,
        });
        true
    }

    /// Replace the criteria wholesale. Returns the number of matching records.
    pub fn set_criteria(&self, criteria: FilterCriteria) -> Result<usize, WorkflowError> {
        self.schema.validate_criteria(&criteria)?;
        let now = self.clock.now();
        let (matched, total) = {
            let mut state = self.state.lock();
            let matched = state
                .records
                .iter()
                .filter(|record| matches(record, &criteria, now))
                .count();
            state.criteria = criteria;
            (matched, state.records.len())
        };
        debug!(
            "criteria changed (workflow_id={}, matched={}, total={})",
            self.id, matched, total
        );
        self.emit(WorkflowEventPayload::CriteriaChanged { matched, total });
        Ok(matched)
    }

    /// Parse flat filter parameters and apply them.
    pub fn set_criteria_params(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<usize, WorkflowError> {
        let criteria = self.schema.criteria_from_params(params)?;
        self.set_criteria(criteria)
    }

    /// Buffered records, newest first, optionally restricted to the filtered view.
    pub fn records(&self, filtered: bool) -> Vec<Record> {
        let state = self.state.lock();
        if filtered {
            filter_records(&state.records, &state.criteria, self.clock.now())
        } else {
            state.records.iter().cloned().collect()
        }
    }

    /// Build the run's capsule from the current filtered view.
    ///
    /// The capsule is computed from the view at call time and published after
    /// the capsule delay.
    pub async fn create_capsule(&self) -> Result<Capsule, WorkflowError> {
        let step = WorkflowStep::Capsule;
        let (capsule, pending) = {
            let mut state = self.state.lock();
            state.ensure_no_pending()?;
            if state.capsule.is_some() {
                return Err(WorkflowError::AlreadyCompleted(step));
            }
            let now = self.clock.now();
            let filtered = filter_records(&state.records, &state.criteria, now);
            if filtered.is_empty() {
                return Err(WorkflowError::EmptySelection);
            }
            let capsule = build_capsule(
                &filtered,
                &state.criteria,
                self.schema,
                self.ids.as_ref(),
                now,
            )?;
            (capsule, self.begin(&mut state, step))
        };
        self.emit(WorkflowEventPayload::StepStarted { step });
        tokio::time::sleep(self.capsule_delay).await;

        pending.commit(|state| state.capsule = Some(capsule.clone()))?;
        info!(
            "capsule created (workflow_id={}, capsule_id={}, total_events={})",
            self.id, capsule.id, capsule.metadata_summary.total_events
        );
        self.emit(WorkflowEventPayload::CapsuleCreated {
            capsule_id: capsule.id.clone(),
            total_events: capsule.metadata_summary.total_events,
        });
        Ok(capsule)
    }

    /// Anchor the run's capsule on the simulated chain.
    pub async fn anchor(&self) -> Result<Anchor, WorkflowError> {
        let step = WorkflowStep::Anchor;
        if !self.schema.offers(step) {
            return Err(WorkflowError::Unsupported {
                step,
                domain: self.schema.kind,
            });
        }
        let (capsule, pending) = {
            let mut state = self.state.lock();
            state.ensure_no_pending()?;
            if state.anchor.is_some() {
                return Err(WorkflowError::AlreadyCompleted(step));
            }
            if state.report.is_some() {
                return Err(WorkflowError::AlreadyCompleted(WorkflowStep::Verify));
            }
            let capsule = state.capsule.clone().ok_or(WorkflowError::MissingCapsule)?;
            (capsule, self.begin(&mut state, step))
        };
        self.emit(WorkflowEventPayload::StepStarted { step });

        let generation = pending.generation;
        let result = self
            .anchors
            .anchor(&capsule, |phase| {
                if self.is_current(generation) {
                    self.emit(WorkflowEventPayload::AnchorProgress { phase });
                }
            })
            .await;
        let anchor = match result {
            Ok(anchor) => anchor,
            Err(err) => return Err(pending.fail(err)),
        };

        pending.commit(|state| state.anchor = Some(anchor.clone()))?;
        self.emit(WorkflowEventPayload::AnchorConfirmed {
            capsule_id: anchor.capsule_id.clone(),
            tx_hash: anchor.tx_hash.clone(),
            block_number: anchor.block_number,
        });
        Ok(anchor)
    }

    /// Verify the run's capsule, including its anchor when one exists.
    pub async fn verify(&self) -> Result<VerificationReport, WorkflowError> {
        let step = WorkflowStep::Verify;
        let (capsule, anchor, pending) = {
            let mut state = self.state.lock();
            state.ensure_no_pending()?;
            if state.report.is_some() {
                return Err(WorkflowError::AlreadyCompleted(step));
            }
            let capsule = state.capsule.clone().ok_or(WorkflowError::MissingCapsule)?;
            let anchor = state.anchor.clone();
            (capsule, anchor, self.begin(&mut state, step))
        };
        self.emit(WorkflowEventPayload::StepStarted { step });

        let report = self.verifier.verify(&capsule, anchor.as_ref()).await;
        pending.commit(|state| state.report = Some(report.clone()))?;
        self.emit(WorkflowEventPayload::VerificationCompleted {
            capsule_id: report.capsule_id.clone(),
            ok: report.ok,
        });
        Ok(report)
    }

    /// Clear everything back to idle and stop the live stream.
    ///
    /// Steps suspended in their delay when the reset lands finish with
    /// `WorkflowError::Superseded` and leave no trace.
    pub fn reset(&self) {
        let stream = {
            let mut state = self.state.lock();
            let generation = state.generation + 1;
            let stream = state.stream.take();
            *state = RunState {
                generation,
                ..RunState::default()
            };
            stream
        };
        if let Some(handle) = stream {
            handle.abort();
        }
        info!("workflow reset (workflow_id={})", self.id);
        self.emit(WorkflowEventPayload::Reset);
    }

    /// Point-in-time view of the run.
    pub fn snapshot(&self) -> WorkflowSnapshot {
        let now = self.clock.now();
        let state = self.state.lock();
        WorkflowSnapshot {
            workflow_id: self.id,
            domain: self.schema.kind,
            stage: state.stage(),
            streaming: state.stream.is_some(),
            pending: state.pending,
            record_count: state.records.len(),
            filtered_count: state
                .records
                .iter()
                .filter(|record| matches(record, &state.criteria, now))
                .count(),
            criteria: state.criteria.clone(),
            capsule: state.capsule.clone(),
            anchor: state.anchor.clone(),
            report: state.report.clone(),
            created_at: self.created_at,
        }
    }

    pub fn summary(&self) -> WorkflowSummary {
        let state = self.state.lock();
        WorkflowSummary {
            workflow_id: self.id,
            domain: self.schema.kind,
            stage: state.stage(),
            record_count: state.records.len(),
            created_at: self.created_at,
        }
    }

    fn begin(&self, state: &mut RunState, step: WorkflowStep) -> PendingStep<'_> {
        state.pending = Some(step);
        debug!("step started (workflow_id={}, step={})", self.id, step);
        PendingStep {
            workflow: self,
            step,
            generation: state.generation,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.state.lock().generation == generation
    }

    fn emit(&self, payload: WorkflowEventPayload) {
        if let Some(sink) = &self.event_sink {
            sink.emit(WorkflowEvent::new(self.id, self.clock.now(), payload));
        }
    }
}

impl Drop for Workflow {
    fn drop(&mut self) {
        if let Some(handle) = self.state.get_mut().stream.take() {
            handle.abort();
        }
    }
}

/// Marks a step as pending until committed, failed, or dropped.
///
/// Dropping the guard (for example when the caller's future is cancelled)
/// clears the pending marker so the run is not left blocked.
struct PendingStep<'a> {
    workflow: &'a Workflow,
    step: WorkflowStep,
    generation: u64,
}

impl PendingStep<'_> {
    /// Publish the step's artifact unless a reset superseded it.
    fn commit(self, apply: impl FnOnce(&mut RunState)) -> Result<(), WorkflowError> {
        let mut state = self.workflow.state.lock();
        if state.generation != self.generation {
            debug!(
                "step superseded (workflow_id={}, step={})",
                self.workflow.id, self.step
            );
            return Err(WorkflowError::Superseded(self.step));
        }
        state.pending = None;
        apply(&mut state);
        Ok(())
    }

    /// Record a simulated failure and hand the error back.
    fn fail(self, err: WorkflowError) -> WorkflowError {
        {
            let mut state = self.workflow.state.lock();
            if state.generation != self.generation {
                return WorkflowError::Superseded(self.step);
            }
            state.pending = None;
        }
        info!(
            "step failed (workflow_id={}, step={}, error={})",
            self.workflow.id, self.step, err
        );
        self.workflow.emit(WorkflowEventPayload::StepFailed {
            step: self.step,
            message: err.to_string(),
        });
        err
    }
}

impl Drop for PendingStep<'_> {
    fn drop(&mut self) {
        let mut state = self.workflow.state.lock();
        if state.generation == self.generation && state.pending == Some(self.step) {
            state.pending = None;
        }
    }
}
