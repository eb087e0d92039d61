//! In-process workflow demo for the `insight demo` subcommand.

use anyhow::{Context, Result};
use insight_rs::config::InsightConfig;
use insight_rs::core::{EventBus, Workflow, WorkflowServices};
use insight_rs::protocol::{DomainKind, WorkflowEventPayload, WorkflowStep};
use log::info;
use std::collections::BTreeMap;
use std::sync::Arc;

pub(crate) struct DemoOptions {
    pub domain: DomainKind,
    pub count: Option<usize>,
    /// Live records to stream instead of a batch.
    pub stream_ticks: Option<usize>,
    pub filters: BTreeMap<String, String>,
}

/// Parse a `key=value` filter argument.
pub(crate) fn parse_filter(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing filter key in `{raw}`"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// One-line rendering of a workflow event.
pub(crate) fn describe(payload: &WorkflowEventPayload) -> String {
    match payload {
        WorkflowEventPayload::RecordsGenerated { count, matched } => {
            format!("generated {count} records ({matched} match)")
        }
        WorkflowEventPayload::RecordAppended {
            record_id,
            matched,
            evicted,
        } => {
            let mut line = format!("appended {record_id}");
            if *matched {
                line.push_str(" (match)");
            }
            if let Some(evicted) = evicted {
                line.push_str(&format!(", evicted {evicted}"));
            }
            line
        }
        WorkflowEventPayload::StreamStarted { interval_ms } => {
            format!("stream started (every {interval_ms} ms)")
        }
        WorkflowEventPayload::StreamStopped => "stream stopped".to_string(),
        WorkflowEventPayload::CriteriaChanged { matched, total } => {
            format!("criteria applied: {matched}/{total} records match")
        }
        WorkflowEventPayload::StepStarted { step } => format!("{step} started"),
        WorkflowEventPayload::AnchorProgress { phase } => format!("anchor {phase}"),
        WorkflowEventPayload::CapsuleCreated {
            capsule_id,
            total_events,
        } => format!("capsule {capsule_id} created over {total_events} events"),
        WorkflowEventPayload::AnchorConfirmed {
            capsule_id,
            tx_hash,
            block_number,
        } => format!("capsule {capsule_id} anchored in block {block_number} ({tx_hash})"),
        WorkflowEventPayload::VerificationCompleted { capsule_id, ok } => {
            let outcome = if *ok { "passed" } else { "failed" };
            format!("verification of {capsule_id} {outcome}")
        }
        WorkflowEventPayload::StepFailed { step, message } => {
            format!("{step} failed: {message}")
        }
        WorkflowEventPayload::Reset => "reset".to_string(),
    }
}

/// Drive one workflow through every step its domain offers.
pub(crate) async fn run(config: InsightConfig, options: DemoOptions) -> Result<()> {
    let bus = Arc::new(EventBus::new(256));
    let mut receiver = bus.subscribe();
    let printer = tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            println!(
                "[{}] {}",
                event.created_at.format("%H:%M:%S%.3f"),
                describe(&event.payload)
            );
        }
    });

    let workflow = Arc::new(Workflow::new(
        options.domain,
        &config,
        WorkflowServices::simulated(),
        Some(bus.clone()),
    ));
    info!(
        "running demo (workflow_id={}, domain={})",
        workflow.id(),
        options.domain
    );

    match options.stream_ticks {
        Some(ticks) => {
            workflow.start_stream()?;
            let interval = config.workflow.stream_interval();
            let ticks = u32::try_from(ticks).unwrap_or(u32::MAX);
            tokio::time::sleep(interval.saturating_mul(ticks) + interval / 2).await;
            workflow.stop_stream();
        }
        None => {
            workflow.generate(options.count)?;
        }
    }
    if !options.filters.is_empty() {
        workflow.set_criteria_params(&options.filters)?;
    }

    workflow.create_capsule().await?;
    if workflow.schema().offers(WorkflowStep::Anchor) {
        workflow.anchor().await?;
    }
    workflow.verify().await?;

    let snapshot = workflow.snapshot();
    drop(workflow);
    drop(bus);
    printer.await.context("event printer failed")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).context("failed to render snapshot")?
    );
    Ok(())
}
