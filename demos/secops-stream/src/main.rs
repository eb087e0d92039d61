use anyhow::{Context, Result};
use insight_rs::config::{InsightConfig, WorkflowConfig};
use insight_rs::core::{EventBus, EventSink, Workflow, WorkflowServices};
use insight_rs::init_logging;
use insight_rs::protocol::{DomainKind, FilterCriteria, WorkflowEventPayload};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let ticks: u32 = std::env::args()
        .nth(1)
        .map(|arg| arg.parse())
        .transpose()
        .context("tick count must be a number")?
        .unwrap_or(12);

    // Small buffer so the stream starts evicting within a few seconds.
    let config = InsightConfig::builder()
        .workflow(WorkflowConfig {
            buffer_capacity: 8,
            stream_interval_ms: 250,
            ..WorkflowConfig::default()
        })
        .build();

    let events = Arc::new(EventBus::new(256));
    let mut stream = events.stream();
    let sink: Arc<dyn EventSink> = events.clone();
    let workflow = Arc::new(Workflow::new(
        DomainKind::SecOps,
        &config,
        WorkflowServices::simulated(),
        Some(sink),
    ));

    let printer = tokio::spawn(async move {
        while let Some(Ok(event)) = stream.next().await {
            match event.payload {
                WorkflowEventPayload::RecordAppended {
                    record_id,
                    matched,
                    evicted,
                } => {
                    let marker = if matched { "*" } else { " " };
                    match evicted {
                        Some(old) => println!("{marker} {record_id} (evicted {old})"),
                        None => println!("{marker} {record_id}"),
                    }
                }
                other => println!("-- {other:?}"),
            }
        }
    });

    workflow
        .set_criteria(FilterCriteria::new().with_exact("severity", "WARN"))
        .context("failed to apply criteria")?;
    workflow.start_stream().context("failed to start stream")?;
    let interval = config.workflow.stream_interval();
    tokio::time::sleep(interval * ticks + Duration::from_millis(50)).await;
    workflow.stop_stream();

    let buffered = workflow.records(false);
    let matched = workflow.records(true);
    println!(
        "buffer holds {} records, {} WARN",
        buffered.len(),
        matched.len()
    );

    if matched.is_empty() {
        println!("no WARN records streamed; nothing to capsule");
    } else {
        let capsule = workflow.create_capsule().await?;
        let report = workflow.verify().await?;
        println!(
            "capsule {} over {} events: {}",
            capsule.id, capsule.metadata_summary.total_events, report.message
        );
    }

    drop(workflow);
    drop(events);
    printer.await.context("event printer failed")?;
    Ok(())
}
