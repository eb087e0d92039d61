use anyhow::{Context, Result};
use insight_rs::config::InsightConfig;
use insight_rs::core::{EventBus, EventSink, Workflow, WorkflowServices};
use insight_rs::init_logging;
use insight_rs::protocol::{DomainKind, WorkflowEventPayload};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    // File-based config: shorter delays than the defaults.
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("insight.json5");
    let config_display = config_path.display().to_string();
    let config = InsightConfig::load_from_path(&config_path)
        .with_context(|| format!("failed to load config at {config_display}"))?;

    let status = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "compliant".to_string());

    let events = Arc::new(EventBus::new(128));
    let mut receiver = events.subscribe();
    let sink: Arc<dyn EventSink> = events.clone();
    let workflow = Workflow::new(
        DomainKind::Blockchain,
        &config,
        WorkflowServices::simulated(),
        Some(sink),
    );

    let printer = tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            if let WorkflowEventPayload::AnchorProgress { phase } = &event.payload {
                println!("anchor: {phase}");
            }
        }
    });

    let count = workflow.generate(None)?;
    let params = BTreeMap::from([
        ("status".to_string(), status.clone()),
        ("time_range".to_string(), "24h".to_string()),
    ]);
    let matched = workflow.set_criteria_params(&params)?;
    println!("{matched} of {count} rows are {status}");
    if matched == 0 {
        println!("nothing to anchor");
        return Ok(());
    }

    let capsule = workflow.create_capsule().await?;
    let anchor = workflow.anchor().await?;
    let report = workflow.verify().await?;

    println!("{}", serde_json::to_string_pretty(&capsule)?);
    println!("explorer: {}", anchor.explorer_url);
    println!("{}", report.message);

    drop(workflow);
    drop(events);
    printer.await.context("event printer failed")?;
    Ok(())
}
