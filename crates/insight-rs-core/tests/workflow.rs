//! Workflow state machine integration tests with scripted randomness.

use chrono::{TimeDelta, TimeZone, Utc};
use insight_rs_config::{InsightConfig, LatencyConfig, WorkflowConfig};
use insight_rs_core::{DomainSchema, Workflow, WorkflowError, WorkflowServices};
use insight_rs_protocol::{
    AnchorPhase, CHECK_ANCHOR_CONFIRMED, CHECK_TIMESTAMP_VALIDITY, DomainKind, FilterCriteria,
    Severity, TimeWindow, WorkflowEventPayload, WorkflowStage, WorkflowStep,
};
use insight_rs_test_utils::{
    FailingFaults, ManualClock, RecordingSink, ScriptedRandom, SequentialIds,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn instant_config() -> InsightConfig {
    InsightConfig::builder()
        .latency(LatencyConfig::instant())
        .build()
}

fn services(random: ScriptedRandom) -> WorkflowServices {
    WorkflowServices::simulated()
        .with_random(Arc::new(random))
        .with_ids(Arc::new(SequentialIds::new()))
        .with_clock(Arc::new(ManualClock::starting_now()))
}

fn workflow(domain: DomainKind) -> Workflow {
    Workflow::new(
        domain,
        &instant_config(),
        services(ScriptedRandom::new()),
        None,
    )
}

/// Five scripted severities filtered to WARN yield a two-record capsule.
#[tokio::test]
async fn warn_filter_scenario_builds_two_event_capsule() {
    use Severity::*;
    let random = ScriptedRandom::new().with_labels(
        "severity",
        Severity::ALL,
        [Info, Warn, Error, Info, Warn],
    );
    let workflow = Workflow::new(DomainKind::SecOps, &instant_config(), services(random), None);

    assert_eq!(workflow.generate(Some(5)).expect("generate"), 5);
    let matched = workflow
        .set_criteria(FilterCriteria::new().with_exact("severity", "WARN"))
        .expect("criteria");
    assert_eq!(matched, 2);
    assert_eq!(workflow.records(true).len(), 2);
    assert_eq!(workflow.stage(), WorkflowStage::Filtered);

    let capsule = workflow.create_capsule().await.expect("capsule");
    assert_eq!(capsule.metadata_summary.total_events, 2);
    assert_eq!(capsule.metadata_summary.breakdown.get("WARN"), Some(&2));
    assert_eq!(workflow.stage(), WorkflowStage::CapsuleReady);
}

#[tokio::test]
async fn capsule_totals_match_breakdown() {
    for kind in DomainKind::ALL {
        let workflow = Workflow::new(
            *kind,
            &instant_config(),
            WorkflowServices::simulated(),
            None,
        );
        workflow.generate(Some(30)).expect("generate");
        let filtered = workflow.records(true).len();
        let capsule = workflow.create_capsule().await.expect("capsule");
        let summary = &capsule.metadata_summary;
        assert_eq!(summary.total_events, filtered);
        assert_eq!(summary.breakdown.values().sum::<usize>(), summary.total_events);
    }
}

#[test]
fn sentinel_criteria_keep_every_record() {
    for kind in DomainKind::ALL {
        let workflow = Workflow::new(
            *kind,
            &instant_config(),
            WorkflowServices::simulated(),
            None,
        );
        workflow.generate(Some(20)).expect("generate");
        let all = DomainSchema::for_kind(*kind).match_all_criteria();
        assert_eq!(workflow.set_criteria(all).expect("criteria"), 20);
        assert_eq!(workflow.stage(), WorkflowStage::Generated);
    }
}

#[tokio::test]
async fn oversized_time_range_leaves_workflow_usable() {
    let workflow = workflow(DomainKind::SecOps);
    workflow.generate(Some(3)).expect("generate");

    let mut params = BTreeMap::new();
    params.insert("time_range".to_string(), "100000000d".to_string());
    assert!(matches!(
        workflow.set_criteria_params(&params),
        Err(WorkflowError::InvalidWindow(_))
    ));
    assert!(workflow.snapshot().criteria.window.is_none());

    let matched = workflow
        .set_criteria(FilterCriteria::new().with_window(TimeWindow::days(u32::MAX)))
        .expect("criteria");
    assert_eq!(matched, 3);
    assert_eq!(workflow.snapshot().filtered_count, 3);
    let capsule = workflow.create_capsule().await.expect("capsule");
    assert_eq!(capsule.metadata_summary.total_events, 3);
}

#[tokio::test]
async fn empty_view_blocks_capsule_without_side_effects() {
    let workflow = workflow(DomainKind::SecOps);
    workflow.generate(Some(4)).expect("generate");
    let mut params = BTreeMap::new();
    params.insert("source".to_string(), "no-such-source".to_string());
    assert_eq!(workflow.set_criteria_params(&params).expect("criteria"), 0);

    assert_eq!(
        workflow.create_capsule().await.unwrap_err(),
        WorkflowError::EmptySelection
    );
    let snapshot = workflow.snapshot();
    assert!(snapshot.capsule.is_none());
    assert_eq!(snapshot.pending, None);
    assert_eq!(snapshot.stage, WorkflowStage::Filtered);
}

#[tokio::test]
async fn capsule_is_created_at_most_once() {
    let workflow = workflow(DomainKind::Model);
    workflow.generate(None).expect("generate");
    let first = workflow.create_capsule().await.expect("capsule");
    let err = workflow.create_capsule().await.unwrap_err();
    assert_eq!(err, WorkflowError::AlreadyCompleted(WorkflowStep::Capsule));
    assert_eq!(workflow.snapshot().capsule.map(|capsule| capsule.id), Some(first.id));
}

#[tokio::test]
async fn verify_without_anchor_reports_every_event() {
    let workflow = workflow(DomainKind::Model);
    assert_eq!(
        workflow.verify().await.unwrap_err(),
        WorkflowError::MissingCapsule
    );
    workflow.generate(Some(12)).expect("generate");
    let capsule = workflow.create_capsule().await.expect("capsule");

    let report = workflow.verify().await.expect("verify");
    assert!(report.ok);
    assert_eq!(report.events_verified, capsule.metadata_summary.total_events);
    assert_eq!(report.capsule_id, capsule.id);
    assert_eq!(report.anchor_tx, None);
    assert!(!report.checks.contains_key(CHECK_ANCHOR_CONFIRMED));
    assert!(report.checks.values().all(|passed| *passed));
    assert_eq!(workflow.stage(), WorkflowStage::Verified);

    assert_eq!(
        workflow.verify().await.unwrap_err(),
        WorkflowError::AlreadyCompleted(WorkflowStep::Verify)
    );
}

#[tokio::test]
async fn events_are_stamped_by_the_injected_clock() {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::new(start));
    let sink = Arc::new(RecordingSink::new());
    let workflow = Workflow::new(
        DomainKind::Model,
        &instant_config(),
        services(ScriptedRandom::new()).with_clock(clock.clone()),
        Some(sink.clone()),
    );

    workflow.generate(Some(2)).expect("generate");
    clock.advance(TimeDelta::minutes(5));
    let capsule = workflow.create_capsule().await.expect("capsule");

    let stamps: Vec<_> = sink.events().iter().map(|event| event.created_at).collect();
    assert_eq!(stamps.first(), Some(&start));
    assert_eq!(stamps.last(), Some(&(start + TimeDelta::minutes(5))));
    assert_eq!(capsule.created_at, start + TimeDelta::minutes(5));
}

#[tokio::test]
async fn blockchain_run_anchors_then_verifies() {
    let sink = Arc::new(RecordingSink::new());
    let workflow = Workflow::new(
        DomainKind::Blockchain,
        &instant_config(),
        services(ScriptedRandom::new().with_ranges("block_offset", [4_242])),
        Some(sink.clone()),
    );
    assert_eq!(
        workflow.anchor().await.unwrap_err(),
        WorkflowError::MissingCapsule
    );
    workflow.generate(Some(10)).expect("generate");
    let capsule = workflow.create_capsule().await.expect("capsule");

    let anchor = workflow.anchor().await.expect("anchor");
    assert_eq!(anchor.capsule_id, capsule.id);
    assert_eq!(anchor.block_number, 18_500_000 + 4_242);
    assert_eq!(anchor.confirmations, 12);
    assert_eq!(
        anchor.explorer_url,
        format!("https://sepolia.etherscan.io/tx/{}", anchor.tx_hash)
    );
    assert_eq!(workflow.stage(), WorkflowStage::Anchored);
    assert_eq!(
        workflow.anchor().await.unwrap_err(),
        WorkflowError::AlreadyCompleted(WorkflowStep::Anchor)
    );

    let report = workflow.verify().await.expect("verify");
    assert!(report.ok);
    assert_eq!(report.anchor_tx.as_deref(), Some(anchor.tx_hash.as_str()));
    assert_eq!(report.checks.get(CHECK_ANCHOR_CONFIRMED), Some(&true));

    let phases: Vec<AnchorPhase> = sink
        .payloads()
        .into_iter()
        .filter_map(|payload| match payload {
            WorkflowEventPayload::AnchorProgress { phase } => Some(phase),
            _ => None,
        })
        .collect();
    assert_eq!(phases, AnchorPhase::ALL.to_vec());
    assert!(sink.payloads().contains(&WorkflowEventPayload::AnchorConfirmed {
        capsule_id: capsule.id.clone(),
        tx_hash: anchor.tx_hash.clone(),
        block_number: anchor.block_number,
    }));
}

#[tokio::test]
async fn anchor_after_verification_is_rejected() {
    let workflow = workflow(DomainKind::Blockchain);
    workflow.generate(Some(3)).expect("generate");
    workflow.create_capsule().await.expect("capsule");
    workflow.verify().await.expect("verify");
    assert_eq!(
        workflow.anchor().await.unwrap_err(),
        WorkflowError::AlreadyCompleted(WorkflowStep::Verify)
    );
}

#[tokio::test]
async fn reset_from_any_stage_returns_to_idle() {
    let idle = workflow(DomainKind::Blockchain).snapshot();
    for steps in 0..=5 {
        let workflow = workflow(DomainKind::Blockchain);
        if steps >= 1 {
            workflow.generate(Some(8)).expect("generate");
        }
        if steps >= 2 {
            workflow
                .set_criteria(FilterCriteria::new().with_exact("region", "EU"))
                .expect("criteria");
            workflow.set_criteria(FilterCriteria::new()).expect("criteria");
        }
        if steps >= 3 {
            workflow.create_capsule().await.expect("capsule");
        }
        if steps >= 4 {
            workflow.anchor().await.expect("anchor");
        }
        if steps >= 5 {
            workflow.verify().await.expect("verify");
        }

        for _ in 0..2 {
            workflow.reset();
            let snapshot = workflow.snapshot();
            assert_eq!(snapshot.stage, WorkflowStage::Idle);
            assert_eq!(snapshot.record_count, 0);
            assert_eq!(snapshot.filtered_count, 0);
            assert_eq!(snapshot.criteria, idle.criteria);
            assert!(snapshot.capsule.is_none());
            assert!(snapshot.anchor.is_none());
            assert!(snapshot.report.is_none());
            assert!(!snapshot.streaming);
            assert_eq!(snapshot.pending, None);
        }
    }
}

#[tokio::test]
async fn time_window_tracks_the_clock() {
    let clock = Arc::new(ManualClock::starting_now());
    let random = ScriptedRandom::new().with_ranges(
        "timestamp_offset_ms",
        [0, 30 * 60 * 1_000, 2 * 60 * 60 * 1_000],
    );
    let services = WorkflowServices::simulated()
        .with_random(Arc::new(random))
        .with_ids(Arc::new(SequentialIds::new()))
        .with_clock(clock.clone());
    let workflow = Workflow::new(DomainKind::Blockchain, &instant_config(), services, None);
    workflow.generate(Some(3)).expect("generate");

    let mut params = BTreeMap::new();
    params.insert("time_range".to_string(), "1h".to_string());
    assert_eq!(workflow.set_criteria_params(&params).expect("criteria"), 2);

    clock.advance(TimeDelta::minutes(45));
    assert_eq!(workflow.snapshot().filtered_count, 1);
}

#[tokio::test]
async fn anchor_fault_leaves_capsule_ready() {
    let sink = Arc::new(RecordingSink::new());
    let services = services(ScriptedRandom::new())
        .with_faults(Arc::new(FailingFaults::anchor("node unreachable")));
    let workflow = Workflow::new(
        DomainKind::Blockchain,
        &instant_config(),
        services,
        Some(sink.clone()),
    );
    workflow.generate(Some(5)).expect("generate");
    workflow.create_capsule().await.expect("capsule");

    let err = workflow.anchor().await.unwrap_err();
    assert_eq!(
        err,
        WorkflowError::StepFailed {
            step: WorkflowStep::Anchor,
            message: "node unreachable".to_string(),
        }
    );
    let snapshot = workflow.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::CapsuleReady);
    assert!(snapshot.anchor.is_none());
    assert_eq!(snapshot.pending, None);
    assert!(sink.payloads().iter().any(|payload| matches!(
        payload,
        WorkflowEventPayload::StepFailed {
            step: WorkflowStep::Anchor,
            ..
        }
    )));
}

#[tokio::test]
async fn forced_check_failure_produces_failed_report() {
    let services = services(ScriptedRandom::new())
        .with_faults(Arc::new(FailingFaults::check(CHECK_TIMESTAMP_VALIDITY)));
    let workflow = Workflow::new(DomainKind::SecOps, &instant_config(), services, None);
    workflow.generate(Some(5)).expect("generate");
    workflow.create_capsule().await.expect("capsule");

    let report = workflow.verify().await.expect("verify");
    assert!(!report.ok);
    assert!(report.message.contains(CHECK_TIMESTAMP_VALIDITY));
    assert_eq!(
        report.failed_checks().collect::<Vec<_>>(),
        vec![CHECK_TIMESTAMP_VALIDITY]
    );
    assert_eq!(workflow.stage(), WorkflowStage::Verified);
}

#[tokio::test(start_paused = true)]
async fn pending_step_blocks_others_and_reset_supersedes_it() {
    let config = InsightConfig::builder()
        .latency(LatencyConfig {
            capsule_ms: 1_000,
            ..LatencyConfig::instant()
        })
        .build();
    let workflow = Arc::new(Workflow::new(
        DomainKind::Model,
        &config,
        services(ScriptedRandom::new()),
        None,
    ));
    workflow.generate(Some(5)).expect("generate");

    let task = tokio::spawn({
        let workflow = workflow.clone();
        async move { workflow.create_capsule().await }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(workflow.snapshot().pending, Some(WorkflowStep::Capsule));
    assert_eq!(
        workflow.create_capsule().await.unwrap_err(),
        WorkflowError::StepInFlight(WorkflowStep::Capsule)
    );
    assert_eq!(
        workflow.verify().await.unwrap_err(),
        WorkflowError::StepInFlight(WorkflowStep::Capsule)
    );

    workflow.reset();
    let result = task.await.expect("join");
    assert_eq!(
        result.unwrap_err(),
        WorkflowError::Superseded(WorkflowStep::Capsule)
    );
    let snapshot = workflow.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::Idle);
    assert!(snapshot.capsule.is_none());
    assert_eq!(snapshot.pending, None);
}

#[tokio::test(start_paused = true)]
async fn cancelled_step_releases_pending_marker() {
    let config = InsightConfig::builder()
        .latency(LatencyConfig {
            verify_ms: 5_000,
            ..LatencyConfig::instant()
        })
        .build();
    let workflow = Arc::new(Workflow::new(
        DomainKind::SecOps,
        &config,
        services(ScriptedRandom::new()),
        None,
    ));
    workflow.generate(Some(2)).expect("generate");
    workflow.create_capsule().await.expect("capsule");

    let task = tokio::spawn({
        let workflow = workflow.clone();
        async move { workflow.verify().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(workflow.snapshot().pending, Some(WorkflowStep::Verify));
    task.abort();
    assert!(task.await.is_err());

    assert_eq!(workflow.snapshot().pending, None);
    assert!(workflow.verify().await.expect("verify").ok);
}

#[test]
fn batch_size_comes_from_config() {
    let config = InsightConfig::builder()
        .latency(LatencyConfig::instant())
        .workflow(WorkflowConfig {
            batch_size: 7,
            ..WorkflowConfig::default()
        })
        .build();
    let workflow = Workflow::new(
        DomainKind::Model,
        &config,
        WorkflowServices::simulated(),
        None,
    );
    assert_eq!(workflow.generate(None).expect("generate"), 7);
    assert_eq!(workflow.snapshot().record_count, 7);
}
