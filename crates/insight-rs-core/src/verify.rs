//! Simulated capsule verification.
//!
//! The report is not evidence of anything. The sub-checks only confirm that
//! the capsule summary is internally consistent and that the anchor (when
//! present) refers to it. With the default fault hook every check passes.

use crate::clock::Clock;
use crate::fault::FaultHook;
use crate::random::RandomSource;
use insight_rs_protocol::{
    Anchor, CHECK_ANCHOR_CONFIRMED, CHECK_CAPSULE_INTEGRITY, CHECK_METADATA_CONSISTENCY,
    CHECK_TIMESTAMP_VALIDITY, Capsule, VerificationReport,
};
use log::{info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Produces verification reports after one artificial delay.
#[derive(Clone)]
pub struct VerificationSimulator {
    delay: Duration,
    random: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
    faults: Arc<dyn FaultHook>,
}

impl VerificationSimulator {
    pub fn new(
        delay: Duration,
        random: Arc<dyn RandomSource>,
        clock: Arc<dyn Clock>,
        faults: Arc<dyn FaultHook>,
    ) -> Self {
        Self {
            delay,
            random,
            clock,
            faults,
        }
    }

    /// Verify `capsule` and, when given, its anchor.
    pub async fn verify(&self, capsule: &Capsule, anchor: Option<&Anchor>) -> VerificationReport {
        tokio::time::sleep(self.delay).await;

        let summary = &capsule.metadata_summary;
        let mut checks = BTreeMap::new();
        checks.insert(CHECK_CAPSULE_INTEGRITY.to_string(), summary.total_events > 0);
        checks.insert(
            CHECK_METADATA_CONSISTENCY.to_string(),
            summary.breakdown.values().sum::<usize>() == summary.total_events
                && summary.distinct_identities <= summary.total_events,
        );
        checks.insert(
            CHECK_TIMESTAMP_VALIDITY.to_string(),
            summary.time_range.start <= summary.time_range.end
                && summary.time_range.end <= capsule.created_at,
        );
        if let Some(anchor) = anchor {
            checks.insert(
                CHECK_ANCHOR_CONFIRMED.to_string(),
                anchor.capsule_id == capsule.id && anchor.confirmations > 0,
            );
        }
        if let Some(check) = self.faults.failed_check(capsule) {
            warn!(
                "verification fault injected (capsule_id={}, check={})",
                capsule.id, check
            );
            checks.insert(check, false);
        }

        let failed: Vec<&str> = checks
            .iter()
            .filter(|(_, passed)| !**passed)
            .map(|(name, _)| name.as_str())
            .collect();
        let ok = failed.is_empty();
        let message = if ok {
            format!(
                "Capsule verified: {} events, all checks passed",
                summary.total_events
            )
        } else {
            format!("Verification failed: {}", failed.join(", "))
        };
        info!(
            "capsule verified (capsule_id={}, ok={}, anchored={})",
            capsule.id,
            ok,
            anchor.is_some()
        );

        VerificationReport {
            capsule_id: capsule.id.clone(),
            ok,
            message,
            latency_ms: self.random.range("verify_latency_ms", 40, 250),
            checks,
            events_verified: summary.total_events,
            anchor_tx: anchor.map(|anchor| anchor.tx_hash.clone()),
            verified_at: self.clock.now(),
        }
    }
}
