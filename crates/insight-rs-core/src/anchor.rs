//! Simulated on-chain anchoring.
//!
//! Anchoring walks through three timed phases and then fabricates the
//! transaction details. Nothing is submitted anywhere.

use crate::clock::Clock;
use crate::error::WorkflowError;
use crate::fault::FaultHook;
use crate::ids::{IdKind, IdProvider};
use crate::random::RandomSource;
use insight_rs_config::{AnchorConfig, LatencyConfig};
use insight_rs_protocol::{Anchor, AnchorPhase, Capsule, WorkflowStep};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

const GAS_MIN: u64 = 21_000;
const GAS_MAX: u64 = 120_000;

/// Fabricates anchors after staged artificial delays.
#[derive(Clone)]
pub struct AnchorSimulator {
    config: AnchorConfig,
    phases: [Duration; 3],
    random: Arc<dyn RandomSource>,
    ids: Arc<dyn IdProvider>,
    clock: Arc<dyn Clock>,
    faults: Arc<dyn FaultHook>,
}

impl AnchorSimulator {
    pub fn new(
        config: AnchorConfig,
        latency: &LatencyConfig,
        random: Arc<dyn RandomSource>,
        ids: Arc<dyn IdProvider>,
        clock: Arc<dyn Clock>,
        faults: Arc<dyn FaultHook>,
    ) -> Self {
        Self {
            config,
            phases: latency.anchor_phases(),
            random,
            ids,
            clock,
            faults,
        }
    }

    /// Anchor `capsule`, calling `on_phase` as each phase begins.
    pub async fn anchor(
        &self,
        capsule: &Capsule,
        mut on_phase: impl FnMut(AnchorPhase),
    ) -> Result<Anchor, WorkflowError> {
        for (phase, delay) in AnchorPhase::ALL.iter().zip(self.phases) {
            debug!(
                "anchor phase (capsule_id={}, phase={}, delay_ms={})",
                capsule.id,
                phase,
                delay.as_millis()
            );
            on_phase(*phase);
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.faults.anchor_fault(capsule) {
            warn!(
                "anchor fault injected (capsule_id={}, message={})",
                capsule.id, message
            );
            return Err(WorkflowError::StepFailed {
                step: WorkflowStep::Anchor,
                message,
            });
        }

        let tx_hash = self.ids.next_id(IdKind::Transaction);
        let anchor = Anchor {
            capsule_id: capsule.id.clone(),
            explorer_url: format!("{}{}", self.config.explorer_base_url, tx_hash),
            tx_hash,
            block_number: self
                .config
                .base_block
                .saturating_add(self.random.range("block_offset", 0, self.config.block_spread)),
            confirmations: self.config.confirmations,
            gas_used: self.random.range("gas_used", GAS_MIN, GAS_MAX),
            network: self.config.network.clone(),
            anchored_at: self.clock.now(),
        };
        info!(
            "capsule anchored (capsule_id={}, block_number={})",
            anchor.capsule_id, anchor.block_number
        );
        Ok(anchor)
    }
}
