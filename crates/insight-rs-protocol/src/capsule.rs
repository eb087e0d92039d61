//! Derived workflow artifacts: capsules, anchors, and verification reports.
//!
//! Identifiers carried by these types are fabricated by an id provider. They
//! are opaque strings and must never be read as digests of the content.

use crate::criteria::FilterCriteria;
use crate::record::DomainKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive timestamp range covered by a capsule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Aggregate projection of the records a capsule was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataSummary {
    /// Number of records summarized.
    pub total_events: usize,
    /// Record field the breakdown counts.
    pub breakdown_field: String,
    /// Occurrences of each distinct breakdown value.
    pub breakdown: BTreeMap<String, usize>,
    /// Record field whose distinct values are counted.
    pub identity_field: String,
    pub distinct_identities: usize,
    pub time_range: TimeRange,
}

/// Simulated audit capsule. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capsule {
    pub id: String,
    pub domain: DomainKind,
    pub created_at: DateTime<Utc>,
    /// Criteria active when the capsule was built.
    pub criteria: FilterCriteria,
    /// Opaque reference standing in for a proof hash.
    pub proof_ref: String,
    pub metadata_summary: MetadataSummary,
}

labelled_enum! {
    /// Named stage of a simulated anchoring.
    AnchorPhase {
        Preparing => "preparing",
        Broadcasting => "broadcasting",
        Confirming => "confirming",
    }
}

/// Simulated on-chain anchor for a capsule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub capsule_id: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub confirmations: u32,
    pub gas_used: u64,
    pub network: String,
    pub explorer_url: String,
    pub anchored_at: DateTime<Utc>,
}

/// Named sub-checks included in every verification report.
pub const CHECK_CAPSULE_INTEGRITY: &str = "capsule_integrity";
pub const CHECK_METADATA_CONSISTENCY: &str = "metadata_consistency";
pub const CHECK_TIMESTAMP_VALIDITY: &str = "timestamp_validity";
/// Only present when the capsule was anchored.
pub const CHECK_ANCHOR_CONFIRMED: &str = "anchor_confirmed";

/// Outcome of a simulated verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub capsule_id: String,
    pub ok: bool,
    pub message: String,
    /// Fabricated verification latency.
    pub latency_ms: u64,
    pub checks: BTreeMap<String, bool>,
    pub events_verified: usize,
    #[serde(default)]
    pub anchor_tx: Option<String>,
    pub verified_at: DateTime<Utc>,
}

impl VerificationReport {
    /// Names of sub-checks that did not pass.
    pub fn failed_checks(&self) -> impl Iterator<Item = &str> {
        self.checks
            .iter()
            .filter(|(_, passed)| !**passed)
            .map(|(name, _)| name.as_str())
    }
}
