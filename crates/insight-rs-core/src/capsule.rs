//! Simulated capsule construction.

use crate::domain::DomainSchema;
use crate::error::WorkflowError;
use crate::ids::{IdKind, IdProvider};
use chrono::{DateTime, Utc};
use insight_rs_protocol::{Capsule, FilterCriteria, MetadataSummary, Record, TimeRange};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Summarize a filtered record set into a capsule.
///
/// The summary is a pure projection of `filtered`: counts, a breakdown over
/// the schema's breakdown field, the number of distinct identity values, and
/// the inclusive timestamp range. No record content is copied. The capsule id
/// and proof reference come from `ids` and carry no relation to the content.
pub fn build_capsule(
    filtered: &[Record],
    criteria: &FilterCriteria,
    schema: &DomainSchema,
    ids: &dyn IdProvider,
    now: DateTime<Utc>,
) -> Result<Capsule, WorkflowError> {
    let Some(first) = filtered.first() else {
        return Err(WorkflowError::EmptySelection);
    };

    let mut breakdown: BTreeMap<String, usize> = BTreeMap::new();
    let mut identities = BTreeSet::new();
    let mut start = first.timestamp();
    let mut end = first.timestamp();
    for record in filtered {
        if let Some(value) = record.field(schema.breakdown_field) {
            *breakdown.entry(value.to_string()).or_default() += 1;
        }
        if let Some(value) = record.field(schema.identity_field) {
            identities.insert(value);
        }
        start = start.min(record.timestamp());
        end = end.max(record.timestamp());
    }

    let capsule = Capsule {
        id: ids.next_id(IdKind::Capsule),
        domain: schema.kind,
        created_at: now,
        criteria: criteria.clone(),
        proof_ref: ids.next_id(IdKind::ProofRef),
        metadata_summary: MetadataSummary {
            total_events: filtered.len(),
            breakdown_field: schema.breakdown_field.to_string(),
            breakdown,
            identity_field: schema.identity_field.to_string(),
            distinct_identities: identities.len(),
            time_range: TimeRange { start, end },
        },
    };
    debug!(
        "built capsule (capsule_id={}, domain={}, total_events={})",
        capsule.id, capsule.domain, capsule.metadata_summary.total_events
    );
    Ok(capsule)
}
