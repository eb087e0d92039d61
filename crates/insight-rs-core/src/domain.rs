//! Per-domain workflow schemas.
//!
//! The engine is one state machine parameterized by a `DomainSchema`: which
//! fields can be filtered and how, which field the capsule breakdown counts,
//! which field identifies distinct sources, and which optional steps the
//! domain offers.

use crate::error::WorkflowError;
use insight_rs_protocol::{
    Criterion, DomainKind, FilterCriteria, MATCH_ALL, MatchMode, TimeWindow, WorkflowStep,
};
use std::collections::BTreeMap;

/// Filter key that carries the relative time window.
pub const TIME_RANGE_KEY: &str = "time_range";

/// A filterable field exposed by a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    /// Key used in criteria maps and HTTP parameters.
    pub key: &'static str,
    /// Record field the criterion compares against.
    pub record_field: &'static str,
    pub mode: MatchMode,
}

impl FilterField {
    const fn exact(key: &'static str) -> Self {
        Self {
            key,
            record_field: key,
            mode: MatchMode::Exact,
        }
    }
}

/// Static description of a demo domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainSchema {
    pub kind: DomainKind,
    pub fields: &'static [FilterField],
    /// Whether `time_range` is accepted.
    pub time_window: bool,
    /// Field counted by the capsule breakdown.
    pub breakdown_field: &'static str,
    /// Field whose distinct values the capsule counts.
    pub identity_field: &'static str,
    /// Whether a live stream is offered.
    pub streams: bool,
    /// Whether the anchor step is offered.
    pub anchors: bool,
}

const SECOPS: DomainSchema = DomainSchema {
    kind: DomainKind::SecOps,
    fields: &[
        FilterField::exact("severity"),
        FilterField::exact("source"),
        FilterField {
            key: "subnet",
            record_field: "ip",
            mode: MatchMode::Prefix,
        },
    ],
    time_window: true,
    breakdown_field: "severity",
    identity_field: "ip",
    streams: true,
    anchors: false,
};

const MODEL: DomainSchema = DomainSchema {
    kind: DomainKind::Model,
    fields: &[
        FilterField::exact("category"),
        FilterField::exact("split"),
        FilterField::exact("label"),
    ],
    time_window: false,
    breakdown_field: "label",
    identity_field: "category",
    streams: false,
    anchors: false,
};

const BLOCKCHAIN: DomainSchema = DomainSchema {
    kind: DomainKind::Blockchain,
    fields: &[
        FilterField::exact("data_type"),
        FilterField::exact("status"),
        FilterField::exact("region"),
    ],
    time_window: true,
    breakdown_field: "status",
    identity_field: "data_type",
    streams: false,
    anchors: true,
};

impl DomainSchema {
    /// Schema for a domain.
    pub fn for_kind(kind: DomainKind) -> &'static DomainSchema {
        match kind {
            DomainKind::SecOps => &SECOPS,
            DomainKind::Model => &MODEL,
            DomainKind::Blockchain => &BLOCKCHAIN,
        }
    }

    /// Look up a filter field by key.
    pub fn field(&self, key: &str) -> Option<&'static FilterField> {
        self.fields.iter().find(|field| field.key == key)
    }

    /// Whether the domain offers a step at all.
    pub fn offers(&self, step: WorkflowStep) -> bool {
        match step {
            WorkflowStep::Anchor => self.anchors,
            WorkflowStep::Capsule | WorkflowStep::Verify => true,
        }
    }

    /// Build criteria from a flat key/value map as submitted by a filter form.
    ///
    /// Unknown keys are rejected. Values are stored verbatim, so the `all`
    /// sentinel survives and is skipped at match time.
    pub fn criteria_from_params(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<FilterCriteria, WorkflowError> {
        let mut criteria = FilterCriteria::new();
        for (key, value) in params {
            if key == TIME_RANGE_KEY && self.time_window {
                criteria.window = TimeWindow::parse(value)?;
                continue;
            }
            let field = self.field(key).ok_or_else(|| WorkflowError::UnknownField {
                domain: self.kind,
                field: key.clone(),
            })?;
            let criterion = Criterion {
                field: field.record_field.to_string(),
                mode: field.mode,
                value: value.trim().to_string(),
            };
            criteria = criteria.with(field.key, criterion);
        }
        Ok(criteria)
    }

    /// Check criteria built elsewhere against this schema.
    pub fn validate_criteria(&self, criteria: &FilterCriteria) -> Result<(), WorkflowError> {
        if criteria.window.is_some() && !self.time_window {
            return Err(WorkflowError::UnknownField {
                domain: self.kind,
                field: TIME_RANGE_KEY.to_string(),
            });
        }
        for (key, criterion) in &criteria.fields {
            let known = self.field(key).is_some_and(|field| {
                field.record_field == criterion.field && field.mode == criterion.mode
            });
            if !known {
                return Err(WorkflowError::UnknownField {
                    domain: self.kind,
                    field: key.clone(),
                });
            }
        }
        Ok(())
    }

    /// Criteria with every field at the match-all sentinel.
    pub fn match_all_criteria(&self) -> FilterCriteria {
        self.fields
            .iter()
            .fold(FilterCriteria::new(), |criteria, field| {
                criteria.with(
                    field.key,
                    Criterion {
                        field: field.record_field.to_string(),
                        mode: field.mode,
                        value: MATCH_ALL.to_string(),
                    },
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn subnet_maps_to_ip_prefix() {
        let schema = DomainSchema::for_kind(DomainKind::SecOps);
        let criteria = schema
            .criteria_from_params(&params(&[("subnet", "10.0.1"), ("time_range", "1h")]))
            .expect("criteria");
        assert_eq!(
            criteria.fields.get("subnet"),
            Some(&Criterion::prefix("ip", "10.0.1"))
        );
        assert_eq!(criteria.window, Some(TimeWindow::hours(1)));
        schema.validate_criteria(&criteria).expect("valid");
    }

    #[test]
    fn rejects_fields_outside_the_domain() {
        let schema = DomainSchema::for_kind(DomainKind::Model);
        let err = schema
            .criteria_from_params(&params(&[("severity", "WARN")]))
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::UnknownField {
                domain: DomainKind::Model,
                field: "severity".to_string(),
            }
        );
        assert!(
            schema
                .criteria_from_params(&params(&[("time_range", "1h")]))
                .is_err()
        );
    }

    #[test]
    fn rejects_malformed_window() {
        let schema = DomainSchema::for_kind(DomainKind::Blockchain);
        let err = schema
            .criteria_from_params(&params(&[("time_range", "soon")]))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidWindow(_)));

        let err = schema
            .criteria_from_params(&params(&[("time_range", "100000000d")]))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidWindow(_)));
    }

    #[test]
    fn only_blockchain_anchors() {
        for kind in DomainKind::ALL {
            let schema = DomainSchema::for_kind(*kind);
            assert_eq!(
                schema.offers(WorkflowStep::Anchor),
                *kind == DomainKind::Blockchain
            );
        }
        assert!(DomainSchema::for_kind(DomainKind::SecOps).streams);
        assert!(!DomainSchema::for_kind(DomainKind::Model).streams);
    }

    #[test]
    fn match_all_criteria_is_unconstrained() {
        for kind in DomainKind::ALL {
            let schema = DomainSchema::for_kind(*kind);
            let criteria = schema.match_all_criteria();
            assert_eq!(criteria.fields.len(), schema.fields.len());
            assert!(criteria.is_unconstrained());
        }
    }
}
