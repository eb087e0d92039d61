//! Synthetic record generation.
//!
//! Categorical fields are drawn uniformly from the fixed vocabularies in the
//! protocol crate. Generation never fails.

use crate::clock::Clock;
use crate::ids::{IdKind, IdProvider};
use crate::random::{RandomSource, pick};
use chrono::{DateTime, TimeDelta, Utc};
use insight_rs_protocol::{
    ComplianceStatus, DataEntry, DataPoint, DataType, DatasetSplit, DomainKind, FeatureCategory,
    Label, LogEntry, LogSource, Record, Region, Severity,
};
use std::sync::Arc;

/// Private subnets log addresses are drawn from.
pub const SUBNETS: &[&str] = &["10.0.1", "10.0.2", "172.16.5", "192.168.1"];
/// Length of every synthetic feature vector.
pub const FEATURE_DIMENSIONS: usize = 8;

/// Produces domain records through injected randomness, ids, and time.
#[derive(Clone)]
pub struct RecordGenerator {
    random: Arc<dyn RandomSource>,
    ids: Arc<dyn IdProvider>,
    clock: Arc<dyn Clock>,
}

impl RecordGenerator {
    pub fn new(
        random: Arc<dyn RandomSource>,
        ids: Arc<dyn IdProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { random, ids, clock }
    }

    /// One record stamped with the current time.
    pub fn generate(&self, kind: DomainKind) -> Record {
        self.generate_at(kind, self.clock.now())
    }

    /// One record stamped with `timestamp`.
    pub fn generate_at(&self, kind: DomainKind, timestamp: DateTime<Utc>) -> Record {
        let id = self.ids.next_id(IdKind::Record);
        match kind {
            DomainKind::SecOps => Record::Log(self.log_entry(id, timestamp)),
            DomainKind::Blockchain => Record::Data(self.data_entry(id, timestamp)),
            DomainKind::Model => Record::Point(self.data_point(id, timestamp)),
        }
    }

    /// `count` independent records stamped at random offsets within
    /// `lookback` of now, newest first.
    pub fn generate_batch(
        &self,
        kind: DomainKind,
        count: usize,
        lookback: TimeDelta,
    ) -> Vec<Record> {
        let now = self.clock.now();
        let span = u64::try_from(lookback.num_milliseconds()).unwrap_or(0);
        let mut records: Vec<Record> = (0..count)
            .map(|_| {
                let offset = self.random.range("timestamp_offset_ms", 0, span);
                let offset = TimeDelta::milliseconds(i64::try_from(offset).unwrap_or(i64::MAX));
                self.generate_at(kind, now - offset)
            })
            .collect();
        records.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        records
    }

    fn log_entry(&self, id: String, timestamp: DateTime<Utc>) -> LogEntry {
        let random = self.random.as_ref();
        let severity = *pick(random, "severity", Severity::ALL);
        let source = *pick(random, "source", LogSource::ALL);
        let subnet = pick(random, "subnet", SUBNETS);
        let host = random.range("host", 1, 255);
        LogEntry {
            id,
            timestamp,
            severity,
            source,
            ip: format!("{subnet}.{host}"),
            message: log_message(source, severity).to_string(),
        }
    }

    fn data_entry(&self, id: String, timestamp: DateTime<Utc>) -> DataEntry {
        let random = self.random.as_ref();
        DataEntry {
            id,
            timestamp,
            data_type: *pick(random, "data_type", DataType::ALL),
            status: *pick(random, "status", ComplianceStatus::ALL),
            region: *pick(random, "region", Region::ALL),
            record_count: u32::try_from(random.range("record_count", 100, 10_000)).unwrap_or(100),
        }
    }

    fn data_point(&self, id: String, timestamp: DateTime<Utc>) -> DataPoint {
        let random = self.random.as_ref();
        let features = (0..FEATURE_DIMENSIONS)
            .map(|_| (random.unit("feature") * 10_000.0).round() / 10_000.0)
            .collect();
        DataPoint {
            id,
            timestamp,
            category: *pick(random, "category", FeatureCategory::ALL),
            split: *pick(random, "split", DatasetSplit::ALL),
            label: *pick(random, "label", Label::ALL),
            features,
        }
    }
}

/// Canned log line for a source and severity.
pub fn log_message(source: LogSource, severity: Severity) -> &'static str {
    use LogSource::*;
    use Severity::*;
    match (source, severity) {
        (Firewall, Info) => "Connection allowed by rule ALLOW-HTTPS",
        (Firewall, Warn) => "Port scan pattern detected from external host",
        (Firewall, Error) => "Blocked inbound connection on restricted port",
        (AuthService, Info) => "User login successful",
        (AuthService, Warn) => "Multiple failed login attempts",
        (AuthService, Error) => "Account locked after repeated authentication failures",
        (ApiGateway, Info) => "Request routed to upstream service",
        (ApiGateway, Warn) => "Rate limit threshold approaching for client",
        (ApiGateway, Error) => "Upstream service returned 502 Bad Gateway",
        (Database, Info) => "Query executed within latency budget",
        (Database, Warn) => "Slow query detected on audit table",
        (Database, Error) => "Connection pool exhausted",
        (Ids, Info) => "Signature database updated",
        (Ids, Warn) => "Suspicious payload matched heuristic rule",
        (Ids, Error) => "Intrusion signature matched: possible SQL injection",
    }
}
