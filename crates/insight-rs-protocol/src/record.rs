//! Synthetic domain records produced by the demo generators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

labelled_enum! {
    /// Demo experience a workflow belongs to.
    DomainKind {
        /// Live security log stream.
        SecOps => "secops",
        /// Synthetic ML training dataset.
        Model => "model",
        /// Compliance data rows anchored on a simulated chain.
        Blockchain => "blockchain",
    }
}

labelled_enum! {
    /// Log line severity.
    Severity {
        Info => "INFO",
        Warn => "WARN",
        Error => "ERROR",
    }
}

labelled_enum! {
    /// Subsystem that emitted a log line.
    LogSource {
        Firewall => "firewall",
        AuthService => "auth-service",
        ApiGateway => "api-gateway",
        Database => "database",
        Ids => "ids",
    }
}

labelled_enum! {
    /// Regulatory category of a compliance row.
    DataType {
        PersonalData => "personal_data",
        Financial => "financial",
        Health => "health",
        Operational => "operational",
    }
}

labelled_enum! {
    /// Review status of a compliance row.
    ComplianceStatus {
        Compliant => "compliant",
        PendingReview => "pending_review",
        Flagged => "flagged",
    }
}

labelled_enum! {
    /// Jurisdiction a compliance row was collected in.
    Region {
        Eu => "EU",
        Us => "US",
        Apac => "APAC",
    }
}

labelled_enum! {
    /// Feature family of a synthetic training row.
    FeatureCategory {
        Transaction => "transaction",
        Demographic => "demographic",
        Behavioral => "behavioral",
        Sensor => "sensor",
    }
}

labelled_enum! {
    /// Dataset partition a training row is assigned to.
    DatasetSplit {
        Train => "train",
        Validation => "validation",
        Test => "test",
    }
}

labelled_enum! {
    /// Ground-truth label of a training row.
    Label {
        Positive => "positive",
        Negative => "negative",
    }
}

/// Security log line from the SecOps stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub source: LogSource,
    pub ip: String,
    pub message: String,
}

/// Compliance data row used by the blockchain demo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub data_type: DataType,
    pub status: ComplianceStatus,
    pub region: Region,
    pub record_count: u32,
}

/// Synthetic training row used by the model demo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub category: FeatureCategory,
    pub split: DatasetSplit,
    pub label: Label,
    pub features: Vec<f64>,
}

/// Any record a workflow can buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Log(LogEntry),
    Data(DataEntry),
    Point(DataPoint),
}

impl Record {
    /// Record identifier.
    pub fn id(&self) -> &str {
        match self {
            Record::Log(entry) => &entry.id,
            Record::Data(entry) => &entry.id,
            Record::Point(point) => &point.id,
        }
    }

    /// Time the record was observed.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Record::Log(entry) => entry.timestamp,
            Record::Data(entry) => entry.timestamp,
            Record::Point(point) => point.timestamp,
        }
    }

    /// Demo the record belongs to.
    pub fn domain(&self) -> DomainKind {
        match self {
            Record::Log(_) => DomainKind::SecOps,
            Record::Data(_) => DomainKind::Blockchain,
            Record::Point(_) => DomainKind::Model,
        }
    }

    /// Look up a categorical (string-valued) field by name.
    ///
    /// Numeric fields are not addressable and return `None`, as do names the
    /// record variant does not carry.
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            Record::Log(entry) => match name {
                "id" => Some(&entry.id),
                "severity" => Some(entry.severity.as_str()),
                "source" => Some(entry.source.as_str()),
                "ip" => Some(&entry.ip),
                "message" => Some(&entry.message),
                _ => None,
            },
            Record::Data(entry) => match name {
                "id" => Some(&entry.id),
                "data_type" => Some(entry.data_type.as_str()),
                "status" => Some(entry.status.as_str()),
                "region" => Some(entry.region.as_str()),
                _ => None,
            },
            Record::Point(point) => match name {
                "id" => Some(&point.id),
                "category" => Some(point.category.as_str()),
                "split" => Some(point.split.as_str()),
                "label" => Some(point.label.as_str()),
                _ => None,
            },
        }
    }
}
