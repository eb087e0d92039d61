//! Record filtering.

use chrono::{DateTime, Utc};
use insight_rs_protocol::{FilterCriteria, Record};

/// Whether `record` satisfies every active criterion.
///
/// Sentinel criteria are skipped, so empty or all-sentinel criteria accept
/// every record. The time window keeps records stamped at or after
/// `now - window`; a window reaching past the representable range keeps
/// everything. A criterion naming a field the record does not carry
/// rejects it.
pub fn matches(record: &Record, criteria: &FilterCriteria, now: DateTime<Utc>) -> bool {
    if let Some(window) = criteria.window
        && let Some(cutoff) = now.checked_sub_signed(window.duration())
        && record.timestamp() < cutoff
    {
        return false;
    }
    criteria.active().all(|criterion| {
        record
            .field(&criterion.field)
            .is_some_and(|value| criterion.accepts(value))
    })
}

/// Records that satisfy `criteria`, in their original order.
pub fn filter_records<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    criteria: &FilterCriteria,
    now: DateTime<Utc>,
) -> Vec<Record> {
    records
        .into_iter()
        .filter(|record| matches(record, criteria, now))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use insight_rs_protocol::{
        Criterion, FilterCriteria, LogEntry, LogSource, MATCH_ALL, Severity, TimeWindow,
    };

    fn log(ip: &str, severity: Severity, age: TimeDelta, now: DateTime<Utc>) -> Record {
        Record::Log(LogEntry {
            id: format!("rec-{ip}"),
            timestamp: now - age,
            severity,
            source: LogSource::Firewall,
            ip: ip.to_string(),
            message: "test".to_string(),
        })
    }

    #[test]
    fn empty_and_sentinel_criteria_match_everything() {
        let now = Utc::now();
        let record = log("10.0.1.4", Severity::Info, TimeDelta::days(30), now);
        assert!(matches(&record, &FilterCriteria::new(), now));

        let sentinel = FilterCriteria::new()
            .with_exact("severity", MATCH_ALL)
            .with_exact("source", MATCH_ALL)
            .with("subnet", Criterion::prefix("ip", MATCH_ALL));
        assert!(matches(&record, &sentinel, now));
    }

    #[test]
    fn criteria_combine_with_and() {
        let now = Utc::now();
        let record = log("10.0.1.4", Severity::Warn, TimeDelta::zero(), now);
        let both = FilterCriteria::new()
            .with_exact("severity", "WARN")
            .with_exact("source", "firewall");
        assert!(matches(&record, &both, now));
        let one_wrong = both.with_exact("source", "ids");
        assert!(!matches(&record, &one_wrong, now));
    }

    #[test]
    fn subnet_compares_by_prefix() {
        let now = Utc::now();
        let record = log("192.168.1.20", Severity::Info, TimeDelta::zero(), now);
        let inside = FilterCriteria::new().with("subnet", Criterion::prefix("ip", "192.168.1"));
        let outside = FilterCriteria::new().with("subnet", Criterion::prefix("ip", "10.0"));
        assert!(matches(&record, &inside, now));
        assert!(!matches(&record, &outside, now));
    }

    #[test]
    fn identity_field_is_strict_equality() {
        let now = Utc::now();
        let record = log("10.0.2.17", Severity::Error, TimeDelta::zero(), now);
        assert!(matches(
            &record,
            &FilterCriteria::new().with_exact("ip", "10.0.2.17"),
            now
        ));
        for altered in ["10.0.2.18", "10.0.2.1", "10.0.2.177", "20.0.2.17"] {
            assert!(!matches(
                &record,
                &FilterCriteria::new().with_exact("ip", altered),
                now
            ));
        }
    }

    #[test]
    fn time_window_is_inclusive_of_boundary() {
        let now = Utc::now();
        let criteria = FilterCriteria::new().with_window(TimeWindow::hours(1));
        let edge = log("10.0.1.1", Severity::Info, TimeDelta::hours(1), now);
        let stale = log(
            "10.0.1.2",
            Severity::Info,
            TimeDelta::hours(1) + TimeDelta::seconds(1),
            now,
        );
        assert!(matches(&edge, &criteria, now));
        assert!(!matches(&stale, &criteria, now));
    }

    #[test]
    fn oversized_window_keeps_every_record() {
        let now = Utc::now();
        let record = log("10.0.1.1", Severity::Info, TimeDelta::days(400), now);
        let criteria = FilterCriteria::new().with_window(TimeWindow::days(u32::MAX));
        assert!(matches(&record, &criteria, now));
        assert_eq!(filter_records([&record], &criteria, now).len(), 1);
    }

    #[test]
    fn unknown_field_rejects_record() {
        let now = Utc::now();
        let record = log("10.0.1.1", Severity::Info, TimeDelta::zero(), now);
        let criteria = FilterCriteria::new().with_exact("region", "EU");
        assert!(!matches(&record, &criteria, now));
    }

    #[test]
    fn filter_preserves_order() {
        let now = Utc::now();
        let records = vec![
            log("10.0.1.1", Severity::Warn, TimeDelta::zero(), now),
            log("10.0.1.2", Severity::Info, TimeDelta::seconds(1), now),
            log("10.0.1.3", Severity::Warn, TimeDelta::seconds(2), now),
        ];
        let kept = filter_records(&records, &FilterCriteria::new().with_exact("severity", "WARN"), now);
        let ids: Vec<&str> = kept.iter().map(Record::id).collect();
        assert_eq!(ids, vec!["rec-10.0.1.1", "rec-10.0.1.3"]);
    }
}
