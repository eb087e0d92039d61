//! Filter criteria owned by a workflow and applied to its record buffer.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Sentinel value meaning "do not filter on this field".
pub const MATCH_ALL: &str = "all";

/// How a criterion compares its value against a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Field must equal the value exactly.
    Exact,
    /// Field must start with the value.
    Prefix,
}

/// Single field comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    /// Record field the value is compared against.
    pub field: String,
    pub mode: MatchMode,
    pub value: String,
}

impl Criterion {
    /// Exact-equality criterion on `field`.
    pub fn exact(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            mode: MatchMode::Exact,
            value: value.into(),
        }
    }

    /// String-prefix criterion on `field`.
    pub fn prefix(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            mode: MatchMode::Prefix,
            value: value.into(),
        }
    }

    /// True when the value is the match-all sentinel (or blank).
    pub fn is_match_all(&self) -> bool {
        self.value.is_empty() || self.value == MATCH_ALL
    }

    /// Compare a record's field value against this criterion.
    pub fn accepts(&self, candidate: &str) -> bool {
        match self.mode {
            MatchMode::Exact => candidate == self.value,
            MatchMode::Prefix => candidate.starts_with(&self.value),
        }
    }
}

/// Malformed relative time window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid time window: {0} (expected forms like 15m, 1h, 24h, 7d)")]
pub struct InvalidWindow(pub String);

/// Relative look-back window ending at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeWindow {
    amount: u32,
    unit: WindowUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowUnit {
    Minutes,
    Hours,
    Days,
}

/// Longest window a user may request.
pub const MAX_WINDOW_DAYS: i64 = 3650;

impl TimeWindow {
    pub fn minutes(amount: u32) -> Self {
        Self {
            amount,
            unit: WindowUnit::Minutes,
        }
    }

    pub fn hours(amount: u32) -> Self {
        Self {
            amount,
            unit: WindowUnit::Hours,
        }
    }

    pub fn days(amount: u32) -> Self {
        Self {
            amount,
            unit: WindowUnit::Days,
        }
    }

    /// Parse `<n>m`, `<n>h`, or `<n>d`, at most `MAX_WINDOW_DAYS` long.
    /// Returns `Ok(None)` for the match-all sentinel.
    pub fn parse(value: &str) -> Result<Option<Self>, InvalidWindow> {
        let value = value.trim();
        if value.is_empty() || value == MATCH_ALL {
            return Ok(None);
        }
        let invalid = || InvalidWindow(value.to_string());
        let Some((split, _)) = value.char_indices().last() else {
            return Err(invalid());
        };
        let (digits, unit) = value.split_at(split);
        let unit = match unit {
            "m" => WindowUnit::Minutes,
            "h" => WindowUnit::Hours,
            "d" => WindowUnit::Days,
            _ => return Err(invalid()),
        };
        let amount: u32 = digits.parse().map_err(|_| invalid())?;
        if amount == 0 {
            return Err(invalid());
        }
        let window = Self { amount, unit };
        if window.duration() > TimeDelta::days(MAX_WINDOW_DAYS) {
            return Err(invalid());
        }
        Ok(Some(window))
    }

    /// Window length.
    pub fn duration(&self) -> TimeDelta {
        let amount = i64::from(self.amount);
        match self.unit {
            WindowUnit::Minutes => TimeDelta::minutes(amount),
            WindowUnit::Hours => TimeDelta::hours(amount),
            WindowUnit::Days => TimeDelta::days(amount),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.unit {
            WindowUnit::Minutes => "m",
            WindowUnit::Hours => "h",
            WindowUnit::Days => "d",
        };
        write!(f, "{}{}", self.amount, suffix)
    }
}

impl TryFrom<String> for TimeWindow {
    type Error = InvalidWindow;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TimeWindow::parse(&value)?.ok_or(InvalidWindow(value))
    }
}

impl From<TimeWindow> for String {
    fn from(window: TimeWindow) -> Self {
        window.to_string()
    }
}

/// Sparse set of criteria keyed by filter key, plus an optional time window.
///
/// Replaced wholesale whenever the user edits the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub fields: BTreeMap<String, Criterion>,
    #[serde(default)]
    pub window: Option<TimeWindow>,
}

impl FilterCriteria {
    /// Criteria that match every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the criterion stored under `key`.
    pub fn with(mut self, key: impl Into<String>, criterion: Criterion) -> Self {
        self.fields.insert(key.into(), criterion);
        self
    }

    /// Shorthand for an exact criterion whose key is the record field name.
    pub fn with_exact(self, field: &str, value: impl Into<String>) -> Self {
        self.with(field, Criterion::exact(field, value))
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    /// Criteria that actually constrain records (sentinels skipped).
    pub fn active(&self) -> impl Iterator<Item = &Criterion> {
        self.fields
            .values()
            .filter(|criterion| !criterion.is_match_all())
    }

    /// True when nothing would be filtered out.
    pub fn is_unconstrained(&self) -> bool {
        self.window.is_none() && self.active().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_windows_and_sentinel() {
        assert_eq!(TimeWindow::parse("15m"), Ok(Some(TimeWindow::minutes(15))));
        assert_eq!(TimeWindow::parse("24h"), Ok(Some(TimeWindow::hours(24))));
        assert_eq!(TimeWindow::parse("all"), Ok(None));
        assert!(TimeWindow::parse("0d").is_err());
        assert!(TimeWindow::parse("1w").is_err());
        assert!(TimeWindow::parse("h").is_err());
        assert_eq!(TimeWindow::days(7).duration(), TimeDelta::days(7));
    }

    #[test]
    fn rejects_windows_past_the_cap() {
        assert_eq!(TimeWindow::parse("3650d"), Ok(Some(TimeWindow::days(3650))));
        assert!(TimeWindow::parse("3651d").is_err());
        assert!(TimeWindow::parse("100000000d").is_err());
        assert!(TimeWindow::parse("4294967295m").is_err());
    }

    #[test]
    fn sentinel_criteria_are_inactive() {
        let criteria = FilterCriteria::new()
            .with_exact("severity", MATCH_ALL)
            .with("subnet", Criterion::prefix("ip", ""));
        assert!(criteria.is_unconstrained());

        let criteria = criteria.with_exact("source", "firewall");
        assert_eq!(criteria.active().count(), 1);
    }

    #[test]
    fn window_serializes_as_label() {
        let criteria = FilterCriteria::new().with_window(TimeWindow::hours(1));
        let value = serde_json::to_value(&criteria).expect("serialize");
        assert_eq!(value["window"], "1h");
        let decoded: FilterCriteria = serde_json::from_value(value).expect("deserialize");
        assert_eq!(decoded, criteria);
    }
}
