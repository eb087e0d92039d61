//! Declarative body schemas for the mock REST services.
//!
//! A schema is a static list of `FieldRule`s. Validation walks the JSON body,
//! collects every violation with its dotted path, and only then decodes the
//! body into the handler's request type.

use crate::error::{ApiError, FieldIssue};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Expected shape of one field.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FieldKind {
    /// Non-empty string.
    Text,
    /// Non-negative integer.
    Count,
    Flag,
    /// String drawn from a closed vocabulary.
    OneOf(&'static [&'static str]),
    /// Array of non-empty strings.
    TextList,
    /// Nested object checked against its own rules.
    Object(&'static [FieldRule]),
    /// Any JSON object.
    AnyObject,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

pub(crate) const fn required(name: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule {
        name,
        kind,
        required: true,
    }
}

pub(crate) const fn optional(name: &'static str, kind: FieldKind) -> FieldRule {
    FieldRule {
        name,
        kind,
        required: false,
    }
}

/// Check `body` against `rules` and decode it.
pub(crate) fn decode_body<T: DeserializeOwned>(
    body: Value,
    rules: &[FieldRule],
) -> Result<T, ApiError> {
    let issues = check_body(&body, rules);
    if !issues.is_empty() {
        return Err(ApiError::validation(issues));
    }
    serde_json::from_value(body)
        .map_err(|err| ApiError::validation(vec![FieldIssue::new("body", err.to_string())]))
}

/// Every violation in `body`, in rule order.
pub(crate) fn check_body(body: &Value, rules: &[FieldRule]) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    match body {
        Value::Object(map) => check_object(map, rules, "", &mut issues),
        _ => issues.push(FieldIssue::new("body", "expected object")),
    }
    issues
}

fn check_object(
    map: &Map<String, Value>,
    rules: &[FieldRule],
    prefix: &str,
    issues: &mut Vec<FieldIssue>,
) {
    for rule in rules {
        let path = join_path(prefix, rule.name);
        match map.get(rule.name) {
            None | Some(Value::Null) => {
                if rule.required {
                    issues.push(FieldIssue::new(path, "required"));
                }
            }
            Some(value) => check_value(value, rule.kind, &path, issues),
        }
    }
}

fn check_value(value: &Value, kind: FieldKind, path: &str, issues: &mut Vec<FieldIssue>) {
    match kind {
        FieldKind::Text => match value.as_str() {
            Some(text) if !text.trim().is_empty() => {}
            Some(_) => issues.push(FieldIssue::new(path, "must not be empty")),
            None => issues.push(FieldIssue::new(path, "expected string")),
        },
        FieldKind::Count => {
            if !value.is_u64() {
                issues.push(FieldIssue::new(path, "expected non-negative integer"));
            }
        }
        FieldKind::Flag => {
            if !value.is_boolean() {
                issues.push(FieldIssue::new(path, "expected bool"));
            }
        }
        FieldKind::OneOf(options) => match value.as_str() {
            Some(text) if options.contains(&text) => {}
            _ => issues.push(FieldIssue::new(
                path,
                format!("expected one of: {}", options.join(", ")),
            )),
        },
        FieldKind::TextList => match value.as_array() {
            Some(items) => {
                for (index, item) in items.iter().enumerate() {
                    check_value(item, FieldKind::Text, &format!("{path}[{index}]"), issues);
                }
            }
            None => issues.push(FieldIssue::new(path, "expected array of strings")),
        },
        FieldKind::Object(rules) => match value.as_object() {
            Some(map) => check_object(map, rules, path, issues),
            None => issues.push(FieldIssue::new(path, "expected object")),
        },
        FieldKind::AnyObject => {
            if !value.is_object() {
                issues.push(FieldIssue::new(path, "expected object"));
            }
        }
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const PERIOD: &[FieldRule] = &[
        required("start", FieldKind::Text),
        required("end", FieldKind::Text),
    ];
    const RULES: &[FieldRule] = &[
        required("title", FieldKind::Text),
        required("framework", FieldKind::OneOf(&["soc2", "iso_42001"])),
        optional("scope", FieldKind::TextList),
        optional("period", FieldKind::Object(PERIOD)),
        optional("draft", FieldKind::Flag),
    ];

    #[test]
    fn valid_body_has_no_issues() {
        let body = json!({
            "title": "Q3",
            "framework": "soc2",
            "scope": ["models"],
            "period": { "start": "2026-07-01", "end": "2026-09-30" },
        });
        assert!(check_body(&body, RULES).is_empty());
    }

    #[test]
    fn collects_every_issue_with_paths() {
        let body = json!({
            "title": "  ",
            "framework": "gdpr",
            "scope": ["ok", 3],
            "period": { "start": "2026-07-01" },
            "draft": "yes",
        });
        let paths: Vec<String> = check_body(&body, RULES)
            .into_iter()
            .map(|issue| issue.path)
            .collect();
        assert_eq!(
            paths,
            vec!["title", "framework", "scope[1]", "period.end", "draft"]
        );
    }

    #[test]
    fn null_counts_as_missing() {
        let issues = check_body(&json!({ "title": null, "framework": "soc2" }), RULES);
        assert_eq!(issues, vec![FieldIssue::new("title", "required")]);
    }

    #[test]
    fn non_object_body_is_rejected() {
        let issues = check_body(&json!([1, 2]), RULES);
        assert_eq!(issues, vec![FieldIssue::new("body", "expected object")]);
    }
}
