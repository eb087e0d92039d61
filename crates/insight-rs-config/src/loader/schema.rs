//! Schema check for a single JSON5 layer, run before serde sees it.
//!
//! Each top-level section is a flat object with a fixed set of keys, so the
//! schema is a table of sections and their typed keys.

use crate::ConfigError;
use serde_json::Value;

#[derive(Debug, Clone, Copy)]
enum Expect {
    Text,
    Flag,
    Count,
}

impl Expect {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Expect::Text => value.is_string(),
            Expect::Flag => value.is_boolean(),
            Expect::Count => value.is_u64(),
        }
    }

    fn complaint(self) -> &'static str {
        match self {
            Expect::Text => "expected string",
            Expect::Flag => "expected bool",
            Expect::Count => "expected non-negative integer",
        }
    }
}

struct Section {
    name: &'static str,
    keys: &'static [(&'static str, Expect)],
}

const SECTIONS: &[Section] = &[
    Section {
        name: "workflow",
        keys: &[
            ("buffer_capacity", Expect::Count),
            ("batch_size", Expect::Count),
            ("stream_interval_ms", Expect::Count),
            ("batch_lookback_secs", Expect::Count),
        ],
    },
    Section {
        name: "latency",
        keys: &[
            ("capsule_ms", Expect::Count),
            ("anchor_preparing_ms", Expect::Count),
            ("anchor_broadcasting_ms", Expect::Count),
            ("anchor_confirming_ms", Expect::Count),
            ("verify_ms", Expect::Count),
            ("api_ms", Expect::Count),
        ],
    },
    Section {
        name: "anchor",
        keys: &[
            ("network", Expect::Text),
            ("explorer_base_url", Expect::Text),
            ("base_block", Expect::Count),
            ("block_spread", Expect::Count),
            ("confirmations", Expect::Count),
        ],
    },
    Section {
        name: "server",
        keys: &[("bind", Expect::Text), ("cors", Expect::Flag)],
    },
    Section {
        name: "mail",
        keys: &[
            ("admin_address", Expect::Text),
            ("from_address", Expect::Text),
            ("product_name", Expect::Text),
        ],
    },
];

/// Validate one layer. `layer` prefixes every reported path.
pub(super) fn validate_layer_schema(value: &Value, layer: &str) -> Result<(), ConfigError> {
    let root = value
        .as_object()
        .ok_or_else(|| invalid_field(layer, "", "expected object"))?;
    for (key, value) in root {
        if key == "$schema" {
            check(value, Expect::Text, layer, key)?;
            continue;
        }
        let section = SECTIONS
            .iter()
            .find(|section| section.name == key.as_str())
            .ok_or_else(|| invalid_field(layer, key, "unknown key"))?;
        validate_section(section, value, layer)?;
    }
    Ok(())
}

fn validate_section(section: &Section, value: &Value, layer: &str) -> Result<(), ConfigError> {
    let entries = value
        .as_object()
        .ok_or_else(|| invalid_field(layer, section.name, "expected object"))?;
    for (key, value) in entries {
        let path = format!("{}.{key}", section.name);
        let (_, expect) = section
            .keys
            .iter()
            .find(|(name, _)| *name == key.as_str())
            .ok_or_else(|| invalid_field(layer, &path, "unknown key"))?;
        check(value, *expect, layer, &path)?;
    }
    Ok(())
}

fn check(value: &Value, expect: Expect, layer: &str, path: &str) -> Result<(), ConfigError> {
    if expect.accepts(value) {
        Ok(())
    } else {
        Err(invalid_field(layer, path, expect.complaint()))
    }
}

/// Locate an error as `layer:path`; an empty path is the layer root.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{path}"),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn location(value: Value) -> Option<(String, String)> {
        match validate_layer_schema(&value, "test") {
            Ok(()) => None,
            Err(ConfigError::InvalidField { path, message }) => Some((path, message)),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn every_section_key_is_accepted() {
        let layer = json!({
            "$schema": "https://insight.example/config.json",
            "workflow": { "buffer_capacity": 10, "batch_lookback_secs": 60 },
            "latency": { "api_ms": 0 },
            "anchor": { "network": "devnet", "confirmations": 3 },
            "server": { "bind": "0.0.0.0:80", "cors": false },
            "mail": { "product_name": "Insight" },
        });
        assert_eq!(location(layer), None);
    }

    #[test]
    fn non_object_root_and_section() {
        assert_eq!(
            location(json!([])),
            Some(("test:root".to_string(), "expected object".to_string()))
        );
        assert_eq!(
            location(json!({ "mail": "x" })),
            Some(("test:mail".to_string(), "expected object".to_string()))
        );
    }

    #[test]
    fn unknown_nested_key() {
        assert_eq!(
            location(json!({ "anchor": { "chain_id": 11155111 } })),
            Some(("test:anchor.chain_id".to_string(), "unknown key".to_string()))
        );
    }
}
