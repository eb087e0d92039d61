//! Accumulates config layers in precedence order.

use super::{LayerInfo, ParsedLayer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Merged view of every layer pushed so far.
pub(super) struct LayerStack {
    merged: Value,
    layers: Vec<LayerInfo>,
    claimed: HashSet<PathBuf>,
}

impl LayerStack {
    pub(super) fn new() -> Self {
        Self {
            merged: Value::Object(Map::new()),
            layers: Vec::new(),
            claimed: HashSet::new(),
        }
    }

    /// Reserve `path` for one layer. Returns false if a lower layer already read it.
    pub(super) fn claim(&mut self, path: &Path) -> bool {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.claimed.insert(key)
    }

    /// Overlay a layer on top of everything pushed before it.
    pub(super) fn push(&mut self, layer: ParsedLayer) {
        overlay(&mut self.merged, layer.value);
        self.layers.push(layer.origin);
    }

    pub(super) fn len(&self) -> usize {
        self.layers.len()
    }

    pub(super) fn finish(self) -> (Value, Vec<LayerInfo>) {
        (self.merged, self.layers)
    }
}

/// Objects merge key by key; any other value replaces what is below it.
fn overlay(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Object(base_map), Value::Object(top_map)) => {
            for (key, value) in top_map {
                match base_map.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_objects_merge_and_scalars_replace() {
        let mut base = json!({
            "latency": { "capsule_ms": 1500, "verify_ms": 1200 },
            "server": { "bind": "127.0.0.1:8080" },
        });
        overlay(
            &mut base,
            json!({
                "latency": { "verify_ms": 10 },
                "server": "replaced",
                "mail": { "product_name": "Insight" },
            }),
        );
        assert_eq!(
            base,
            json!({
                "latency": { "capsule_ms": 1500, "verify_ms": 10 },
                "server": "replaced",
                "mail": { "product_name": "Insight" },
            })
        );
    }

    #[test]
    fn claim_rejects_repeated_paths() {
        let mut stack = LayerStack::new();
        let path = Path::new("/nonexistent/insight.json5");
        assert!(stack.claim(path));
        assert!(!stack.claim(path));
        assert_eq!(stack.len(), 0);
    }
}
