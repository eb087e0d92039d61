use insight_rs_core::{IdKind, IdProvider};
use std::sync::atomic::{AtomicU64, Ordering};

/// Predictable ids: `capsule-0001`, `record-0002`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdProvider for SequentialIds {
    fn next_id(&self, kind: IdKind) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        let prefix = match kind {
            IdKind::Record => "record",
            IdKind::Capsule => "capsule",
            IdKind::ProofRef => "proof",
            IdKind::Transaction => "tx",
            IdKind::Resource => "res",
        };
        format!("{prefix}-{n:04}")
    }
}
