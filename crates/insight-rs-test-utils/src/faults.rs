use insight_rs_core::FaultHook;
use insight_rs_protocol::Capsule;

/// Fault hook that fails anchoring, a verification check, or both.
#[derive(Debug, Default, Clone)]
pub struct FailingFaults {
    anchor_message: Option<String>,
    failed_check: Option<String>,
}

impl FailingFaults {
    /// Fail every anchoring with `message`.
    pub fn anchor(message: impl Into<String>) -> Self {
        Self {
            anchor_message: Some(message.into()),
            failed_check: None,
        }
    }

    /// Force the named verification check to fail.
    pub fn check(name: impl Into<String>) -> Self {
        Self {
            anchor_message: None,
            failed_check: Some(name.into()),
        }
    }
}

impl FaultHook for FailingFaults {
    fn anchor_fault(&self, _capsule: &Capsule) -> Option<String> {
        self.anchor_message.clone()
    }

    fn failed_check(&self, _capsule: &Capsule) -> Option<String> {
        self.failed_check.clone()
    }
}
