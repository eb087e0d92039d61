//! Failure injection for the simulated steps.
//!
//! The simulators succeed unconditionally unless a hook says otherwise. The
//! default hook never injects anything.

use insight_rs_protocol::Capsule;

/// Decides whether a simulated step should fail.
pub trait FaultHook: Send + Sync {
    /// Message for a forced anchoring failure, if any.
    fn anchor_fault(&self, _capsule: &Capsule) -> Option<String> {
        None
    }

    /// Name of a verification sub-check to force to `false`, if any.
    fn failed_check(&self, _capsule: &Capsule) -> Option<String> {
        None
    }
}

/// Hook that never injects a fault.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFaults;

impl FaultHook for NoFaults {}
