//! Test helpers shared across Insight crates.

pub mod clock;
pub mod events;
pub mod faults;
pub mod ids;
pub mod mail;
pub mod random;

pub use clock::ManualClock;
pub use events::RecordingSink;
pub use faults::FailingFaults;
pub use ids::SequentialIds;
pub use mail::StubMailRelay;
pub use random::ScriptedRandom;
