//! Core workflow engine for the Insight demos.
//!
//! This crate owns synthetic record generation, filtering, the simulated
//! capsule, anchor, and verification steps, and the per-run workflow state
//! machine used by the server and the CLI.

pub mod anchor;
pub mod capsule;
pub mod clock;
pub mod domain;
pub mod error;
pub mod event_bus;
pub mod fault;
pub mod filter;
pub mod generator;
pub mod ids;
pub mod random;
pub mod registry;
pub mod verify;
pub mod workflow;

pub use anchor::AnchorSimulator;
pub use capsule::build_capsule;
pub use clock::{Clock, SystemClock};
pub use domain::{DomainSchema, FilterField, TIME_RANGE_KEY};
pub use error::WorkflowError;
pub use event_bus::EventBus;
pub use fault::{FaultHook, NoFaults};
pub use filter::{filter_records, matches};
pub use generator::RecordGenerator;
pub use ids::{IdKind, IdProvider, SimulatedIdProvider};
/// Event sink interface shared with the protocol crate.
pub use insight_rs_protocol::EventSink;
pub use random::{RandomSource, StdRandom, pick};
pub use registry::WorkflowRegistry;
pub use verify::VerificationSimulator;
pub use workflow::{Workflow, WorkflowServices};
