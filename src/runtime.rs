//! Runtime glue that wires configuration, setup validation, hook invocation,
//! case sequencing, telemetry, and runner orchestration.

pub mod config;
pub mod error;
pub mod executor;
pub mod fatal;
pub(crate) mod invoke;
pub(crate) mod lifecycle;
pub mod plan;
pub mod progress;
pub mod report;
pub mod runner;
pub mod sequencer;
pub mod telemetry;
