pub mod hooks;
pub mod runtime;
pub mod suite;
pub mod suites;

pub use hooks::context::{PreparedRequest, RequestSpec, ResponseSnapshot, RunContext};
pub use hooks::hook::{async_hook_fn, hook_fn, Hook, HookFuture, HookHandle};
pub use hooks::key::{IntoCaseKey, TestCaseKey};
pub use hooks::phase::HookPhase;
pub use hooks::registry::{HookRegistry, Registration};
pub use hooks::state::{RunState, UnresolvedScratchReference};
pub use runtime::config::{
    SequencerConfig, SequencerConfigBuilder, SequencerConfigParams, TimeoutPolicy,
};
pub use runtime::error::{
    CaseKeyError, HookError, HookErrorKind, RegistryError, SetupError, SuiteError,
};
pub use runtime::executor::{CaseExecutor, ExecutorFuture};
pub use runtime::fatal::AbortCause;
pub use runtime::plan::SequencePlan;
pub use runtime::report::{CaseFailure, CaseOutcome, CaseReport, RunReport};
pub use runtime::runner::Runner;
pub use runtime::sequencer::Sequencer;
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
pub use suite::{ContractCase, ContractSuite};
