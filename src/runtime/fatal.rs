use crate::hooks::key::TestCaseKey;
use crate::hooks::phase::HookPhase;
use crate::runtime::error::HookError;
use anyhow::Error as AnyError;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;

/// Why a run stopped scheduling cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortCause {
    Hook {
        phase: HookPhase,
        hook: String,
        case: TestCaseKey,
        message: String,
    },
    External {
        context: String,
        message: String,
    },
}

impl fmt::Display for AbortCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortCause::Hook { message, .. } => f.write_str(message),
            AbortCause::External { context, message } => write!(f, "{context}: {message}"),
        }
    }
}

impl std::error::Error for AbortCause {}

/// Records the first run-aborting error and cancels the run.
///
/// Per-case hook failures never reach this handler; only hook timeouts under
/// the abort policy and executor panics do.
#[derive(Clone)]
pub struct FatalErrorHandler {
    inner: Arc<FatalInner>,
}

struct FatalInner {
    run_shutdown: CancellationToken,
    cause: OnceLock<AbortCause>,
}

impl FatalErrorHandler {
    pub fn new(run_shutdown: CancellationToken) -> Self {
        Self {
            inner: Arc::new(FatalInner {
                run_shutdown,
                cause: OnceLock::new(),
            }),
        }
    }

    /// Aborts the run because of `error`. The caller keeps the error for the case report.
    pub fn trigger(&self, error: &HookError) {
        let cause = AbortCause::Hook {
            phase: error.phase(),
            hook: error.hook().to_owned(),
            case: error.case().clone(),
            message: error.to_string(),
        };
        if self.record(cause) {
            tracing::error!(
                phase = %error.phase(),
                hook = error.hook(),
                case = %error.case(),
                error = %error,
                "fatal hook error; aborting run"
            );
        }
    }

    pub fn trigger_external(&self, context: &str, error: &AnyError) {
        let cause = AbortCause::External {
            context: context.to_owned(),
            message: format!("{error:#}"),
        };
        if self.record(cause) {
            tracing::error!(context, error = %error, "fatal sequencer error; aborting run");
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.cause.get().is_some()
    }

    pub fn cause(&self) -> Option<&AbortCause> {
        self.inner.cause.get()
    }

    pub fn error(&self) -> Option<AnyError> {
        self.cause().cloned().map(AnyError::new)
    }

    /// Keeps the first cause only. The run token is cancelled either way.
    fn record(&self, cause: AbortCause) -> bool {
        let first = self.inner.cause.set(cause).is_ok();
        self.inner.run_shutdown.cancel();
        first
    }
}
