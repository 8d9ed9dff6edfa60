use crate::hooks::context::PreparedRequest;
use crate::hooks::key::TestCaseKey;
use crate::hooks::state::UnresolvedScratchReference;
use crate::runtime::error::HookError;
use anyhow::Error as AnyError;
use http::StatusCode;
use std::fmt;
use std::time::Duration;

/// One reason a case failed.
#[derive(Debug)]
pub enum CaseFailure {
    Hook(HookError),
    UnresolvedPathParam { name: String },
    Request(AnyError),
    StatusMismatch {
        expected: StatusCode,
        actual: StatusCode,
    },
}

impl fmt::Display for CaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseFailure::Hook(err) => fmt::Display::fmt(err, f),
            CaseFailure::UnresolvedPathParam { name } => {
                write!(f, "path placeholder {{{name}}} has no value")
            }
            CaseFailure::Request(err) => write!(f, "request failed: {err:#}"),
            CaseFailure::StatusMismatch { expected, actual } => write!(
                f,
                "expected status {}, got {}",
                expected.as_u16(),
                actual.as_u16()
            ),
        }
    }
}

#[derive(Debug)]
pub enum CaseOutcome {
    Passed,
    Failed(Vec<CaseFailure>),
    Skipped { reason: String },
    /// The run was cancelled after the request went out.
    Interrupted,
}

impl CaseOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, CaseOutcome::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, CaseOutcome::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, CaseOutcome::Skipped { .. })
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, CaseOutcome::Interrupted)
    }

    pub fn failures(&self) -> &[CaseFailure] {
        match self {
            CaseOutcome::Failed(failures) => failures,
            _ => &[],
        }
    }
}

#[derive(Debug)]
pub struct CaseReport {
    pub key: TestCaseKey,
    pub position: usize,
    pub outcome: CaseOutcome,
    /// Request handed to the executor; `None` when no request was issued.
    pub request: Option<PreparedRequest>,
    pub response_status: Option<StatusCode>,
    pub unresolved: Vec<UnresolvedScratchReference>,
    pub elapsed: Duration,
}

impl CaseReport {
    pub fn request_issued(&self) -> bool {
        self.request.is_some()
    }
}

/// Per-case results of one run, in execution order.
#[derive(Debug, Default)]
pub struct RunReport {
    cases: Vec<CaseReport>,
    interrupted: bool,
}

impl RunReport {
    pub(crate) fn push(&mut self, report: CaseReport) {
        self.cases.push(report);
    }

    pub(crate) fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    pub fn cases(&self) -> &[CaseReport] {
        &self.cases
    }

    pub fn case(&self, key: &TestCaseKey) -> Option<&CaseReport> {
        self.cases.iter().find(|report| &report.key == key)
    }

    /// Whether the run stopped early because it was cancelled.
    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn passed(&self) -> usize {
        self.count(CaseOutcome::is_passed)
    }

    pub fn failed(&self) -> usize {
        self.count(CaseOutcome::is_failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(CaseOutcome::is_skipped)
    }

    pub fn requests_issued(&self) -> usize {
        self.cases
            .iter()
            .filter(|report| report.request_issued())
            .count()
    }

    /// Unset scratch reads across all cases.
    pub fn unresolved(&self) -> impl Iterator<Item = &UnresolvedScratchReference> {
        self.cases.iter().flat_map(|report| report.unresolved.iter())
    }

    /// True when no case failed and the run was not interrupted.
    pub fn is_success(&self) -> bool {
        !self.interrupted && self.failed() == 0
    }

    fn count(&self, predicate: impl Fn(&CaseOutcome) -> bool) -> usize {
        self.cases
            .iter()
            .filter(|report| predicate(&report.outcome))
            .count()
    }
}
