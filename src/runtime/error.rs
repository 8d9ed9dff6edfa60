use crate::hooks::key::TestCaseKey;
use crate::hooks::phase::HookPhase;
use anyhow::Error as AnyError;
use std::fmt;
use std::time::Duration;

/// A case key string that does not follow `"<METHOD> <path-template> -> <status>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseKeyError {
    input: String,
    reason: &'static str,
}

impl CaseKeyError {
    pub(crate) fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_owned(),
            reason,
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn reason(&self) -> &str {
        self.reason
    }
}

impl fmt::Display for CaseKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid case key {:?}: {}", self.input, self.reason)
    }
}

impl std::error::Error for CaseKeyError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidKey(CaseKeyError),
    EmptySkipReason(TestCaseKey),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::InvalidKey(err) => fmt::Display::fmt(err, f),
            RegistryError::EmptySkipReason(key) => {
                write!(f, "skip of {key} must document a reason")
            }
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::InvalidKey(err) => Some(err),
            RegistryError::EmptySkipReason(_) => None,
        }
    }
}

impl From<CaseKeyError> for RegistryError {
    fn from(err: CaseKeyError) -> Self {
        RegistryError::InvalidKey(err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuiteError {
    Empty,
    DuplicateCase(TestCaseKey),
}

impl fmt::Display for SuiteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuiteError::Empty => write!(f, "contract suite contains no cases"),
            SuiteError::DuplicateCase(key) => {
                write!(f, "contract suite lists {key} more than once")
            }
        }
    }
}

impl std::error::Error for SuiteError {}

/// How a hook invocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookErrorKind {
    /// The hook resolved with an error.
    Failed,
    /// The hook did not resolve within the configured timeout.
    Timeout(Duration),
    /// The hook panicked while running.
    Panicked,
}

/// Error surfaced by a single hook invocation.
#[derive(Debug)]
pub struct HookError {
    phase: HookPhase,
    hook: String,
    case: TestCaseKey,
    kind: HookErrorKind,
    source: AnyError,
}

impl HookError {
    pub fn new(
        phase: HookPhase,
        hook: impl Into<String>,
        case: TestCaseKey,
        kind: HookErrorKind,
        source: AnyError,
    ) -> Self {
        Self {
            phase,
            hook: hook.into(),
            case,
            kind,
            source,
        }
    }

    pub fn phase(&self) -> HookPhase {
        self.phase
    }

    pub fn hook(&self) -> &str {
        &self.hook
    }

    pub fn case(&self) -> &TestCaseKey {
        &self.case
    }

    pub fn kind(&self) -> HookErrorKind {
        self.kind
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, HookErrorKind::Timeout(_))
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            HookErrorKind::Failed => write!(
                f,
                "{} hook `{}` failed for {}: {}",
                self.phase, self.hook, self.case, self.source
            ),
            HookErrorKind::Timeout(limit) => write!(
                f,
                "{} hook `{}` did not complete within {:?} for {}",
                self.phase, self.hook, limit, self.case
            ),
            HookErrorKind::Panicked => write!(
                f,
                "{} hook `{}` panicked for {}: {}",
                self.phase, self.hook, self.case, self.source
            ),
        }
    }
}

impl std::error::Error for HookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Configuration problems detected before any case runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// A scoped hook or skip names a case the suite does not contain.
    UnknownCase { phase: HookPhase, key: TestCaseKey },
    /// Global hooks run for every case and cannot take part in scratch ordering.
    GlobalScratchDeclaration { hook: String, slot: String },
    /// No hook anywhere declares that it produces the slot.
    MissingProducer {
        slot: String,
        consumer: String,
        case: TestCaseKey,
    },
    /// Every producer of the slot sits on a skipped case.
    ProducerSkipped {
        slot: String,
        consumer: String,
        producer_case: TestCaseKey,
    },
    /// Producers exist, but none runs before the consumer.
    ProducerOutOfOrder {
        slot: String,
        consumer: String,
        case: TestCaseKey,
        producer_case: TestCaseKey,
    },
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::UnknownCase { phase, key } => {
                write!(f, "{phase} registration targets {key}, which is not in the suite")
            }
            SetupError::GlobalScratchDeclaration { hook, slot } => write!(
                f,
                "global hook `{hook}` declares scratch slot `{slot}`; only scoped hooks may"
            ),
            SetupError::MissingProducer {
                slot,
                consumer,
                case,
            } => write!(
                f,
                "hook `{consumer}` on {case} requires scratch slot `{slot}` but no hook produces it"
            ),
            SetupError::ProducerSkipped {
                slot,
                consumer,
                producer_case,
            } => write!(
                f,
                "hook `{consumer}` requires scratch slot `{slot}`, but its producer case \
                 {producer_case} is skipped"
            ),
            SetupError::ProducerOutOfOrder {
                slot,
                consumer,
                case,
                producer_case,
            } => write!(
                f,
                "hook `{consumer}` on {case} requires scratch slot `{slot}`, but its producer \
                 case {producer_case} is not scheduled before it"
            ),
        }
    }
}

impl std::error::Error for SetupError {}
