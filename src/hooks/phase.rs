use std::fmt;

/// Lifecycle points at which hooks run.
///
/// `BeforeEach` and `AfterEach` apply to every executed case; the remaining
/// phases are scoped to a single [`TestCaseKey`](crate::TestCaseKey).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookPhase {
    BeforeEach,
    Before,
    After,
    AfterEach,
    Skip,
}

impl HookPhase {
    /// Whether hooks in this phase run for every case rather than one key.
    pub fn is_global(self) -> bool {
        matches!(self, HookPhase::BeforeEach | HookPhase::AfterEach)
    }

    /// Position of the phase inside a single case execution.
    pub(crate) fn execution_rank(self) -> u8 {
        match self {
            HookPhase::Skip => 0,
            HookPhase::BeforeEach => 1,
            HookPhase::Before => 2,
            HookPhase::After => 3,
            HookPhase::AfterEach => 4,
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookPhase::BeforeEach => "beforeEach",
            HookPhase::Before => "before",
            HookPhase::After => "after",
            HookPhase::AfterEach => "afterEach",
            HookPhase::Skip => "skip",
        };
        f.write_str(name)
    }
}
