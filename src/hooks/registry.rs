//! Registry mapping lifecycle phases and case keys onto hooks.
//!
//! Registration order is preserved per `(phase, key)` and per global phase,
//! and it is the order the sequencer invokes hooks in. Every entry also
//! carries a global sequence number so startup validation can reason about
//! ordering between hooks declared on different cases.

use crate::hooks::hook::{Hook, HookHandle};
use crate::hooks::key::{IntoCaseKey, TestCaseKey};
use crate::hooks::phase::HookPhase;
use crate::runtime::error::RegistryError;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub(crate) struct HookEntry {
    pub(crate) sequence: usize,
    pub(crate) phase: HookPhase,
    pub(crate) case: Option<TestCaseKey>,
    pub(crate) handle: HookHandle,
    pub(crate) produces: Vec<String>,
    pub(crate) requires: Vec<String>,
}

/// Handle returned by every registration to attach a label or scratch
/// dependency declarations to the hook just registered.
pub struct Registration<'a> {
    entry: &'a mut HookEntry,
}

impl<'a> Registration<'a> {
    /// Replaces the generated label used in logs and reports.
    pub fn named(self, label: impl Into<String>) -> Self {
        let label: String = label.into();
        self.entry.handle.rename(label);
        self
    }

    /// Declares that this hook writes `slot` into the run's scratch state.
    pub fn produces(self, slot: impl Into<String>) -> Self {
        push_unique(&mut self.entry.produces, slot.into());
        self
    }

    /// Declares that this hook reads `slot`, which an earlier case must produce.
    pub fn requires(self, slot: impl Into<String>) -> Self {
        push_unique(&mut self.entry.requires, slot.into());
        self
    }

    pub fn label(&self) -> &str {
        self.entry.handle.label()
    }
}

#[derive(Debug, Default)]
pub struct HookRegistry {
    next_sequence: usize,
    before_each: Vec<HookEntry>,
    after_each: Vec<HookEntry>,
    scoped: HashMap<(HookPhase, TestCaseKey), Vec<HookEntry>>,
    skips: HashMap<TestCaseKey, String>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook that runs before every executed case.
    pub fn before_each(&mut self, hook: impl Hook) -> Registration<'_> {
        self.push_global(HookPhase::BeforeEach, Arc::new(hook))
    }

    /// Registers a hook that runs after every executed case.
    pub fn after_each(&mut self, hook: impl Hook) -> Registration<'_> {
        self.push_global(HookPhase::AfterEach, Arc::new(hook))
    }

    /// Registers a hook that runs before the request of the case matching `key`.
    pub fn before(
        &mut self,
        key: impl IntoCaseKey,
        hook: impl Hook,
    ) -> Result<Registration<'_>, RegistryError> {
        let key = key.into_case_key()?;
        Ok(self.push_scoped(HookPhase::Before, key, Arc::new(hook)))
    }

    /// Registers a hook that runs after the response of the case matching `key`.
    pub fn after(
        &mut self,
        key: impl IntoCaseKey,
        hook: impl Hook,
    ) -> Result<Registration<'_>, RegistryError> {
        let key = key.into_case_key()?;
        Ok(self.push_scoped(HookPhase::After, key, Arc::new(hook)))
    }

    /// Excludes the case matching `key` from execution and assertion.
    pub fn skip(
        &mut self,
        key: impl IntoCaseKey,
        reason: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let key = key.into_case_key()?;
        let reason = reason.into().trim().to_owned();
        if reason.is_empty() {
            return Err(RegistryError::EmptySkipReason(key));
        }

        if let Some(existing) = self.skips.get(&key) {
            tracing::warn!(
                case = %key,
                kept = %existing,
                ignored = %reason,
                "case already marked skipped; keeping the first reason"
            );
            return Ok(());
        }

        tracing::debug!(case = %key, reason = %reason, "registered skip");
        self.skips.insert(key, reason);
        Ok(())
    }

    pub fn skip_reason(&self, key: &TestCaseKey) -> Option<&str> {
        self.skips.get(key).map(String::as_str)
    }

    pub fn is_skipped(&self, key: &TestCaseKey) -> bool {
        self.skips.contains_key(key)
    }

    /// Hooks to invoke for `key` at `phase`, in registration order.
    ///
    /// Global phases ignore `key`; the skip phase has no hooks.
    pub fn hooks_for(&self, phase: HookPhase, key: &TestCaseKey) -> Vec<HookHandle> {
        let entries: &[HookEntry] = match phase {
            HookPhase::BeforeEach => &self.before_each,
            HookPhase::AfterEach => &self.after_each,
            HookPhase::Before | HookPhase::After => self
                .scoped
                .get(&(phase, key.clone()))
                .map(Vec::as_slice)
                .unwrap_or_default(),
            HookPhase::Skip => &[],
        };
        entries.iter().map(|entry| entry.handle.clone()).collect()
    }

    /// Number of registered hooks, skips excluded.
    pub fn len(&self) -> usize {
        self.before_each.len()
            + self.after_each.len()
            + self.scoped.values().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.skips.is_empty()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = &HookEntry> {
        self.before_each
            .iter()
            .chain(self.after_each.iter())
            .chain(self.scoped.values().flatten())
    }

    pub(crate) fn skips(&self) -> impl Iterator<Item = (&TestCaseKey, &str)> {
        self.skips.iter().map(|(key, reason)| (key, reason.as_str()))
    }

    fn push_global(&mut self, phase: HookPhase, hook: Arc<dyn Hook>) -> Registration<'_> {
        let sequence = self.bump_sequence();
        let list = match phase {
            HookPhase::BeforeEach => &mut self.before_each,
            _ => &mut self.after_each,
        };
        let index = list.len();
        let label = format!("{phase}#{}", index + 1);
        list.push(HookEntry {
            sequence,
            phase,
            case: None,
            handle: HookHandle::new(label, hook),
            produces: Vec::new(),
            requires: Vec::new(),
        });
        Registration {
            entry: &mut list[index],
        }
    }

    fn push_scoped(
        &mut self,
        phase: HookPhase,
        key: TestCaseKey,
        hook: Arc<dyn Hook>,
    ) -> Registration<'_> {
        let sequence = self.bump_sequence();
        let list = self.scoped.entry((phase, key.clone())).or_default();
        let index = list.len();
        let label = format!("{phase}#{} {key}", index + 1);
        list.push(HookEntry {
            sequence,
            phase,
            case: Some(key),
            handle: HookHandle::new(label, hook),
            produces: Vec::new(),
            requires: Vec::new(),
        });
        Registration {
            entry: &mut list[index],
        }
    }

    fn bump_sequence(&mut self) -> usize {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}

fn push_unique(slots: &mut Vec<String>, slot: String) {
    if !slots.contains(&slot) {
        slots.push(slot);
    }
}
