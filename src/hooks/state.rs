use crate::hooks::key::TestCaseKey;
use crate::runtime::telemetry::Telemetry;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A read of a scratch slot that no hook had written yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedScratchReference {
    pub slot: String,
    pub case: Option<TestCaseKey>,
}

/// Values threaded between otherwise independent cases of one run.
///
/// A slot that was never written is absent; a slot written with an empty
/// string or `null` is present. Reads of absent slots are reported, not fatal.
#[derive(Debug, Default)]
pub struct RunState {
    slots: BTreeMap<String, Value>,
    current_case: Option<TestCaseKey>,
    unresolved: Vec<UnresolvedScratchReference>,
    telemetry: Option<Arc<Telemetry>>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_telemetry(telemetry: Arc<Telemetry>) -> Self {
        Self {
            telemetry: Some(telemetry),
            ..Self::default()
        }
    }

    pub(crate) fn enter_case(&mut self, case: &TestCaseKey) {
        self.current_case = Some(case.clone());
    }

    pub(crate) fn leave_case(&mut self) {
        self.current_case = None;
    }

    /// Stores `value` under `slot`, replacing any previous value.
    pub fn capture(&mut self, slot: impl Into<String>, value: impl Into<Value>) {
        let slot = slot.into();
        let value = value.into();
        tracing::debug!(
            slot = %slot,
            case = ?self.current_case.as_ref().map(ToString::to_string),
            "captured scratch value"
        );
        self.slots.insert(slot, value);
    }

    /// Reads a slot, warning when it was never written.
    pub fn read(&mut self, slot: &str) -> Option<&Value> {
        if !self.slots.contains_key(slot) {
            self.record_unresolved(slot);
            return None;
        }
        self.slots.get(slot)
    }

    /// String form of a slot for use as a path or query value.
    ///
    /// Unset slots resolve to an empty string after the same warning as [`Self::read`].
    /// String values are returned verbatim; other JSON values use their JSON text.
    pub fn resolve_string(&mut self, slot: &str) -> String {
        match self.read(slot) {
            Some(Value::String(value)) => value.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Reads a slot without reporting it when unset.
    pub fn peek(&self, slot: &str) -> Option<&Value> {
        self.slots.get(slot)
    }

    pub fn is_set(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    pub fn slots(&self) -> &BTreeMap<String, Value> {
        &self.slots
    }

    /// Unset reads observed so far in this run.
    pub fn unresolved(&self) -> &[UnresolvedScratchReference] {
        &self.unresolved
    }

    pub(crate) fn take_unresolved(&mut self) -> Vec<UnresolvedScratchReference> {
        std::mem::take(&mut self.unresolved)
    }

    fn record_unresolved(&mut self, slot: &str) {
        tracing::warn!(
            slot,
            case = ?self.current_case.as_ref().map(ToString::to_string),
            "scratch slot read before any hook wrote it"
        );
        if let Some(telemetry) = &self.telemetry {
            telemetry.record_unresolved_read();
        }
        self.unresolved.push(UnresolvedScratchReference {
            slot: slot.to_owned(),
            case: self.current_case.clone(),
        });
    }
}
