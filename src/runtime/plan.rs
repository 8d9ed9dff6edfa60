//! Startup validation of a registry against the suite it will run.
//!
//! Ordering between cases comes from the suite alone, so every scratch
//! dependency a hook declares is checked here, before the first request,
//! instead of surfacing as an empty value halfway through a run.

use crate::hooks::key::TestCaseKey;
use crate::hooks::phase::HookPhase;
use crate::hooks::registry::{HookEntry, HookRegistry};
use crate::runtime::config::SequencerConfig;
use crate::runtime::error::SetupError;
use crate::suite::ContractSuite;

/// Position of a hook inside a run: case, phase within the case, registration order.
type RunPosition = (usize, u8, usize);

/// Summary of a validated registry/suite pairing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequencePlan {
    executable: usize,
    skipped: usize,
    warnings: Vec<String>,
}

struct Producer<'a> {
    slot: &'a str,
    position: RunPosition,
    case: &'a TestCaseKey,
    skipped: bool,
}

impl SequencePlan {
    pub fn build(
        registry: &HookRegistry,
        suite: &ContractSuite,
        config: &SequencerConfig,
    ) -> Result<Self, SetupError> {
        let mut plan = SequencePlan::default();

        let mut entries: Vec<&HookEntry> = registry.entries().collect();
        entries.sort_by_key(|entry| entry.sequence);

        let mut skips: Vec<(&TestCaseKey, &str)> = registry.skips().collect();
        skips.sort_by_key(|(key, _)| suite.position(key).unwrap_or(usize::MAX));

        for (key, _) in &skips {
            if suite.position(key).is_none() {
                plan.unknown_case(HookPhase::Skip, key, config)?;
            }
        }

        for entry in &entries {
            if entry.phase.is_global() {
                if let Some(slot) = entry.produces.iter().chain(&entry.requires).next() {
                    return Err(SetupError::GlobalScratchDeclaration {
                        hook: entry.handle.label().to_owned(),
                        slot: slot.clone(),
                    });
                }
                continue;
            }

            let Some(case) = entry.case.as_ref() else {
                continue;
            };
            if suite.position(case).is_none() {
                plan.unknown_case(entry.phase, case, config)?;
            } else if registry.is_skipped(case) {
                plan.warn(format!(
                    "hook `{}` is registered for skipped case {case} and will never run",
                    entry.handle.label()
                ));
            }
        }

        let producers: Vec<Producer<'_>> = entries
            .iter()
            .filter_map(|entry| {
                let case = entry.case.as_ref()?;
                let position = run_position(entry, suite)?;
                Some(entry.produces.iter().map(move |slot| Producer {
                    slot,
                    position,
                    case,
                    skipped: registry.is_skipped(case),
                }))
            })
            .flatten()
            .collect();

        for entry in &entries {
            let (Some(case), Some(position)) = (entry.case.as_ref(), run_position(entry, suite))
            else {
                continue;
            };
            if registry.is_skipped(case) {
                continue;
            }

            for slot in &entry.requires {
                if let Some(error) = check_dependency(entry, case, position, slot, &producers) {
                    if config.validate_dependencies() {
                        return Err(error);
                    }
                    plan.warn(error.to_string());
                }
            }
        }

        plan.skipped = suite
            .cases()
            .iter()
            .filter(|case| registry.is_skipped(case.key()))
            .count();
        plan.executable = suite.len() - plan.skipped;

        tracing::info!(
            cases = suite.len(),
            executable = plan.executable,
            skipped = plan.skipped,
            hooks = registry.len(),
            warnings = plan.warnings.len(),
            "validated hook sequence"
        );

        Ok(plan)
    }

    /// Cases that will be executed (suite length minus skips).
    pub fn executable(&self) -> usize {
        self.executable
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Problems that were tolerated because of the configuration.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn unknown_case(
        &mut self,
        phase: HookPhase,
        key: &TestCaseKey,
        config: &SequencerConfig,
    ) -> Result<(), SetupError> {
        let error = SetupError::UnknownCase {
            phase,
            key: key.clone(),
        };
        if config.strict_keys() {
            return Err(error);
        }
        self.warn(error.to_string());
        Ok(())
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }
}

fn run_position(entry: &HookEntry, suite: &ContractSuite) -> Option<RunPosition> {
    let case = entry.case.as_ref()?;
    let case_position = suite.position(case)?;
    Some((case_position, entry.phase.execution_rank(), entry.sequence))
}

fn check_dependency(
    consumer: &HookEntry,
    case: &TestCaseKey,
    position: RunPosition,
    slot: &str,
    producers: &[Producer<'_>],
) -> Option<SetupError> {
    let candidates: Vec<&Producer<'_>> = producers
        .iter()
        .filter(|producer| producer.slot == slot)
        .collect();

    if candidates
        .iter()
        .any(|producer| !producer.skipped && producer.position < position)
    {
        return None;
    }

    let consumer_label = consumer.handle.label().to_owned();

    if let Some(skipped) = candidates
        .iter()
        .find(|producer| producer.skipped && producer.position < position)
    {
        return Some(SetupError::ProducerSkipped {
            slot: slot.to_owned(),
            consumer: consumer_label,
            producer_case: skipped.case.clone(),
        });
    }

    match candidates.first() {
        Some(later) => Some(SetupError::ProducerOutOfOrder {
            slot: slot.to_owned(),
            consumer: consumer_label,
            case: case.clone(),
            producer_case: later.case.clone(),
        }),
        None => Some(SetupError::MissingProducer {
            slot: slot.to_owned(),
            consumer: consumer_label,
            case: case.clone(),
        }),
    }
}
