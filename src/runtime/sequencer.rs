//! Drives a contract suite through the registered hooks, one case at a time.
//!
//! For every case in suite order the sequencer:
//! - short-circuits skipped cases before any hook runs,
//! - runs `beforeEach` then scoped `before` hooks in registration order,
//! - resolves path placeholders and hands the request to the executor,
//! - runs scoped `after` then `afterEach` hooks against the response,
//! - asserts the response status against the case key.
//!
//! A failing case never stops the run. Only a fatal error (a hook timeout
//! under [`TimeoutPolicy::AbortRun`], or an executor panic) or cancellation
//! prevents later cases from being scheduled.

use crate::hooks::context::{PreparedRequest, ResponseSnapshot, RunContext};
use crate::hooks::key::TestCaseKey;
use crate::hooks::phase::HookPhase;
use crate::hooks::registry::HookRegistry;
use crate::hooks::state::RunState;
use crate::runtime::config::{SequencerConfig, TimeoutPolicy};
use crate::runtime::error::{HookError, SetupError};
use crate::runtime::executor::CaseExecutor;
use crate::runtime::fatal::AbortCause;
use crate::runtime::invoke::{invoke_hook, panic_message, HookDecision};
use crate::runtime::lifecycle::{LifecycleHandles, LifecycleSpawnParams};
use crate::runtime::plan::SequencePlan;
use crate::runtime::progress::ProgressTracker;
use crate::runtime::report::{CaseFailure, CaseOutcome, CaseReport, RunReport};
use crate::runtime::telemetry::Telemetry;
use crate::suite::{ContractCase, ContractSuite};
use anyhow::{anyhow, Error as AnyError, Result};
use futures::FutureExt;
use http::StatusCode;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Runs a [`ContractSuite`] through the hooks of a [`HookRegistry`], one case at a time.
pub struct Sequencer<E: CaseExecutor> {
    config: SequencerConfig,
    registry: HookRegistry,
    suite: ContractSuite,
    executor: E,
    plan: SequencePlan,
    state: RunState,
    report: RunReport,
    abort_cause: Option<AbortCause>,
    telemetry: Arc<Telemetry>,
    progress: Arc<ProgressTracker>,
    shutdown_root: CancellationToken,
}

enum PhaseOutcome {
    Completed,
    Failed(HookError),
    Cancelled,
}

enum ExecuteOutcome {
    Response(ResponseSnapshot),
    Failed(AnyError),
    Cancelled,
}

enum CaseRun {
    Completed(CaseReport),
    /// Carries the partial report when the request had already been issued.
    Interrupted(Option<CaseReport>),
}

impl<E: CaseExecutor> Sequencer<E> {
    /// Validates the registry against the suite and prepares a sequencer.
    ///
    /// The sequencer creates its own root cancellation token. Use
    /// [`Self::with_cancellation_token`] to integrate with an existing shutdown mechanism.
    pub fn new(
        config: SequencerConfig,
        registry: HookRegistry,
        suite: ContractSuite,
        executor: E,
    ) -> Result<Self, SetupError> {
        Self::with_cancellation_token(config, registry, suite, executor, CancellationToken::new())
    }

    pub fn with_cancellation_token(
        config: SequencerConfig,
        registry: HookRegistry,
        suite: ContractSuite,
        executor: E,
        shutdown_token: CancellationToken,
    ) -> Result<Self, SetupError> {
        let plan = SequencePlan::build(&registry, &suite, &config)?;
        let telemetry = Arc::new(Telemetry::default());
        let progress = Arc::new(ProgressTracker::new(suite.len()));

        Ok(Self {
            state: RunState::with_telemetry(telemetry.clone()),
            config,
            registry,
            suite,
            executor,
            plan,
            report: RunReport::default(),
            abort_cause: None,
            telemetry,
            progress,
            shutdown_root: shutdown_token,
        })
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    pub fn suite(&self) -> &ContractSuite {
        &self.suite
    }

    pub fn plan(&self) -> &SequencePlan {
        &self.plan
    }

    /// Scratch state of the current or most recent run.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Report of the current or most recent run, including partial results of an aborted run.
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Why the most recent run was aborted, if it was.
    pub fn abort_cause(&self) -> Option<&AbortCause> {
        self.abort_cause.as_ref()
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    /// Returns a clone of the telemetry handle for observability.
    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Suite position of the last case the current or most recent run finished.
    pub fn last_completed_position(&self) -> Option<usize> {
        self.progress.last_completed()
    }

    /// Replaces the root shutdown token used to derive per-run cancellation tokens.
    pub fn replace_shutdown_root(&mut self, shutdown: CancellationToken) {
        self.shutdown_root = shutdown;
    }

    /// Runs every case of the suite in order.
    ///
    /// Returns an error only when the run was aborted by a fatal error; the
    /// partial report is then still available through [`Self::report`].
    pub async fn run(&mut self) -> Result<&RunReport> {
        self.state = RunState::with_telemetry(self.telemetry.clone());
        self.report = RunReport::default();
        self.abort_cause = None;
        self.progress.reset(self.suite.len());

        tracing::info!(
            cases = self.suite.len(),
            executable = self.plan.executable(),
            skipped = self.plan.skipped(),
            "starting contract run"
        );

        let lifecycle = LifecycleHandles::spawn(LifecycleSpawnParams {
            shutdown_root: &self.shutdown_root,
            telemetry: self.telemetry.clone(),
            progress: self.progress.clone(),
            metrics_interval: self.config.metrics_interval(),
        });

        self.drive(&lifecycle).await;

        let fatal = lifecycle.error();
        self.abort_cause = lifecycle.fatal_handler().cause().cloned();
        lifecycle.shutdown().await;

        if let Some(err) = fatal {
            return Err(err.context("hook sequencing aborted"));
        }

        tracing::info!(
            passed = self.report.passed(),
            failed = self.report.failed(),
            skipped = self.report.skipped(),
            interrupted = self.report.interrupted(),
            "contract run finished"
        );

        Ok(&self.report)
    }

    async fn drive(&mut self, lifecycle: &LifecycleHandles) {
        for position in 0..self.suite.len() {
            if lifecycle.run_token.is_cancelled() {
                if !lifecycle.fatal_handler().is_triggered() {
                    tracing::info!(position, "contract run cancelled");
                    self.report.mark_interrupted();
                }
                break;
            }

            let case = self.suite.cases()[position].clone();
            match self.run_case(position, &case, lifecycle).await {
                CaseRun::Completed(report) => {
                    self.report.push(report);
                    self.progress.mark_completed(position);
                }
                CaseRun::Interrupted(partial) => {
                    if let Some(report) = partial {
                        self.report.push(report);
                    }
                    if !lifecycle.fatal_handler().is_triggered() {
                        tracing::info!(case = %case.key(), "contract run cancelled mid-case");
                        self.report.mark_interrupted();
                    }
                    break;
                }
            }
        }
    }

    async fn run_case(
        &mut self,
        position: usize,
        case: &ContractCase,
        lifecycle: &LifecycleHandles,
    ) -> CaseRun {
        let key = case.key();
        let started = Instant::now();

        if let Some(reason) = self.registry.skip_reason(key) {
            tracing::info!(case = %key, position, reason, "skipping case");
            self.telemetry.record_case_skipped();
            return CaseRun::Completed(CaseReport {
                key: key.clone(),
                position,
                outcome: CaseOutcome::Skipped {
                    reason: reason.to_owned(),
                },
                request: None,
                response_status: None,
                unresolved: Vec::new(),
                elapsed: started.elapsed(),
            });
        }

        tracing::debug!(case = %key, position, "running case");
        self.state.enter_case(key);
        let mut ctx = RunContext::new(key.clone(), case.defaults().clone());
        let mut failures = Vec::new();
        let mut request = None;
        let mut response_status = None;

        let mut ready = true;
        for phase in [HookPhase::BeforeEach, HookPhase::Before] {
            match self.run_phase(phase, &mut ctx, lifecycle).await {
                PhaseOutcome::Completed => {}
                PhaseOutcome::Failed(err) => {
                    failures.push(CaseFailure::Hook(err));
                    ready = false;
                    break;
                }
                PhaseOutcome::Cancelled => return self.abandon_case(position, key, None, started),
            }
        }

        if ready {
            match ctx.request.prepare(key) {
                Err(name) => failures.push(CaseFailure::UnresolvedPathParam { name }),
                Ok(prepared) => {
                    tracing::debug!(
                        case = %key,
                        method = %prepared.method,
                        path = %prepared.path,
                        "issuing request"
                    );
                    let outcome = self.execute(case, &prepared, lifecycle).await;
                    if !matches!(outcome, ExecuteOutcome::Cancelled) {
                        self.telemetry.record_request_issued();
                    }
                    request = Some(prepared);

                    match outcome {
                        ExecuteOutcome::Response(response) => {
                            response_status = Some(response.status);
                            ctx.response = Some(response);
                            for phase in [HookPhase::After, HookPhase::AfterEach] {
                                match self.run_phase(phase, &mut ctx, lifecycle).await {
                                    PhaseOutcome::Completed => {}
                                    PhaseOutcome::Failed(err) => {
                                        failures.push(CaseFailure::Hook(err));
                                        break;
                                    }
                                    PhaseOutcome::Cancelled => {
                                        let issued = request
                                            .take()
                                            .map(|request| (request, response_status));
                                        return self.abandon_case(position, key, issued, started);
                                    }
                                }
                            }
                        }
                        ExecuteOutcome::Failed(err) => failures.push(CaseFailure::Request(err)),
                        ExecuteOutcome::Cancelled => {
                            return self.abandon_case(position, key, None, started);
                        }
                    }
                }
            }
        }

        if let Some(actual) = response_status {
            if self.config.assert_status() && actual != key.status() {
                failures.push(CaseFailure::StatusMismatch {
                    expected: key.status(),
                    actual,
                });
            }
        }

        let unresolved = self.state.take_unresolved();
        self.state.leave_case();
        let elapsed = started.elapsed();

        let outcome = if failures.is_empty() {
            self.telemetry.record_case_passed();
            tracing::info!(
                case = %key,
                position,
                elapsed_ms = elapsed.as_millis() as u64,
                "case passed"
            );
            CaseOutcome::Passed
        } else {
            self.telemetry.record_case_failed();
            let summary = failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            tracing::warn!(case = %key, position, failures = %summary, "case failed");
            CaseOutcome::Failed(failures)
        };

        CaseRun::Completed(CaseReport {
            key: key.clone(),
            position,
            outcome,
            request,
            response_status,
            unresolved,
            elapsed,
        })
    }

    async fn run_phase(
        &mut self,
        phase: HookPhase,
        ctx: &mut RunContext,
        lifecycle: &LifecycleHandles,
    ) -> PhaseOutcome {
        let hooks = self.registry.hooks_for(phase, ctx.case());

        for hook in &hooks {
            self.telemetry.record_hook_invoked();
            tracing::trace!(
                case = %ctx.case(),
                phase = %phase,
                hook = hook.label(),
                "invoking hook"
            );

            let decision = invoke_hook(
                hook,
                phase,
                ctx,
                &mut self.state,
                self.config.hook_timeout(),
                &lifecycle.run_token,
            )
            .await;

            match decision {
                HookDecision::Finished(Ok(())) => {}
                HookDecision::Finished(Err(err)) => {
                    if err.is_timeout() {
                        self.telemetry.record_hook_timeout();
                        if self.config.timeout_policy() == TimeoutPolicy::AbortRun {
                            lifecycle.fatal_handler().trigger(&err);
                        }
                    } else {
                        self.telemetry.record_hook_failure();
                    }
                    tracing::warn!(
                        case = %err.case(),
                        phase = %phase,
                        hook = err.hook(),
                        error = %err,
                        "hook failed"
                    );
                    return PhaseOutcome::Failed(err);
                }
                HookDecision::Cancelled => return PhaseOutcome::Cancelled,
            }
        }

        PhaseOutcome::Completed
    }

    async fn execute(
        &mut self,
        case: &ContractCase,
        request: &PreparedRequest,
        lifecycle: &LifecycleHandles,
    ) -> ExecuteOutcome {
        let call = AssertUnwindSafe(self.executor.execute(case, request)).catch_unwind();

        tokio::select! {
            biased;
            _ = lifecycle.run_token.cancelled() => ExecuteOutcome::Cancelled,
            outcome = call => match outcome {
                Ok(Ok(response)) => ExecuteOutcome::Response(response),
                Ok(Err(err)) => ExecuteOutcome::Failed(err),
                Err(panic_payload) => {
                    let message = panic_message(panic_payload.as_ref());
                    let error = anyhow!(
                        "executor panicked while running {}: {message}",
                        case.key()
                    );
                    lifecycle
                        .fatal_handler()
                        .trigger_external("case executor", &error);
                    ExecuteOutcome::Failed(error)
                }
            },
        }
    }

    /// Leaves a case cancelled mid-flight. A case whose request already went
    /// out is still reported, as [`CaseOutcome::Interrupted`].
    fn abandon_case(
        &mut self,
        position: usize,
        key: &TestCaseKey,
        issued: Option<(PreparedRequest, Option<StatusCode>)>,
        started: Instant,
    ) -> CaseRun {
        let unresolved = self.state.take_unresolved();
        self.state.leave_case();
        let partial = issued.map(|(request, response_status)| CaseReport {
            key: key.clone(),
            position,
            outcome: CaseOutcome::Interrupted,
            request: Some(request),
            response_status,
            unresolved,
            elapsed: started.elapsed(),
        });
        CaseRun::Interrupted(partial)
    }
}
