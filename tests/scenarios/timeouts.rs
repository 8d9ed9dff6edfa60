use std::time::Duration;

use crate::support::helpers::{init_tracing, RecordingExecutor};
use anyhow::Result;
use hookline::{
    async_hook_fn, CaseFailure, ContractSuite, HookErrorKind, HookRegistry, Sequencer,
    SequencerConfig, TimeoutPolicy,
};

fn registry_with_hanging_gear_hook() -> Result<HookRegistry> {
    let mut registry = HookRegistry::new();
    registry
        .before(
            "GET /gears/{GearName} -> 200",
            async_hook_fn(|_ctx, _state| {
                Box::pin(futures::future::pending::<anyhow::Result<()>>())
            }),
        )?
        .named("inject gear name");
    Ok(registry)
}

fn suite() -> Result<ContractSuite> {
    ContractSuite::from_keys([
        "GET /gears -> 200",
        "GET /gears/{GearName} -> 200",
        "GET /jobs -> 200",
    ])
}

#[tokio::test(start_paused = true)]
async fn hanging_hook_aborts_the_run() -> Result<()> {
    init_tracing();
    let config = SequencerConfig::builder()
        .hook_timeout(Duration::from_secs(2))
        .timeout_policy(TimeoutPolicy::AbortRun)
        .build()?;
    let executor = RecordingExecutor::default();
    let mut sequencer = Sequencer::new(
        config,
        registry_with_hanging_gear_hook()?,
        suite()?,
        executor.clone(),
    )?;

    let err = sequencer
        .run()
        .await
        .expect_err("hook timeout should abort the run");
    let message = format!("{err:#}");
    assert!(
        message.contains("hook sequencing aborted"),
        "unexpected error {message}"
    );
    assert!(message.contains("inject gear name"));

    let report = sequencer.report();
    assert_eq!(report.cases().len(), 2);
    assert!(report.cases()[0].outcome.is_passed());
    match &report.cases()[1].outcome.failures()[0] {
        CaseFailure::Hook(err) => {
            assert_eq!(err.kind(), HookErrorKind::Timeout(Duration::from_secs(2)))
        }
        other => panic!("unexpected failure {other}"),
    }
    assert_eq!(executor.paths(), vec!["/gears"]);
    assert_eq!(sequencer.last_completed_position(), Some(1));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn fail_case_policy_keeps_running() -> Result<()> {
    init_tracing();
    let config = SequencerConfig::builder()
        .hook_timeout(Duration::from_secs(2))
        .timeout_policy(TimeoutPolicy::FailCase)
        .build()?;
    let executor = RecordingExecutor::default();
    let mut sequencer = Sequencer::new(
        config,
        registry_with_hanging_gear_hook()?,
        suite()?,
        executor.clone(),
    )?;

    let report = sequencer.run().await?;
    assert_eq!(report.passed(), 2);
    assert_eq!(report.failed(), 1);
    assert!(!report.cases()[1].request_issued());
    assert_eq!(executor.paths(), vec!["/gears", "/jobs"]);

    let snapshot = sequencer.telemetry().snapshot();
    assert_eq!(snapshot.hook_timeouts, 1);
    assert_eq!(snapshot.requests_issued, 2);
    Ok(())
}
