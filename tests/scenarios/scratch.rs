use crate::support::helpers::{init_tracing, key, RecordingExecutor};
use anyhow::{Context, Result};
use hookline::{hook_fn, ContractSuite, HookRegistry, Sequencer, SequencerConfig, SetupError};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn register_job_capture(registry: &mut HookRegistry) -> Result<()> {
    registry
        .after(
            "GET /jobs -> 200",
            hook_fn(|ctx, state| {
                let id = ctx
                    .response()?
                    .body_pointer("/0/_id")
                    .cloned()
                    .context("no job listed")?;
                state.capture("job_id", id);
                Ok(())
            }),
        )?
        .produces("job_id");
    Ok(())
}

fn register_job_injection(registry: &mut HookRegistry, case: &str) -> Result<()> {
    registry
        .before(
            case,
            hook_fn(|ctx, state| {
                let id = state.resolve_string("job_id");
                ctx.request.set_param("JobId", id);
                Ok(())
            }),
        )?
        .requires("job_id");
    Ok(())
}

#[tokio::test]
async fn captured_job_id_reaches_later_case() -> Result<()> {
    init_tracing();
    let mut registry = HookRegistry::new();
    register_job_capture(&mut registry)?;
    register_job_injection(&mut registry, "GET /jobs/{JobId} -> 200")?;

    let suite = ContractSuite::from_keys(["GET /jobs -> 200", "GET /jobs/{JobId} -> 200"])?;
    let executor = RecordingExecutor::default()
        .respond("GET /jobs -> 200", json!([{"_id": "abc123", "state": "pending"}]));
    let mut sequencer =
        Sequencer::new(SequencerConfig::default(), registry, suite, executor.clone())?;

    let report = sequencer.run().await?;
    assert!(report.is_success());
    assert_eq!(report.unresolved().count(), 0);

    let request = executor
        .request_for("GET /jobs/{JobId} -> 200")
        .context("job detail request was issued")?;
    assert_eq!(request.path, "/jobs/abc123");
    assert_eq!(sequencer.state().peek("job_id"), Some(&json!("abc123")));
    Ok(())
}

#[tokio::test]
async fn consumer_ahead_of_producer_is_rejected_at_setup() -> Result<()> {
    init_tracing();
    let mut registry = HookRegistry::new();
    register_job_capture(&mut registry)?;
    register_job_injection(&mut registry, "GET /jobs/{JobId} -> 200")?;

    let suite = ContractSuite::from_keys(["GET /jobs/{JobId} -> 200", "GET /jobs -> 200"])?;
    let result = Sequencer::new(
        SequencerConfig::default(),
        registry,
        suite,
        RecordingExecutor::default(),
    );

    match result {
        Err(SetupError::ProducerOutOfOrder {
            slot,
            producer_case,
            ..
        }) => {
            assert_eq!(slot, "job_id");
            assert_eq!(producer_case, key("GET /jobs -> 200"));
        }
        Err(other) => panic!("unexpected setup error {other}"),
        Ok(_) => panic!("out-of-order dependency should be rejected"),
    }
    Ok(())
}

#[tokio::test]
async fn unset_read_is_reported_when_validation_is_disabled() -> Result<()> {
    init_tracing();
    let mut registry = HookRegistry::new();
    register_job_injection(&mut registry, "GET /jobs/{JobId} -> 200")?;

    let config = SequencerConfig::builder()
        .validate_dependencies(false)
        .assert_status(false)
        .build()?;
    let suite = ContractSuite::from_keys(["GET /jobs/{JobId} -> 200"])?;
    let executor = RecordingExecutor::default();
    let mut sequencer = Sequencer::new(config, registry, suite, executor.clone())?;
    assert_eq!(sequencer.plan().warnings().len(), 1);

    let report = sequencer.run().await?;
    let unresolved: Vec<_> = report.unresolved().collect();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].slot, "job_id");
    assert_eq!(
        unresolved[0].case.as_ref(),
        Some(&key("GET /jobs/{JobId} -> 200"))
    );
    assert_eq!(executor.paths(), vec!["/jobs/"]);
    assert_eq!(sequencer.telemetry().unresolved_reads(), 1);
    Ok(())
}

#[tokio::test]
async fn scratch_is_reset_between_runs() -> Result<()> {
    init_tracing();
    let captured_once = Arc::new(AtomicBool::new(false));
    let flag = captured_once.clone();
    let mut registry = HookRegistry::new();
    registry
        .after(
            "GET /jobs -> 200",
            hook_fn(move |_ctx, state| {
                if !flag.swap(true, Ordering::SeqCst) {
                    state.capture("job_id", "j-1");
                }
                Ok(())
            }),
        )?
        .produces("job_id");

    let suite = ContractSuite::from_keys(["GET /jobs -> 200"])?;
    let mut sequencer = Sequencer::new(
        SequencerConfig::default(),
        registry,
        suite,
        RecordingExecutor::default(),
    )?;

    sequencer.run().await?;
    assert_eq!(sequencer.state().peek("job_id"), Some(&json!("j-1")));

    sequencer.run().await?;
    assert!(captured_once.load(Ordering::SeqCst));
    assert!(!sequencer.state().is_set("job_id"));
    Ok(())
}
