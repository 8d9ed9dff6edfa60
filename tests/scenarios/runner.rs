use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::support::helpers::{init_tracing, RecordingExecutor};
use anyhow::Result;
use hookline::{hook_fn, ContractSuite, HookRegistry, Runner, SequencerConfig};
use tokio::time::timeout;

fn suite() -> Result<ContractSuite> {
    ContractSuite::from_keys([
        "GET /jobs -> 200",
        "GET /gears -> 200",
        "GET /users -> 200",
    ])
}

#[tokio::test]
async fn cancelled_token_interrupts_run_and_is_replaced_for_the_next() -> Result<()> {
    init_tracing();
    let cancel_slot: Arc<std::sync::Mutex<Option<tokio_util::sync::CancellationToken>>> =
        Arc::default();
    let fired = Arc::new(AtomicBool::new(false));

    let mut registry = HookRegistry::new();
    {
        let cancel_slot = cancel_slot.clone();
        let fired = fired.clone();
        registry.before(
            "GET /gears -> 200",
            hook_fn(move |_ctx, _state| {
                if !fired.swap(true, Ordering::SeqCst) {
                    if let Some(token) = cancel_slot.lock().unwrap().as_ref() {
                        token.cancel();
                    }
                }
                Ok(())
            }),
        )?;
    }

    let executor = RecordingExecutor::default();
    let mut runner = Runner::new(
        SequencerConfig::default(),
        registry,
        suite()?,
        executor.clone(),
    )?;
    *cancel_slot.lock().unwrap() = Some(runner.cancellation_token());

    let report = runner.run().await?;
    assert!(report.interrupted());
    assert!(!report.is_success());
    assert_eq!(report.cases().len(), 1);
    assert_eq!(executor.paths(), vec!["/jobs"]);
    assert!(runner.cancellation_token().is_cancelled());

    let report = runner.run().await?;
    assert!(!report.interrupted());
    assert_eq!(report.passed(), 3);
    assert!(!runner.cancellation_token().is_cancelled());
    Ok(())
}

#[tokio::test]
async fn run_until_ctrl_c_completes_without_a_signal() -> Result<()> {
    init_tracing();
    let executor = RecordingExecutor::default();
    let mut runner = Runner::new(
        SequencerConfig::default(),
        HookRegistry::new(),
        suite()?,
        executor.clone(),
    )?;

    let report = timeout(Duration::from_secs(5), runner.run_until_ctrl_c()).await??;
    assert!(report.is_success());
    assert_eq!(executor.paths(), vec!["/jobs", "/gears", "/users"]);
    assert_eq!(runner.sequencer().last_completed_position(), Some(2));
    Ok(())
}
