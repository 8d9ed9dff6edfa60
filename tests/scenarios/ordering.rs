use crate::support::helpers::{init_tracing, key, EventLog, RecordingExecutor};
use anyhow::{anyhow, Result};
use hookline::{hook_fn, CaseFailure, ContractSuite, HookRegistry, Sequencer, SequencerConfig};
use http::StatusCode;
use serde_json::json;

fn logging_hook(log: &EventLog, label: &'static str) -> impl hookline::Hook {
    let log = log.clone();
    hook_fn(move |ctx, _state| {
        log.push(format!("{label} {}", ctx.case()));
        Ok(())
    })
}

#[tokio::test]
async fn phases_run_in_lifecycle_order_around_the_request() -> Result<()> {
    init_tracing();
    let log = EventLog::default();
    let mut registry = HookRegistry::new();
    registry.before_each(logging_hook(&log, "beforeEach"));
    registry.after_each(logging_hook(&log, "afterEach"));
    registry.before("GET /jobs -> 200", logging_hook(&log, "before"))?;
    registry.after("GET /jobs -> 200", logging_hook(&log, "after"))?;
    registry.skip("GET /users/self/avatar -> 307", "redirect")?;

    let suite = ContractSuite::from_keys([
        "GET /jobs -> 200",
        "GET /users/self/avatar -> 307",
        "GET /gears -> 200",
    ])?;
    let executor = RecordingExecutor::with_log(log.clone());
    let mut sequencer = Sequencer::new(SequencerConfig::default(), registry, suite, executor)?;

    let report = sequencer.run().await?;
    assert!(report.is_success());
    assert_eq!(
        log.events(),
        vec![
            "beforeEach GET /jobs -> 200",
            "before GET /jobs -> 200",
            "request GET /jobs -> 200",
            "after GET /jobs -> 200",
            "afterEach GET /jobs -> 200",
            "beforeEach GET /gears -> 200",
            "request GET /gears -> 200",
            "afterEach GET /gears -> 200",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn skipped_case_issues_no_request_and_runs_no_hooks() -> Result<()> {
    init_tracing();
    let log = EventLog::default();
    let mut registry = HookRegistry::new();
    registry.before_each(logging_hook(&log, "beforeEach"));
    registry.skip(
        "GET /users/self/avatar -> 307",
        "avatar redirects are not followed",
    )?;

    let suite = ContractSuite::from_keys(["GET /users/self/avatar -> 307"])?;
    let executor = RecordingExecutor::default();
    let mut sequencer =
        Sequencer::new(SequencerConfig::default(), registry, suite, executor.clone())?;

    let report = sequencer.run().await?;
    let case = report
        .case(&key("GET /users/self/avatar -> 307"))
        .expect("skipped case is reported");
    assert!(case.outcome.is_skipped());
    assert!(!case.request_issued());
    assert!(executor.requests().is_empty());
    assert!(log.events().is_empty());
    Ok(())
}

#[tokio::test]
async fn hooks_for_the_same_case_run_in_registration_order() -> Result<()> {
    init_tracing();
    let log = EventLog::default();
    let mut registry = HookRegistry::new();
    for label in ["first", "second", "third"] {
        registry.before("GET /jobs -> 200", logging_hook(&log, label))?;
    }

    let suite = ContractSuite::from_keys(["GET /jobs -> 200"])?;
    let mut sequencer = Sequencer::new(
        SequencerConfig::default(),
        registry,
        suite,
        RecordingExecutor::default(),
    )?;

    sequencer.run().await?;
    let first_run = log.events();
    sequencer.run().await?;
    let events = log.events();

    assert_eq!(
        first_run,
        vec![
            "first GET /jobs -> 200",
            "second GET /jobs -> 200",
            "third GET /jobs -> 200",
        ]
    );
    assert_eq!(&events[3..], first_run.as_slice());
    Ok(())
}

#[tokio::test]
async fn failing_case_does_not_prevent_the_next() -> Result<()> {
    init_tracing();
    let mut registry = HookRegistry::new();
    registry
        .after(
            "GET /jobs -> 200",
            hook_fn(|_ctx, _state| Err(anyhow!("listing was empty"))),
        )?
        .named("inspect listing");

    let suite = ContractSuite::from_keys(["GET /jobs -> 200", "GET /gears -> 200"])?;
    let executor = RecordingExecutor::default().respond_with_status(
        "GET /gears -> 200",
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"message": "boom"}),
    );
    let mut sequencer =
        Sequencer::new(SequencerConfig::default(), registry, suite, executor.clone())?;

    let report = sequencer.run().await?;
    assert_eq!(report.failed(), 2);
    assert_eq!(executor.paths(), vec!["/jobs", "/gears"]);

    let jobs = report.case(&key("GET /jobs -> 200")).expect("jobs case");
    match &jobs.outcome.failures()[0] {
        CaseFailure::Hook(err) => assert_eq!(err.hook(), "inspect listing"),
        other => panic!("unexpected failure {other}"),
    }

    let gears = report.case(&key("GET /gears -> 200")).expect("gears case");
    assert_eq!(gears.response_status, Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(
        gears.outcome.failures()[0].to_string(),
        "expected status 200, got 500"
    );
    Ok(())
}

#[tokio::test]
async fn panicking_hook_fails_only_its_case() -> Result<()> {
    init_tracing();
    let mut registry = HookRegistry::new();
    registry.before(
        "GET /jobs -> 200",
        hook_fn(|_ctx, _state| panic!("fixture missing")),
    )?;

    let suite = ContractSuite::from_keys(["GET /jobs -> 200", "GET /gears -> 200"])?;
    let executor = RecordingExecutor::default();
    let mut sequencer =
        Sequencer::new(SequencerConfig::default(), registry, suite, executor.clone())?;

    let report = sequencer.run().await?;
    assert_eq!(report.failed(), 1);
    assert_eq!(report.passed(), 1);
    assert_eq!(executor.paths(), vec!["/gears"]);
    assert!(report.cases()[0].outcome.failures()[0]
        .to_string()
        .contains("fixture missing"));
    Ok(())
}
