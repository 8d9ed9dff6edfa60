use crate::support::helpers::{init_tracing, RecordingExecutor};
use anyhow::{Context, Result};
use hookline::suites::scitran;
use hookline::{HookRegistry, Sequencer, SequencerConfig};
use serde_json::json;

fn executor() -> RecordingExecutor {
    RecordingExecutor::default()
        .respond(
            "GET /jobs -> 200",
            json!([{"_id": "abc123", "state": "pending"}, {"_id": "def456"}]),
        )
        .respond("GET /gears -> 200", json!([{"name": "dcm2niix"}]))
}

#[tokio::test]
async fn scitran_hooks_drive_the_bundled_suite() -> Result<()> {
    init_tracing();
    let mut registry = HookRegistry::new();
    scitran::register(&mut registry)?;
    let config = SequencerConfig::builder().strict_keys(true).build()?;
    let executor = executor();
    let mut sequencer = Sequencer::new(
        config,
        registry,
        scitran::contract_suite()?,
        executor.clone(),
    )?;

    let report = sequencer.run().await?;
    assert!(report.is_success(), "unexpected failures: {report:?}");
    assert_eq!(report.skipped(), 7);
    assert_eq!(report.passed(), 12);
    assert_eq!(report.requests_issued(), 12);
    assert_eq!(report.unresolved().count(), 0);

    let paths = executor.paths();
    assert!(paths.iter().all(|path| !path.contains("avatar")));
    assert!(paths.iter().all(|path| !path.starts_with("/upload")));
    assert_eq!(
        paths.iter().filter(|path| path.starts_with("/jobs/abc123")).count(),
        3
    );
    assert!(paths.contains(&"/jobs/57ace4479e512c61bc6e006f".to_string()));
    assert!(paths.contains(&"/users/jane.doe@gmail.com".to_string()));

    let retry = executor
        .request_for("POST /jobs/{JobId}/retry -> 200")
        .context("retry request")?;
    assert_eq!(retry.path, "/jobs/abc123/retry");

    let gear = executor
        .request_for("POST /gears/{GearName} -> 200")
        .context("gear request")?;
    assert_eq!(gear.path, "/gears/dcm2niix");
    assert_eq!(gear.query.get("user").map(String::as_str), Some("admin@user.com"));
    assert_eq!(gear.query.get("root").map(String::as_str), Some("true"));

    let download = executor
        .request_for("GET /download -> 404")
        .context("download request")?;
    assert_eq!(download.query.len(), 1);
    assert_eq!(download.query.get("ticket").map(String::as_str), Some("1234"));
    Ok(())
}

#[tokio::test]
async fn empty_job_listing_fails_capture_and_leaves_consumers_unresolved() -> Result<()> {
    init_tracing();
    let mut registry = HookRegistry::new();
    scitran::register(&mut registry)?;
    let executor = RecordingExecutor::default()
        .respond("GET /jobs -> 200", json!([]))
        .respond("GET /gears -> 200", json!([{"name": "dcm2niix"}]));
    let mut sequencer = Sequencer::new(
        SequencerConfig::default(),
        registry,
        scitran::contract_suite()?,
        executor.clone(),
    )?;

    let report = sequencer.run().await?;
    let listing = report
        .cases()
        .iter()
        .find(|case| case.key.to_string() == "GET /jobs -> 200")
        .context("listing case")?;
    assert!(listing.outcome.failures()[0]
        .to_string()
        .contains("job listing returned no job id"));

    let job_reads: Vec<_> = report
        .unresolved()
        .filter(|reference| reference.slot == scitran::JOB_ID_SLOT)
        .collect();
    assert_eq!(job_reads.len(), 3);
    assert!(executor.paths().contains(&"/jobs/".to_string()));
    Ok(())
}
