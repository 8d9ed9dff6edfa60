//! Run-scoped resources for one `Sequencer::run` call.

use crate::runtime::fatal::FatalErrorHandler;
use crate::runtime::progress::ProgressTracker;
use crate::runtime::telemetry::{self, Telemetry};
use anyhow::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub(crate) struct LifecycleHandles {
    pub run_token: CancellationToken,
    fatal_handler: FatalErrorHandler,
    reporter_handle: Option<JoinHandle<()>>,
}

pub(crate) struct LifecycleSpawnParams<'a> {
    pub shutdown_root: &'a CancellationToken,
    pub telemetry: Arc<Telemetry>,
    pub progress: Arc<ProgressTracker>,
    pub metrics_interval: Duration,
}

impl LifecycleHandles {
    pub(crate) fn spawn(params: LifecycleSpawnParams<'_>) -> Self {
        let LifecycleSpawnParams {
            shutdown_root,
            telemetry,
            progress,
            metrics_interval,
        } = params;

        let run_token = shutdown_root.child_token();
        let fatal_handler = FatalErrorHandler::new(run_token.clone());
        let reporter_handle = telemetry::spawn_progress_reporter(
            telemetry,
            progress,
            run_token.clone(),
            metrics_interval,
        );

        Self {
            run_token,
            fatal_handler,
            reporter_handle: Some(reporter_handle),
        }
    }

    pub(crate) fn fatal_handler(&self) -> &FatalErrorHandler {
        &self.fatal_handler
    }

    pub(crate) fn error(&self) -> Option<Error> {
        self.fatal_handler.error()
    }

    /// Stops the reporter. The run token is cancelled here so the reporter
    /// exits even when the run finished normally.
    pub(crate) async fn shutdown(mut self) {
        self.run_token.cancel();

        if let Some(handle) = self.reporter_handle.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "progress reporter task panicked");
            }
        }
    }
}
