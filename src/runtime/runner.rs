use crate::hooks::registry::HookRegistry;
use crate::runtime::config::SequencerConfig;
use crate::runtime::error::SetupError;
use crate::runtime::executor::CaseExecutor;
use crate::runtime::report::RunReport;
use crate::runtime::sequencer::Sequencer;
use crate::suite::ContractSuite;
use anyhow::Result;
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Owns a [`Sequencer`] and interrupts its run on Ctrl-C.
pub struct Runner<E: CaseExecutor> {
    sequencer: Sequencer<E>,
    shutdown: CancellationToken,
}

impl<E: CaseExecutor> Runner<E> {
    /// Creates a new runner and wires a root [`CancellationToken`] that propagates
    /// into every hook and executor call of a run.
    pub fn new(
        config: SequencerConfig,
        registry: HookRegistry,
        suite: ContractSuite,
        executor: E,
    ) -> Result<Self, SetupError> {
        let shutdown = CancellationToken::new();
        let sequencer = Sequencer::with_cancellation_token(
            config,
            registry,
            suite,
            executor,
            shutdown.clone(),
        )?;
        Ok(Self {
            sequencer,
            shutdown,
        })
    }

    /// Returns a clone of the root shutdown token so external callers can integrate
    /// with their own signal handlers or cancellation strategies.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn sequencer(&self) -> &Sequencer<E> {
        &self.sequencer
    }

    pub fn sequencer_mut(&mut self) -> &mut Sequencer<E> {
        &mut self.sequencer
    }

    /// Runs the suite once. A token cancelled by a previous run is replaced first.
    pub async fn run(&mut self) -> Result<&RunReport> {
        self.refresh_shutdown_token();
        self.sequencer.run().await
    }

    /// Runs the suite, cancelling it when a Ctrl-C (SIGINT) arrives.
    ///
    /// An interrupted run still returns its report, with
    /// [`RunReport::interrupted`] set.
    pub async fn run_until_ctrl_c(&mut self) -> Result<&RunReport> {
        self.refresh_shutdown_token();
        tracing::info!("runner started; Ctrl-C (SIGINT) interrupts the contract run");

        let token = self.shutdown.clone();
        let listener = tokio::spawn(async move {
            tokio::select! {
                result = signal::ctrl_c() => match result {
                    Ok(()) => {
                        tracing::info!("Ctrl-C received; interrupting contract run");
                        token.cancel();
                    }
                    Err(err) => tracing::warn!(error = %err, "failed to listen for Ctrl-C"),
                },
                _ = token.cancelled() => {}
            }
        });

        let result = self.sequencer.run().await;
        listener.abort();
        result
    }

    fn refresh_shutdown_token(&mut self) {
        if !self.shutdown.is_cancelled() {
            return;
        }
        tracing::debug!("replacing cancelled runner shutdown token");
        self.shutdown = CancellationToken::new();
        self.sequencer.replace_shutdown_root(self.shutdown.clone());
    }
}
