use crate::hooks::context::RunContext;
use crate::hooks::hook::HookHandle;
use crate::hooks::phase::HookPhase;
use crate::hooks::state::RunState;
use crate::runtime::error::{HookError, HookErrorKind};
use anyhow::anyhow;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Outcome of a hook that can be interrupted by run cancellation.
pub(crate) enum HookDecision<T> {
    Finished(Result<T, HookError>),
    Cancelled,
}

/// Runs one hook to completion, bounded by `limit`, converting panics into errors.
pub(crate) async fn invoke_hook(
    hook: &HookHandle,
    phase: HookPhase,
    ctx: &mut RunContext,
    state: &mut RunState,
    limit: Duration,
    cancel: &CancellationToken,
) -> HookDecision<()> {
    let case = ctx.case().clone();
    let call = AssertUnwindSafe(hook.call(ctx, state)).catch_unwind();

    tokio::select! {
        biased;
        _ = cancel.cancelled() => HookDecision::Cancelled,
        outcome = tokio::time::timeout(limit, call) => {
            let failure = |kind, source| {
                let error = HookError::new(phase, hook.label(), case.clone(), kind, source);
                HookDecision::Finished(Err(error))
            };
            match outcome {
                Ok(Ok(Ok(()))) => HookDecision::Finished(Ok(())),
                Ok(Ok(Err(err))) => failure(HookErrorKind::Failed, err),
                Ok(Err(panic_payload)) => {
                    let message = panic_message(panic_payload.as_ref());
                    failure(HookErrorKind::Panicked, anyhow!("{message}"))
                }
                Err(_) => failure(
                    HookErrorKind::Timeout(limit),
                    anyhow!("hook did not resolve within {limit:?}"),
                ),
            }
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
