use crate::hooks::context::RunContext;
use crate::hooks::state::RunState;
use anyhow::Error as AnyError;
use core::future::Future;
use core::pin::Pin;
use std::fmt;
use std::sync::Arc;

/// Future returned by a hook. Resolving is the hook's completion signal.
pub type HookFuture<'a> = Pin<Box<dyn Future<Output = Result<(), AnyError>> + Send + 'a>>;

/// Test-author code invoked by the sequencer at a lifecycle phase.
///
/// The sequencer awaits the returned future before touching the case again,
/// so a hook has exclusive access to the context and scratch state while it runs.
pub trait Hook: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut RunContext, state: &'a mut RunState) -> HookFuture<'a>;
}

/// Wraps a synchronous closure as a [`Hook`].
///
/// ```
/// use hookline::{hook_fn, HookRegistry};
///
/// let mut registry = HookRegistry::new();
/// registry.before_each(hook_fn(|ctx, _state| {
///     ctx.request.set_query("root", "true");
///     Ok(())
/// }));
/// ```
pub fn hook_fn<F>(f: F) -> impl Hook
where
    F: Fn(&mut RunContext, &mut RunState) -> Result<(), AnyError> + Send + Sync + 'static,
{
    SyncHook(f)
}

/// Wraps a closure returning a boxed future as a [`Hook`].
///
/// ```
/// use hookline::{async_hook_fn, HookRegistry};
///
/// let mut registry = HookRegistry::new();
/// registry
///     .after(
///         "GET /jobs -> 200",
///         async_hook_fn(|ctx, state| {
///             Box::pin(async move {
///                 let id = ctx.response()?.body_pointer("/0/_id").cloned();
///                 if let Some(id) = id {
///                     state.capture("job_id", id);
///                 }
///                 anyhow::Ok(())
///             })
///         }),
///     )
///     .unwrap()
///     .produces("job_id");
/// ```
pub fn async_hook_fn<F>(f: F) -> impl Hook
where
    F: for<'a> Fn(&'a mut RunContext, &'a mut RunState) -> HookFuture<'a> + Send + Sync + 'static,
{
    AsyncHook(f)
}

struct SyncHook<F>(F);

impl<F> Hook for SyncHook<F>
where
    F: Fn(&mut RunContext, &mut RunState) -> Result<(), AnyError> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut RunContext, state: &'a mut RunState) -> HookFuture<'a> {
        Box::pin(async move { (self.0)(ctx, state) })
    }
}

struct AsyncHook<F>(F);

impl<F> Hook for AsyncHook<F>
where
    F: for<'a> Fn(&'a mut RunContext, &'a mut RunState) -> HookFuture<'a> + Send + Sync + 'static,
{
    fn call<'a>(&'a self, ctx: &'a mut RunContext, state: &'a mut RunState) -> HookFuture<'a> {
        (self.0)(ctx, state)
    }
}

/// Registered hook plus the label used in logs and reports.
#[derive(Clone)]
pub struct HookHandle {
    label: Arc<str>,
    hook: Arc<dyn Hook>,
}

impl HookHandle {
    pub(crate) fn new(label: impl Into<Arc<str>>, hook: Arc<dyn Hook>) -> Self {
        Self {
            label: label.into(),
            hook,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn rename(&mut self, label: impl Into<Arc<str>>) {
        self.label = label.into();
    }

    pub(crate) fn call<'a>(
        &'a self,
        ctx: &'a mut RunContext,
        state: &'a mut RunState,
    ) -> HookFuture<'a> {
        self.hook.call(ctx, state)
    }
}

impl fmt::Debug for HookHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HookHandle").field(&self.label).finish()
    }
}
