use crate::hooks::context::{PreparedRequest, ResponseSnapshot};
use crate::suite::ContractCase;
use anyhow::Result;
use futures::future::BoxFuture;

pub type ExecutorFuture<'a> = BoxFuture<'a, Result<ResponseSnapshot>>;

/// Issues the HTTP request of a contract case against the API under test.
///
/// Implemented by the embedding test runner. The sequencer calls it at most
/// once per executed case, after every before-phase hook has completed, and
/// awaits it before any after-phase hook runs.
pub trait CaseExecutor: Send + 'static {
    fn execute<'a>(
        &'a mut self,
        case: &'a ContractCase,
        request: &'a PreparedRequest,
    ) -> ExecutorFuture<'a>;
}

impl<E: CaseExecutor + ?Sized> CaseExecutor for Box<E> {
    fn execute<'a>(
        &'a mut self,
        case: &'a ContractCase,
        request: &'a PreparedRequest,
    ) -> ExecutorFuture<'a> {
        (**self).execute(case, request)
    }
}
