use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use hookline::{
    CaseExecutor, ContractCase, ExecutorFuture, PreparedRequest, ResponseSnapshot, TestCaseKey,
};
use http::StatusCode;
use once_cell::sync::Lazy;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

pub fn key(input: &str) -> TestCaseKey {
    TestCaseKey::parse(input).expect("test case key should parse")
}

/// Ordered record of what happened during a run, shared by hooks and the executor.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct Recorded {
    requests: Vec<(TestCaseKey, PreparedRequest)>,
    responses: HashMap<TestCaseKey, (StatusCode, Value)>,
}

/// Executor answering with canned bodies and recording every request it receives.
///
/// Unless configured otherwise a case is answered with the status its key expects.
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    inner: Arc<Mutex<Recorded>>,
    log: Option<EventLog>,
}

impl RecordingExecutor {
    pub fn with_log(log: EventLog) -> Self {
        Self {
            inner: Arc::default(),
            log: Some(log),
        }
    }

    pub fn respond(self, case: &str, body: Value) -> Self {
        let case = key(case);
        let status = case.status();
        self.respond_with_status(&case.to_string(), status, body)
    }

    pub fn respond_with_status(self, case: &str, status: StatusCode, body: Value) -> Self {
        self.inner
            .lock()
            .unwrap()
            .responses
            .insert(key(case), (status, body));
        self
    }

    pub fn requests(&self) -> Vec<PreparedRequest> {
        self.inner
            .lock()
            .unwrap()
            .requests
            .iter()
            .map(|(_, request)| request.clone())
            .collect()
    }

    pub fn request_for(&self, case: &str) -> Option<PreparedRequest> {
        let case = key(case);
        self.inner
            .lock()
            .unwrap()
            .requests
            .iter()
            .find(|(key, _)| key == &case)
            .map(|(_, request)| request.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| request.path)
            .collect()
    }
}

impl CaseExecutor for RecordingExecutor {
    fn execute<'a>(
        &'a mut self,
        case: &'a ContractCase,
        request: &'a PreparedRequest,
    ) -> ExecutorFuture<'a> {
        Box::pin(async move {
            if let Some(log) = &self.log {
                log.push(format!("request {}", case.key()));
            }

            let mut recorded = self.inner.lock().unwrap();
            recorded.requests.push((case.key().clone(), request.clone()));
            let (status, body) = recorded
                .responses
                .get(case.key())
                .cloned()
                .unwrap_or((case.key().status(), Value::Null));

            Ok(ResponseSnapshot::new(status).with_body(body))
        })
    }
}
