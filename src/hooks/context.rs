//! Per-case mutable context handed to hooks, plus the request the executor
//! receives once every placeholder has been resolved.

use crate::hooks::key::{placeholder_spans, TestCaseKey};
use anyhow::{anyhow, Result};
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Request parts hooks may rewrite before the executor issues the call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
}

impl RequestSpec {
    pub fn set_query(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Substitutes `{Name}` placeholders of the case path with `params`.
    ///
    /// Returns the name of the first placeholder without a value.
    pub(crate) fn prepare(&self, case: &TestCaseKey) -> Result<PreparedRequest, String> {
        let template = case.path();
        let mut path = String::with_capacity(template.len());
        let mut cursor = 0;

        for (start, end) in placeholder_spans(template) {
            let name = &template[start + 1..end];
            let value = self.params.get(name).ok_or_else(|| name.to_owned())?;
            path.push_str(&template[cursor..start]);
            path.push_str(value);
            cursor = end + 1;
        }
        path.push_str(&template[cursor..]);

        Ok(PreparedRequest {
            method: case.method().clone(),
            path,
            query: self.query.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        })
    }
}

/// Response observed for the current case.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
    pub status: StatusCode,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl ResponseSnapshot {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Value::Null,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Looks up a value in the body by JSON pointer, e.g. `/0/_id`.
    pub fn body_pointer(&self, pointer: &str) -> Option<&Value> {
        self.body.pointer(pointer)
    }
}

/// Fully resolved request handed to the [`CaseExecutor`](crate::CaseExecutor).
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

/// Mutable state for one case invocation; discarded once the case completes.
#[derive(Debug, Clone)]
pub struct RunContext {
    case: TestCaseKey,
    pub request: RequestSpec,
    pub response: Option<ResponseSnapshot>,
}

impl RunContext {
    pub(crate) fn new(case: TestCaseKey, request: RequestSpec) -> Self {
        Self {
            case,
            request,
            response: None,
        }
    }

    pub fn case(&self) -> &TestCaseKey {
        &self.case
    }

    /// Response of the current case. Only available to after-phase hooks.
    pub fn response(&self) -> Result<&ResponseSnapshot> {
        self.response
            .as_ref()
            .ok_or_else(|| anyhow!("no response recorded yet for {}", self.case))
    }
}
