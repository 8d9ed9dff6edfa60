//! Ordered list of contract test cases, as enumerated from an API description.
//!
//! The suite order is the execution order. Hooks never reorder cases; scratch
//! dependencies between cases are only valid when they agree with this order.

use crate::hooks::context::RequestSpec;
use crate::hooks::key::{IntoCaseKey, TestCaseKey};
use crate::runtime::error::{CaseKeyError, SuiteError};
use anyhow::{Context, Result};
use http::{Method, StatusCode};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// One contract test case plus the request values the description supplies statically.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawContractCase")]
pub struct ContractCase {
    key: TestCaseKey,
    defaults: RequestSpec,
}

impl ContractCase {
    pub fn new(key: TestCaseKey) -> Self {
        Self {
            key,
            defaults: RequestSpec::default(),
        }
    }

    pub fn with_defaults(mut self, defaults: RequestSpec) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn key(&self) -> &TestCaseKey {
        &self.key
    }

    /// Request values every invocation of this case starts from.
    pub fn defaults(&self) -> &RequestSpec {
        &self.defaults
    }
}

#[derive(Deserialize)]
struct RawContractCase {
    method: String,
    path: String,
    status: u16,
    #[serde(flatten)]
    request: RequestSpec,
}

impl TryFrom<RawContractCase> for ContractCase {
    type Error = CaseKeyError;

    fn try_from(raw: RawContractCase) -> Result<Self, Self::Error> {
        let rendered = format!("{} {} -> {}", raw.method, raw.path, raw.status);
        let method = Method::from_bytes(raw.method.as_bytes())
            .map_err(|_| CaseKeyError::new(&rendered, "invalid HTTP method"))?;
        let status = StatusCode::from_u16(raw.status)
            .map_err(|_| CaseKeyError::new(&rendered, "invalid status code"))?;
        let key = TestCaseKey::new(method, raw.path, status)?;
        Ok(Self {
            key,
            defaults: raw.request,
        })
    }
}

#[derive(Deserialize)]
struct RawSuite {
    cases: Vec<ContractCase>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractSuite {
    cases: Vec<ContractCase>,
}

impl ContractSuite {
    pub fn new(cases: Vec<ContractCase>) -> Result<Self, SuiteError> {
        if cases.is_empty() {
            return Err(SuiteError::Empty);
        }

        let mut seen = HashSet::with_capacity(cases.len());
        for case in &cases {
            if !seen.insert(case.key()) {
                return Err(SuiteError::DuplicateCase(case.key().clone()));
            }
        }

        Ok(Self { cases })
    }

    /// Builds a suite of cases without static request values.
    pub fn from_keys<I, K>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        K: IntoCaseKey,
    {
        let cases = keys
            .into_iter()
            .map(|key| key.into_case_key().map(ContractCase::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(cases)?)
    }

    /// Parses `{"cases": [...]}`. Each case carries `method`, `path` and `status`,
    /// plus optional `query`, `params`, `headers` and `body` defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawSuite = serde_json::from_str(json).context("failed to parse contract suite")?;
        Ok(Self::new(raw.cases)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read contract suite {}", path.display()))?;
        Self::from_json_str(&json)
            .with_context(|| format!("invalid contract suite {}", path.display()))
    }

    pub fn cases(&self) -> &[ContractCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Execution position of `key`, if the suite contains it.
    pub fn position(&self, key: &TestCaseKey) -> Option<usize> {
        self.cases.iter().position(|case| case.key() == key)
    }
}
