use crate::runtime::error::CaseKeyError;
use http::{Method, StatusCode};
use std::fmt;
use std::str::FromStr;

const STATUS_SEPARATOR: &str = " -> ";

/// Identifies one contract test case: `"<METHOD> <path-template> -> <status>"`.
///
/// Keys must match the runner's enumeration exactly, placeholder spelling
/// included, so equality is plain structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestCaseKey {
    method: Method,
    path: String,
    status: StatusCode,
}

impl TestCaseKey {
    pub fn new(
        method: Method,
        path: impl Into<String>,
        status: StatusCode,
    ) -> Result<Self, CaseKeyError> {
        let path = path.into();
        let rendered = format!("{method} {path}{STATUS_SEPARATOR}{}", status.as_u16());
        validate_method(method.as_str(), &rendered)?;
        if !(100..=599).contains(&status.as_u16()) {
            return Err(CaseKeyError::new(&rendered, "status must be within 100..=599"));
        }
        validate_path(&path, &rendered)?;
        Ok(Self {
            method,
            path,
            status,
        })
    }

    pub fn parse(input: &str) -> Result<Self, CaseKeyError> {
        let (request, status) = input
            .rsplit_once(STATUS_SEPARATOR)
            .ok_or_else(|| CaseKeyError::new(input, "missing ` -> <status>` suffix"))?;

        let status = parse_status(status, input)?;

        let (method, path) = request
            .split_once(' ')
            .ok_or_else(|| CaseKeyError::new(input, "expected `<METHOD> <path>`"))?;

        validate_method(method, input)?;
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| CaseKeyError::new(input, "invalid HTTP method"))?;

        validate_path(path, input)?;

        Ok(Self {
            method,
            path: path.to_owned(),
            status,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path template exactly as declared, placeholders included.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Placeholder names in order of appearance, e.g. `["JobId"]` for `/jobs/{JobId}`.
    pub fn placeholders(&self) -> Vec<&str> {
        placeholder_spans(&self.path)
            .map(|(start, end)| &self.path[start + 1..end])
            .collect()
    }
}

impl fmt::Display for TestCaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}{STATUS_SEPARATOR}{}",
            self.method,
            self.path,
            self.status.as_u16()
        )
    }
}

impl FromStr for TestCaseKey {
    type Err = CaseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Conversion accepted wherever a case key is expected during registration.
pub trait IntoCaseKey {
    fn into_case_key(self) -> Result<TestCaseKey, CaseKeyError>;
}

impl IntoCaseKey for TestCaseKey {
    fn into_case_key(self) -> Result<TestCaseKey, CaseKeyError> {
        Ok(self)
    }
}

impl IntoCaseKey for &TestCaseKey {
    fn into_case_key(self) -> Result<TestCaseKey, CaseKeyError> {
        Ok(self.clone())
    }
}

impl IntoCaseKey for &str {
    fn into_case_key(self) -> Result<TestCaseKey, CaseKeyError> {
        TestCaseKey::parse(self)
    }
}

impl IntoCaseKey for String {
    fn into_case_key(self) -> Result<TestCaseKey, CaseKeyError> {
        TestCaseKey::parse(&self)
    }
}

fn parse_status(raw: &str, input: &str) -> Result<StatusCode, CaseKeyError> {
    if raw.len() != 3 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CaseKeyError::new(input, "status must be a three-digit code"));
    }
    let code: u16 = raw
        .parse()
        .map_err(|_| CaseKeyError::new(input, "status must be a three-digit code"))?;
    if !(100..=599).contains(&code) {
        return Err(CaseKeyError::new(input, "status must be within 100..=599"));
    }
    StatusCode::from_u16(code).map_err(|_| CaseKeyError::new(input, "invalid status code"))
}

fn validate_method(method: &str, input: &str) -> Result<(), CaseKeyError> {
    if method.is_empty() || !method.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(CaseKeyError::new(input, "method must be an upper-case HTTP verb"));
    }
    Ok(())
}

fn validate_path(path: &str, input: &str) -> Result<(), CaseKeyError> {
    if !path.starts_with('/') {
        return Err(CaseKeyError::new(input, "path template must start with `/`"));
    }
    if path.chars().any(char::is_whitespace) {
        return Err(CaseKeyError::new(input, "path template must not contain whitespace"));
    }

    let mut open = false;
    let mut name_len = 0usize;
    for ch in path.chars() {
        match (ch, open) {
            ('{', false) => {
                open = true;
                name_len = 0;
            }
            ('}', true) => {
                if name_len == 0 {
                    return Err(CaseKeyError::new(input, "empty path placeholder"));
                }
                open = false;
            }
            ('{', true) => return Err(CaseKeyError::new(input, "nested path placeholder")),
            ('}', false) => return Err(CaseKeyError::new(input, "unbalanced `}` in path")),
            (_, true) => name_len += 1,
            (_, false) => {}
        }
    }
    if open {
        return Err(CaseKeyError::new(input, "unterminated path placeholder"));
    }
    Ok(())
}

/// Byte spans `(open, close)` of each `{Name}` placeholder in a validated template.
pub(crate) fn placeholder_spans(path: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    let mut cursor = 0;
    std::iter::from_fn(move || {
        let start = cursor + path[cursor..].find('{')?;
        let end = start + path[start..].find('}')?;
        cursor = end + 1;
        Some((start, end))
    })
}
