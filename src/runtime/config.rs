use crate::runtime::telemetry;
use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_HOOK_TIMEOUT_SECS: u64 = 30;

pub const ENV_HOOK_TIMEOUT_SECS: &str = "HOOKLINE_HOOK_TIMEOUT_SECS";
pub const ENV_TIMEOUT_POLICY: &str = "HOOKLINE_TIMEOUT_POLICY";
pub const ENV_STRICT_KEYS: &str = "HOOKLINE_STRICT_KEYS";
pub const ENV_VALIDATE_DEPENDENCIES: &str = "HOOKLINE_VALIDATE_DEPENDENCIES";
pub const ENV_ASSERT_STATUS: &str = "HOOKLINE_ASSERT_STATUS";
pub const ENV_METRICS_INTERVAL_SECS: &str = "HOOKLINE_METRICS_INTERVAL_SECS";

/// What happens when a hook does not complete within the hook timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// The run is aborted; no further cases are scheduled.
    #[default]
    AbortRun,
    /// Only the owning case fails; the run continues with the next case.
    FailCase,
}

impl FromStr for TimeoutPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" | "abort-run" => Ok(TimeoutPolicy::AbortRun),
            "fail-case" | "fail" => Ok(TimeoutPolicy::FailCase),
            other => bail!("unknown timeout policy {other:?}; expected `abort` or `fail-case`"),
        }
    }
}

/// Runtime configuration for the hook sequencer.
///
/// All instances must be constructed via [`SequencerConfig::builder`],
/// [`SequencerConfig::new`], or [`SequencerConfig::from_env`] so invariants
/// are validated before any consumer observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerConfig {
    hook_timeout: Duration,
    timeout_policy: TimeoutPolicy,
    strict_keys: bool,
    validate_dependencies: bool,
    assert_status: bool,
    metrics_interval: Duration,
}

pub struct SequencerConfigParams {
    pub hook_timeout: Duration,
    pub timeout_policy: TimeoutPolicy,
    pub strict_keys: bool,
    pub validate_dependencies: bool,
    pub assert_status: bool,
    pub metrics_interval: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            hook_timeout: Duration::from_secs(DEFAULT_HOOK_TIMEOUT_SECS),
            timeout_policy: TimeoutPolicy::default(),
            strict_keys: false,
            validate_dependencies: true,
            assert_status: true,
            metrics_interval: telemetry::DEFAULT_METRICS_INTERVAL,
        }
    }
}

impl SequencerConfig {
    /// Returns a builder where every value starts at its default.
    pub fn builder() -> SequencerConfigBuilder {
        SequencerConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    pub fn new(params: SequencerConfigParams) -> Result<Self> {
        let SequencerConfigParams {
            hook_timeout,
            timeout_policy,
            strict_keys,
            validate_dependencies,
            assert_status,
            metrics_interval,
        } = params;

        let config = Self {
            hook_timeout,
            timeout_policy,
            strict_keys,
            validate_dependencies,
            assert_status,
            metrics_interval,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reads `HOOKLINE_*` variables, using defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(secs) = parse_var::<u64>(&lookup, ENV_HOOK_TIMEOUT_SECS)? {
            builder = builder.hook_timeout(Duration::from_secs(secs));
        }
        if let Some(policy) = parse_var::<TimeoutPolicy>(&lookup, ENV_TIMEOUT_POLICY)? {
            builder = builder.timeout_policy(policy);
        }
        if let Some(strict) = parse_flag(&lookup, ENV_STRICT_KEYS)? {
            builder = builder.strict_keys(strict);
        }
        if let Some(validate) = parse_flag(&lookup, ENV_VALIDATE_DEPENDENCIES)? {
            builder = builder.validate_dependencies(validate);
        }
        if let Some(assert) = parse_flag(&lookup, ENV_ASSERT_STATUS)? {
            builder = builder.assert_status(assert);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, ENV_METRICS_INTERVAL_SECS)? {
            builder = builder.metrics_interval(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Upper bound on a single hook invocation.
    pub fn hook_timeout(&self) -> Duration {
        self.hook_timeout
    }

    pub fn timeout_policy(&self) -> TimeoutPolicy {
        self.timeout_policy
    }

    /// Whether registrations for cases missing from the suite abort setup.
    pub fn strict_keys(&self) -> bool {
        self.strict_keys
    }

    /// Whether declared scratch dependencies that cannot be satisfied abort setup.
    pub fn validate_dependencies(&self) -> bool {
        self.validate_dependencies
    }

    /// Whether a response status differing from the case key fails the case.
    pub fn assert_status(&self) -> bool {
        self.assert_status
    }

    /// Interval used by the progress reporter.
    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    pub fn validate(&self) -> Result<()> {
        if self.hook_timeout.is_zero() {
            bail!("hook_timeout must be greater than 0");
        }

        if self.metrics_interval.is_zero() {
            bail!("metrics_interval must be greater than 0");
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct SequencerConfigBuilder {
    hook_timeout: Option<Duration>,
    timeout_policy: Option<TimeoutPolicy>,
    strict_keys: Option<bool>,
    validate_dependencies: Option<bool>,
    assert_status: Option<bool>,
    metrics_interval: Option<Duration>,
}

impl SequencerConfigBuilder {
    pub fn hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = Some(timeout);
        self
    }

    pub fn timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = Some(policy);
        self
    }

    pub fn strict_keys(mut self, strict: bool) -> Self {
        self.strict_keys = Some(strict);
        self
    }

    pub fn validate_dependencies(mut self, validate: bool) -> Self {
        self.validate_dependencies = Some(validate);
        self
    }

    pub fn assert_status(mut self, assert: bool) -> Self {
        self.assert_status = Some(assert);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<SequencerConfig> {
        let defaults = SequencerConfig::default();
        let params = SequencerConfigParams {
            hook_timeout: self.hook_timeout.unwrap_or(defaults.hook_timeout),
            timeout_policy: self.timeout_policy.unwrap_or(defaults.timeout_policy),
            strict_keys: self.strict_keys.unwrap_or(defaults.strict_keys),
            validate_dependencies: self
                .validate_dependencies
                .unwrap_or(defaults.validate_dependencies),
            assert_status: self.assert_status.unwrap_or(defaults.assert_status),
            metrics_interval: self.metrics_interval.unwrap_or(defaults.metrics_interval),
        };

        SequencerConfig::new(params)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|err| anyhow::anyhow!("{err}"))
            .with_context(|| format!("invalid value {raw:?} for {name}")),
        _ => Ok(None),
    }
}

fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<bool>> {
    match lookup(name) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            _ => bail!("invalid value {raw:?} for {name}; expected true or false"),
        },
        None => Ok(None),
    }
}
