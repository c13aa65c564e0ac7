use crate::resolver::ResolveMode;
use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Timeout callers should use when they have no better value.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

pub const DEFAULT_RESULT_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_ARGS_TTL: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_RESULT_ENTRIES: usize = 10_000;

/// How loudly failed executions are logged. Never affects the returned result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureLogging {
    /// Failures go to `debug`; "not ready yet" errors from in-flight data stay out of logs.
    #[default]
    Quiet,
    /// Failures go to `warn`.
    Verbose,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    #[serde(rename = "resultTtlMs", deserialize_with = "millis")]
    pub result_ttl: Duration,
    #[serde(rename = "argsTtlMs", deserialize_with = "millis")]
    pub args_ttl: Duration,
    /// LRU bound on the result cache. `None` leaves it unbounded.
    pub max_result_entries: Option<usize>,
    pub resolve_mode: ResolveMode,
    pub failure_logging: FailureLogging,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            result_ttl: DEFAULT_RESULT_TTL,
            args_ttl: DEFAULT_ARGS_TTL,
            max_result_entries: Some(DEFAULT_MAX_RESULT_ENTRIES),
            resolve_mode: ResolveMode::Permissive,
            failure_logging: FailureLogging::Quiet,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON object; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_result_ttl(mut self, ttl: Duration) -> Self {
        self.result_ttl = ttl;
        self
    }

    pub fn with_args_ttl(mut self, ttl: Duration) -> Self {
        self.args_ttl = ttl;
        self
    }

    pub fn with_max_result_entries(mut self, max: Option<usize>) -> Self {
        self.max_result_entries = max;
        self
    }

    pub fn with_resolve_mode(mut self, mode: ResolveMode) -> Self {
        self.resolve_mode = mode;
        self
    }

    pub fn with_failure_logging(mut self, logging: FailureLogging) -> Self {
        self.failure_logging = logging;
        self
    }
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}
