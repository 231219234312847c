use std::time::Duration;

/// Default polling interval for the dispatcher loop.
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Default lease on a claimed job before another worker may take it over.
const DEFAULT_LEASE_SECS: i64 = 300;

/// Default number of claims a job gets before it is failed.
const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Import dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub poll_interval: Duration,
    pub lease_secs: i64,
    pub max_attempts: i32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            lease_secs: DEFAULT_LEASE_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl DispatcherConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `IMPORT_POLL_INTERVAL_MS` | `1000`  |
    /// | `IMPORT_LEASE_SECS`       | `300`   |
    /// | `IMPORT_MAX_ATTEMPTS`     | `3`     |
    pub fn from_env() -> Self {
        let poll_interval_ms: u64 = std::env::var("IMPORT_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL_MS.to_string())
            .parse()
            .expect("IMPORT_POLL_INTERVAL_MS must be a valid u64");

        let lease_secs: i64 = std::env::var("IMPORT_LEASE_SECS")
            .unwrap_or_else(|_| DEFAULT_LEASE_SECS.to_string())
            .parse()
            .expect("IMPORT_LEASE_SECS must be a valid i64");

        let max_attempts: i32 = std::env::var("IMPORT_MAX_ATTEMPTS")
            .unwrap_or_else(|_| DEFAULT_MAX_ATTEMPTS.to_string())
            .parse()
            .expect("IMPORT_MAX_ATTEMPTS must be a valid i32");

        Self {
            poll_interval: Duration::from_millis(poll_interval_ms.max(1)),
            lease_secs: lease_secs.max(1),
            max_attempts: max_attempts.max(1),
        }
    }
}
