//! Runtime configuration for the wizard engine.
//!
//! Defaults follow the reference polling protocol (2.5 s interval, 100
//! attempts ⇒ ≈5 minute ceiling) and can be overridden programmatically via
//! the `with_*` builders or through the environment (a `.env` file is picked
//! up via dotenvy):
//!
//! - `DRAFTLOOM_POLL_INTERVAL_MS`
//! - `DRAFTLOOM_MAX_POLL_ATTEMPTS`
//! - `DRAFTLOOM_SQLITE_DB`

use std::time::Duration;

/// Tuning knobs for the job orchestrator and repository.
#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Hard ceiling on poll attempts per job; exceeding it resolves the
    /// handle with a timeout while the artifact stays `processing`.
    pub max_poll_attempts: u32,
    /// Durable-write retry count used by the artifact repository.
    pub store_write_retries: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(2500),
            max_poll_attempts: 100,
            store_write_retries: 3,
        }
    }
}

impl OrchestratorConfig {
    /// Defaults overridden by any environment variables that are set.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Some(ms) = read_env_u64("DRAFTLOOM_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(attempts) = read_env_u64("DRAFTLOOM_MAX_POLL_ATTEMPTS") {
            config.max_poll_attempts = attempts.min(u64::from(u32::MAX)) as u32;
        }
        config
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_store_write_retries(mut self, retries: u32) -> Self {
        self.store_write_retries = retries.max(1);
        self
    }
}

/// SQLite database URL for the durable store, resolved from the environment
/// with a local-file default.
#[must_use]
pub fn default_sqlite_url() -> String {
    dotenvy::dotenv().ok();
    let db = std::env::var("DRAFTLOOM_SQLITE_DB").unwrap_or_else(|_| "draftloom.db".to_string());
    format!("sqlite://{db}?mode=rwc")
}

fn read_env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_protocol() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(2500));
        assert_eq!(config.max_poll_attempts, 100);
    }

    #[test]
    fn builders_clamp_to_sane_minimums() {
        let config = OrchestratorConfig::default()
            .with_max_poll_attempts(0)
            .with_store_write_retries(0);
        assert_eq!(config.max_poll_attempts, 1);
        assert_eq!(config.store_write_retries, 1);
    }
}
