use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff between attempts of one operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryBackoffConfig {
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryBackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            backoff_factor: 2.0,
            max_delay_ms: 60_000,
        }
    }
}

/// Executor tuning. Defaults: three attempts, one second base delay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutorConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        let backoff = RetryBackoffConfig::default();
        Self {
            max_attempts: 3,
            base_delay_ms: backoff.base_delay_ms,
            max_delay_ms: backoff.max_delay_ms,
        }
    }
}

impl ExecutorConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    pub fn backoff(&self) -> RetryBackoffConfig {
        RetryBackoffConfig {
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            ..RetryBackoffConfig::default()
        }
    }

    /// At least one attempt is always made.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Delay after failed attempt `attempt` (1-based): `base * factor^(attempt-1)`,
/// capped at `max_delay_ms`.
pub fn delay_for_attempt_ms(attempt: u32, config: &RetryBackoffConfig) -> u64 {
    let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let delay = (config.base_delay_ms as f64) * config.backoff_factor.powi(exp);
    delay.min(config.max_delay_ms as f64).round().max(0.0) as u64
}

pub fn delay_for_attempt(attempt: u32, config: &RetryBackoffConfig) -> Duration {
    Duration::from_millis(delay_for_attempt_ms(attempt, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_per_attempt_from_base() {
        let config = RetryBackoffConfig::default();
        assert_eq!(delay_for_attempt_ms(1, &config), 1_000);
        assert_eq!(delay_for_attempt_ms(2, &config), 2_000);
        assert_eq!(delay_for_attempt_ms(3, &config), 4_000);
    }

    #[test]
    fn delay_is_capped_at_max() {
        let config = RetryBackoffConfig {
            base_delay_ms: 1_000,
            backoff_factor: 2.0,
            max_delay_ms: 5_000,
        };
        assert_eq!(delay_for_attempt_ms(4, &config), 5_000);
        assert_eq!(delay_for_attempt_ms(u32::MAX, &config), 5_000);
    }

    #[test]
    fn executor_config_defaults_and_partial_json() {
        let config = ExecutorConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay_ms, 1_000);

        let parsed: ExecutorConfig =
            serde_json::from_str(r#"{"baseDelayMs": 10}"#).expect("config should parse");
        assert_eq!(parsed.max_attempts, 3);
        assert_eq!(parsed.backoff().base_delay_ms, 10);
        assert_eq!(ExecutorConfig::default().with_max_attempts(0).attempts(), 1);
    }
}
