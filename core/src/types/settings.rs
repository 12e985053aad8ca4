//! Engine settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Exponential,
    Linear,
    Fixed,
}

/// How transient submission failures are retried.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff")]
    pub backoff_strategy: BackoffStrategy,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        RetrySettings {
            max_retries: default_max_retries(),
            backoff_strategy: default_backoff(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default)]
    pub retry: RetrySettings,
    /// Submit the transactions of different chains concurrently.
    #[serde(default)]
    pub parallel_chains: bool,
    /// Upper bound on connections diffed at the same time.
    #[serde(default = "default_read_concurrency")]
    pub read_concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            retry: RetrySettings::default(),
            parallel_chains: false,
            read_concurrency: default_read_concurrency(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff() -> BackoffStrategy {
    BackoffStrategy::Exponential
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_read_concurrency() -> usize {
    8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let s: Settings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.retry.max_retries, 3);
        assert!(!s.parallel_chains);
    }

    #[test]
    fn partial_retry_section_keeps_other_defaults() {
        let s: Settings = serde_yaml::from_str("retry:\n  backoff_strategy: linear\n").unwrap();
        assert_eq!(s.retry.backoff_strategy, BackoffStrategy::Linear);
        assert_eq!(s.retry.base_delay_ms, 1000);
    }

    #[test]
    fn backoff_strategy_serde() {
        let json = serde_json::to_string(&BackoffStrategy::Exponential).unwrap();
        assert_eq!(json, "\"exponential\"");
    }
}
