//! Engine tuning knobs

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound accepted for `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Retry, budget and timeout settings for one engine session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub max_global_failures: u32,
    pub max_consecutive_failures: u32,
    pub max_verification_failures: u32,

    pub element_timeout_ms: u64,
    /// Per-locator wait for fallback and text locators
    pub fallback_timeout_ms: u64,
    pub direct_probe_timeout_ms: u64,
    pub network_idle_timeout_ms: u64,
    /// Pause between an action and its verification
    pub settle_delay_ms: u64,
    pub retry_delay_ms: u64,

    /// Progression clicks must make the next step's target resolvable
    pub strict_progression: bool,

    /// Characters kept when extraction degrades to a raw excerpt
    pub extract_excerpt_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_global_failures: 5,
            max_consecutive_failures: 3,
            max_verification_failures: 3,
            element_timeout_ms: 5_000,
            fallback_timeout_ms: 2_000,
            direct_probe_timeout_ms: 500,
            network_idle_timeout_ms: 30_000,
            settle_delay_ms: 500,
            retry_delay_ms: 1_000,
            strict_progression: false,
            extract_excerpt_chars: 2_000,
        }
    }
}

impl EngineConfig {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_millis(self.fallback_timeout_ms)
    }

    pub fn direct_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.direct_probe_timeout_ms)
    }

    pub fn network_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.network_idle_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Human-readable problems; empty when the configuration is usable.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.max_retries > MAX_RETRIES_LIMIT {
            problems.push(format!(
                "engine.max_retries must be at most {} (got {})",
                MAX_RETRIES_LIMIT, self.max_retries
            ));
        }
        for (name, value) in [
            ("max_global_failures", self.max_global_failures),
            ("max_consecutive_failures", self.max_consecutive_failures),
            ("max_verification_failures", self.max_verification_failures),
        ] {
            if value == 0 {
                problems.push(format!("engine.{} must be greater than zero", name));
            }
        }
        for (name, value) in [
            ("element_timeout_ms", self.element_timeout_ms),
            ("fallback_timeout_ms", self.fallback_timeout_ms),
            ("direct_probe_timeout_ms", self.direct_probe_timeout_ms),
            ("network_idle_timeout_ms", self.network_idle_timeout_ms),
        ] {
            if value == 0 {
                problems.push(format!("engine.{} must be greater than zero", name));
            }
        }
        if self.extract_excerpt_chars == 0 {
            problems.push("engine.extract_excerpt_chars must be greater than zero".to_string());
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(EngineConfig::default().problems().is_empty());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_retries": 1}"#).unwrap();
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.max_global_failures, 5);
    }

    #[test]
    fn limits_are_reported() {
        let config = EngineConfig {
            max_retries: 11,
            element_timeout_ms: 0,
            ..EngineConfig::default()
        };
        let problems = config.problems();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("max_retries"));
    }
}
