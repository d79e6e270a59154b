//! Engine configuration.
//!
//! Per-machine limits (hierarchy depth, timer pool size, history, trace
//! length) in a small serde-loadable struct that can live alongside the
//! rest of an application's configuration.
//!
//! # JSON Example
//!
//! ```rust
//! use hsm_runtime::config::HsmConfig;
//!
//! let config = HsmConfig::from_json(r#"{ "max_timers": 6, "history": false }"#).unwrap();
//! assert_eq!(config.max_timers, 6);
//! assert_eq!(config.max_depth, 8);
//! assert!(!config.history);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard ceiling for hierarchy depth; sizes the stack-allocated
/// exit/entry paths.
pub const DEPTH_LIMIT: usize = 32;

pub const DEFAULT_MAX_DEPTH: usize = 8;
pub const DEFAULT_MAX_TIMERS: usize = 4;
pub const DEFAULT_TRACE_CAPACITY: usize = 16;

/// Largest timer pool a single machine may own.
pub const TIMER_POOL_LIMIT: usize = u8::MAX as usize;

/// Error type for configuration loading and validation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    /// JSON parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Per-machine engine limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HsmConfig {
    /// Longest allowed root-to-state chain, counting both ends.
    pub max_depth: usize,

    /// Number of timer slots in the machine's pool.
    pub max_timers: usize,

    /// Record the last active state on every transition.
    pub history: bool,

    /// Completed transitions kept in the diagnostic log; `0` disables it.
    pub trace_capacity: usize,
}

impl Default for HsmConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_timers: DEFAULT_MAX_TIMERS,
            history: true,
            trace_capacity: DEFAULT_TRACE_CAPACITY,
        }
    }
}

impl HsmConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: HsmConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the limits against what the engine can represent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 || self.max_depth > DEPTH_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "max_depth must be within 1..={DEPTH_LIMIT}, got {}",
                self.max_depth
            )));
        }
        if self.max_timers > TIMER_POOL_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "max_timers must not exceed {TIMER_POOL_LIMIT}, got {}",
                self.max_timers
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_embedded_profile() {
        let config = HsmConfig::default();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.max_timers, 4);
        assert!(config.history);
        assert_eq!(config.trace_capacity, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_document_yields_defaults() {
        let config = HsmConfig::from_json("{}").unwrap();
        assert_eq!(config, HsmConfig::default());
    }

    #[test]
    fn rejects_zero_depth() {
        let result = HsmConfig::from_json(r#"{ "max_depth": 0 }"#);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn rejects_depth_above_limit() {
        let config = HsmConfig {
            max_depth: DEPTH_LIMIT + 1,
            ..HsmConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn rejects_oversized_timer_pool() {
        let result = HsmConfig::from_json(r#"{ "max_timers": 300 }"#);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn reports_malformed_json() {
        let result = HsmConfig::from_json(r#"{ "max_depth": "deep" }"#);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
