//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use progression_core::lifecycle::DEFAULT_SESSION_TTL_MINUTES;
use progression_core::prerequisites::DEFAULT_MAX_DEPTH;
use progression_core::scheduler::{DEFAULT_BOX_WEIGHTS, DEFAULT_QUESTION_COUNTS};
use progression_core::{BoxLevel, LifecycleConfig, SchedulerConfig};
use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Absent means the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub log_level: Level,
    pub session_ttl_minutes: i64,
    pub prerequisite_max_depth: usize,
    pub leitner_question_counts: Vec<u32>,
    pub leitner_box_weights: [f64; BoxLevel::COUNT],
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and Database Settings ---
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDRESS", e.to_string()))?;

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            invalid("RUST_LOG", format!("'{}' is not a valid log level", log_level_str))
        })?;

        // --- Progression Settings ---
        let session_ttl_minutes = match lookup("SESSION_TTL_MINUTES") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(minutes) if minutes > 0 => minutes,
                _ => return Err(invalid("SESSION_TTL_MINUTES", format!("'{}' is not a positive number of minutes", raw))),
            },
            None => DEFAULT_SESSION_TTL_MINUTES,
        };

        let prerequisite_max_depth = match lookup("PREREQUISITE_MAX_DEPTH") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => depth,
                _ => return Err(invalid("PREREQUISITE_MAX_DEPTH", format!("'{}' is not a positive depth", raw))),
            },
            None => DEFAULT_MAX_DEPTH,
        };

        let leitner_question_counts = match lookup("LEITNER_QUESTION_COUNTS") {
            Some(raw) => parse_counts(&raw)?,
            None => DEFAULT_QUESTION_COUNTS.to_vec(),
        };

        let leitner_box_weights = match lookup("LEITNER_BOX_WEIGHTS") {
            Some(raw) => parse_weights(&raw)?,
            None => DEFAULT_BOX_WEIGHTS,
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            session_ttl_minutes,
            prerequisite_max_depth,
            leitner_question_counts,
            leitner_box_weights,
        })
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            weights: self.leitner_box_weights,
            valid_counts: self.leitner_question_counts.clone(),
        }
    }

    pub fn lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig { session_ttl: chrono::Duration::minutes(self.session_ttl_minutes) }
    }
}

fn invalid(var: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue(var.to_string(), reason)
}

fn parse_counts(raw: &str) -> Result<Vec<u32>, ConfigError> {
    let counts = raw
        .split(',')
        .map(|part| part.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid("LEITNER_QUESTION_COUNTS", e.to_string()))?;
    if counts.is_empty() || counts.contains(&0) {
        return Err(invalid("LEITNER_QUESTION_COUNTS", "counts must be positive".into()));
    }
    Ok(counts)
}

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

fn parse_weights(raw: &str) -> Result<[f64; BoxLevel::COUNT], ConfigError> {
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid("LEITNER_BOX_WEIGHTS", e.to_string()))?;
    let weights: [f64; BoxLevel::COUNT] = values.try_into().map_err(|v: Vec<f64>| {
        invalid("LEITNER_BOX_WEIGHTS", format!("expected {} values, got {}", BoxLevel::COUNT, v.len()))
    })?;
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(invalid("LEITNER_BOX_WEIGHTS", "weights must be non-negative".into()));
    }
    // Shares above the whole would plan more questions than requested.
    if weights.iter().sum::<f64>() > 1.0 + WEIGHT_SUM_TOLERANCE {
        return Err(invalid("LEITNER_BOX_WEIGHTS", "weights must not sum past 1".into()));
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.session_ttl_minutes, 120);
        assert_eq!(config.prerequisite_max_depth, 50);
        assert_eq!(config.leitner_question_counts, vec![5, 10, 15, 20]);
        assert_eq!(config.leitner_box_weights, [0.50, 0.25, 0.15, 0.07, 0.03]);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/progress"),
            ("RUST_LOG", "debug"),
            ("SESSION_TTL_MINUTES", "30"),
            ("LEITNER_QUESTION_COUNTS", "3, 6"),
            ("LEITNER_BOX_WEIGHTS", "1,0,0,0,0"),
        ])
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/progress"));
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.lifecycle_config().session_ttl, chrono::Duration::minutes(30));
        assert_eq!(config.scheduler_config().valid_counts, vec![3, 6]);
        assert_eq!(config.leitner_box_weights[0], 1.0);
    }

    #[test]
    fn bad_values_fail_startup() {
        assert!(matches!(load(&[("BIND_ADDRESS", "nowhere")]), Err(ConfigError::InvalidValue(..))));
        assert!(matches!(load(&[("SESSION_TTL_MINUTES", "0")]), Err(ConfigError::InvalidValue(..))));
        assert!(matches!(load(&[("LEITNER_BOX_WEIGHTS", "0.5,0.5")]), Err(ConfigError::InvalidValue(..))));
        assert!(matches!(load(&[("LEITNER_BOX_WEIGHTS", "1,-1,0,0,0")]), Err(ConfigError::InvalidValue(..))));
        assert!(matches!(load(&[("LEITNER_BOX_WEIGHTS", "1,1,0,0,0")]), Err(ConfigError::InvalidValue(..))));
        assert!(matches!(load(&[("LEITNER_QUESTION_COUNTS", "5,x")]), Err(ConfigError::InvalidValue(..))));
    }
}
