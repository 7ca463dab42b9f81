//! Service configuration loaded from environment variables.

use base64::{engine::general_purpose, Engine as _};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

use crate::rate_limit::{QuotaParseError, RateQuota};
use crate::session::position_guard::DEFAULT_MAX_KM_PER_MINUTE;

#[derive(Clone)]
pub struct Config {
    pub bind_address: String,
    pub redis_url: String,
    /// 32-byte HMAC key for signing access credentials.
    pub signing_key: Vec<u8>,
    /// Maximum plausible travel speed for the position guard.
    pub max_km_per_minute: f64,
    /// Request quota applied per client identity.
    pub rate_quota: RateQuota,
}

/// Custom Debug implementation that redacts the signing key.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("redis_url", &self.redis_url)
            .field("signing_key", &"[REDACTED]")
            .field("max_km_per_minute", &self.max_km_per_minute)
            .field("rate_quota", &self.rate_quota)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid signing key: {0}")]
    InvalidSigningKey(String),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Invalid rate quota: {0}")]
    InvalidQuota(#[from] QuotaParseError),

    #[error("Invalid max speed: {0}")]
    InvalidMaxSpeed(String),
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required variable is missing or malformed.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let redis_url = vars
            .get("REDIS_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("REDIS_URL".to_string()))?
            .clone();

        let signing_key_base64 = vars
            .get("IG_SIGNING_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("IG_SIGNING_KEY".to_string()))?;

        let signing_key = general_purpose::STANDARD
            .decode(signing_key_base64)
            .map_err(ConfigError::Base64Error)?;

        if signing_key.len() != 32 {
            return Err(ConfigError::InvalidSigningKey(format!(
                "Expected 32 bytes, got {}",
                signing_key.len()
            )));
        }

        let max_km_per_minute = match vars.get("IG_MAX_KM_PER_MINUTE") {
            Some(raw) => {
                let speed: f64 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidMaxSpeed(raw.clone()))?;
                if !speed.is_finite() || speed <= 0.0 {
                    return Err(ConfigError::InvalidMaxSpeed(raw.clone()));
                }
                speed
            }
            None => DEFAULT_MAX_KM_PER_MINUTE,
        };

        let rate_quota = match vars.get("IG_RATE_LIMIT") {
            Some(raw) => raw.parse()?,
            None => RateQuota::default(),
        };

        Ok(Config {
            bind_address,
            redis_url,
            signing_key,
            max_km_per_minute,
            rate_quota,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_signing_key_base64() -> String {
        general_purpose::STANDARD.encode([0u8; 32])
    }

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            ("REDIS_URL".to_string(), "redis://localhost:6379".to_string()),
            ("IG_SIGNING_KEY".to_string(), test_signing_key_base64()),
        ])
    }

    #[test]
    fn test_from_vars_success() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9000".to_string());
        vars.insert("IG_MAX_KM_PER_MINUTE".to_string(), "25".to_string());
        vars.insert("IG_RATE_LIMIT".to_string(), "50/30".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.signing_key.len(), 32);
        assert!((config.max_km_per_minute - 25.0).abs() < f64::EPSILON);
        assert_eq!(config.rate_quota.limit, 50);
        assert_eq!(config.rate_quota.window, Duration::from_secs(30));
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert!((config.max_km_per_minute - DEFAULT_MAX_KM_PER_MINUTE).abs() < f64::EPSILON);
        assert_eq!(config.rate_quota, RateQuota::default());
    }

    #[test]
    fn test_from_vars_missing_redis_url() {
        let vars = HashMap::from([("IG_SIGNING_KEY".to_string(), test_signing_key_base64())]);

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "REDIS_URL"));
    }

    #[test]
    fn test_from_vars_missing_signing_key() {
        let vars = HashMap::from([(
            "REDIS_URL".to_string(),
            "redis://localhost:6379".to_string(),
        )]);

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "IG_SIGNING_KEY"));
    }

    #[test]
    fn test_from_vars_invalid_base64() {
        let mut vars = base_vars();
        vars.insert("IG_SIGNING_KEY".to_string(), "not-valid-base64!@#$".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::Base64Error(_))));
    }

    #[test]
    fn test_from_vars_signing_key_wrong_length() {
        let mut vars = base_vars();
        vars.insert(
            "IG_SIGNING_KEY".to_string(),
            general_purpose::STANDARD.encode([0u8; 16]),
        );

        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidSigningKey(msg)) if msg.contains("Expected 32 bytes, got 16"))
        );
    }

    #[test]
    fn test_from_vars_rejects_zero_max_speed() {
        let mut vars = base_vars();
        vars.insert("IG_MAX_KM_PER_MINUTE".to_string(), "0".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidMaxSpeed(_))));
    }

    #[test]
    fn test_from_vars_rejects_non_numeric_max_speed() {
        let mut vars = base_vars();
        vars.insert("IG_MAX_KM_PER_MINUTE".to_string(), "fast".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidMaxSpeed(_))));
    }

    #[test]
    fn test_from_vars_rejects_malformed_quota() {
        let mut vars = base_vars();
        vars.insert("IG_RATE_LIMIT".to_string(), "lots".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidQuota(_))));
    }

    #[test]
    fn test_debug_redacts_signing_key() {
        let config = Config::from_vars(&base_vars()).unwrap();
        let debug_str = format!("{config:?}");
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("signing_key: ["));
    }
}
