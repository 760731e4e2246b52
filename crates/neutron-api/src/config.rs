use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const MIN_JWT_SECRET_LEN: usize = 16;
const MIN_SAVE_BYTES: usize = 1024;
const MAX_SAVE_BYTES: usize = 256 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub save_dir: PathBuf,
    pub jwt_secret: String,
    pub max_save_bytes: usize,
    pub auth_clock_skew: Duration,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("db_path", &self.db_path)
            .field("save_dir", &self.save_dir)
            .field("jwt_secret", &"[REDACTED]")
            .field("max_save_bytes", &self.max_save_bytes)
            .field("auth_clock_skew", &self.auth_clock_skew)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "NEUTRON_API_BIND_ADDR", "127.0.0.1:8000");
        let db_path = PathBuf::from(value_or_default(&lookup, "NEUTRON_DB_PATH", "neutron.db"));
        let save_dir = PathBuf::from(value_or_default(
            &lookup,
            "NEUTRON_SAVE_DIR",
            "media/saves",
        ));

        let jwt_secret = required_trimmed(&lookup, "NEUTRON_JWT_SECRET")?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "NEUTRON_JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} characters"
            )));
        }

        let max_save_bytes = value_or_default(&lookup, "NEUTRON_MAX_SAVE_BYTES", "16777216")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::Invalid(format!(
                    "NEUTRON_MAX_SAVE_BYTES must be an integer in [{MIN_SAVE_BYTES}, {MAX_SAVE_BYTES}]"
                ))
            })?;
        if !(MIN_SAVE_BYTES..=MAX_SAVE_BYTES).contains(&max_save_bytes) {
            return Err(ConfigError::Invalid(format!(
                "NEUTRON_MAX_SAVE_BYTES must be in [{MIN_SAVE_BYTES}, {MAX_SAVE_BYTES}]"
            )));
        }

        let auth_clock_skew_secs = value_or_default(&lookup, "AUTH_CLOCK_SKEW_SECS", "60")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "AUTH_CLOCK_SKEW_SECS must be an integer in [0, 300]".to_string(),
                )
            })?;
        if auth_clock_skew_secs > 300 {
            return Err(ConfigError::Invalid(
                "AUTH_CLOCK_SKEW_SECS must be in [0, 300]".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            db_path,
            save_dir,
            jwt_secret,
            max_save_bytes,
            auth_clock_skew: Duration::from_secs(auth_clock_skew_secs),
        })
    }
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn from_map(map: &HashMap<&str, &str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn config_requires_jwt_secret() {
        let map: HashMap<&str, &str> = HashMap::new();
        let err = from_map(&map).unwrap_err();
        assert!(err.to_string().contains("NEUTRON_JWT_SECRET"));
    }

    #[test]
    fn config_rejects_short_secret() {
        let map = HashMap::from([("NEUTRON_JWT_SECRET", "short")]);
        assert!(matches!(from_map(&map), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn config_applies_defaults() {
        let map = HashMap::from([("NEUTRON_JWT_SECRET", "0123456789abcdef")]);
        let config = from_map(&map).unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.db_path, PathBuf::from("neutron.db"));
        assert_eq!(config.save_dir, PathBuf::from("media/saves"));
        assert_eq!(config.max_save_bytes, 16 * 1024 * 1024);
        assert_eq!(config.auth_clock_skew, Duration::from_secs(60));
    }

    #[test]
    fn config_validates_ranges() {
        let map = HashMap::from([
            ("NEUTRON_JWT_SECRET", "0123456789abcdef"),
            ("NEUTRON_MAX_SAVE_BYTES", "10"),
        ]);
        assert!(from_map(&map).is_err());

        let map = HashMap::from([
            ("NEUTRON_JWT_SECRET", "0123456789abcdef"),
            ("AUTH_CLOCK_SKEW_SECS", "301"),
        ]);
        assert!(from_map(&map).is_err());
    }

    #[test]
    fn config_redacts_sensitive_debug_fields() {
        let map = HashMap::from([("NEUTRON_JWT_SECRET", "sensitive-jwt-secret")]);
        let config = from_map(&map).unwrap();

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("sensitive-jwt-secret"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
