use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

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
    pub database_path: String,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub auth_clock_skew: Duration,
    pub long_poll_timeout: Duration,
    pub long_poll_check_interval: Duration,
    pub long_poll_lookback: Duration,
    pub list_page_size: usize,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_path", &self.database_path)
            .field("jwt_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("auth_clock_skew", &self.auth_clock_skew)
            .field("long_poll_timeout", &self.long_poll_timeout)
            .field("long_poll_check_interval", &self.long_poll_check_interval)
            .field("long_poll_lookback", &self.long_poll_lookback)
            .field("list_page_size", &self.list_page_size)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    /// Build config from any name -> value source. Public so tests can
    /// construct configs without touching process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "SAFEGUARD_BIND_ADDR", "127.0.0.1:8080");
        let database_path = value_or_default(&lookup, "SAFEGUARD_DATABASE_PATH", "safeguard.db");

        let jwt_secret = required_trimmed(&lookup, "SAFEGUARD_JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid(
                "SAFEGUARD_JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        let token_ttl_secs = parse_range(
            &lookup,
            "SAFEGUARD_TOKEN_TTL_SECS",
            "3600",
            60..=86_400,
        )?;
        let auth_clock_skew_secs =
            parse_range(&lookup, "SAFEGUARD_AUTH_CLOCK_SKEW_SECS", "60", 0..=300)?;

        // Long-poll tuning; the worst-case response lag is timeout plus one
        // check interval, so both are kept short.
        let long_poll_timeout_secs =
            parse_range(&lookup, "SAFEGUARD_LONG_POLL_TIMEOUT_SECS", "10", 0..=60)?;
        let long_poll_check_interval_secs = parse_range(
            &lookup,
            "SAFEGUARD_LONG_POLL_CHECK_INTERVAL_SECS",
            "2",
            1..=30,
        )?;
        let long_poll_lookback_secs = parse_range(
            &lookup,
            "SAFEGUARD_LONG_POLL_LOOKBACK_SECS",
            "300",
            0..=3_600,
        )?;

        let list_page_size = parse_range(&lookup, "SAFEGUARD_LIST_PAGE_SIZE", "100", 1..=1_000)?;

        Ok(Self {
            bind_addr,
            database_path,
            jwt_secret,
            token_ttl: Duration::from_secs(token_ttl_secs),
            auth_clock_skew: Duration::from_secs(auth_clock_skew_secs),
            long_poll_timeout: Duration::from_secs(long_poll_timeout_secs),
            long_poll_check_interval: Duration::from_secs(long_poll_check_interval_secs),
            long_poll_lookback: Duration::from_secs(long_poll_lookback_secs),
            list_page_size: usize::try_from(list_page_size)
                .map_err(|_| ConfigError::Invalid("SAFEGUARD_LIST_PAGE_SIZE overflow".into()))?,
        })
    }
}

fn parse_range(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: &str,
    range: std::ops::RangeInclusive<u64>,
) -> Result<u64, ConfigError> {
    let value = value_or_default(lookup, name, default)
        .parse::<u64>()
        .map_err(|_| {
            ConfigError::Invalid(format!(
                "{name} must be an integer in [{}, {}]",
                range.start(),
                range.end()
            ))
        })?;
    if !range.contains(&value) {
        return Err(ConfigError::Invalid(format!(
            "{name} must be in [{}, {}]",
            range.start(),
            range.end()
        )));
    }
    Ok(value)
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

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn from_map(map: &HashMap<&str, &str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn config_requires_jwt_secret() {
        let map: HashMap<&str, &str> = HashMap::new();
        let err = from_map(&map).unwrap_err();
        assert!(err.to_string().contains("SAFEGUARD_JWT_SECRET"));
    }

    #[test]
    fn config_rejects_short_jwt_secret() {
        let mut map = HashMap::new();
        map.insert("SAFEGUARD_JWT_SECRET", "short");
        let err = from_map(&map).unwrap_err();
        assert!(err.to_string().contains("32 characters"));
    }

    #[test]
    fn config_applies_defaults() {
        let mut map = HashMap::new();
        map.insert("SAFEGUARD_JWT_SECRET", SECRET);

        let config = from_map(&map).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.long_poll_timeout, Duration::from_secs(10));
        assert_eq!(config.long_poll_check_interval, Duration::from_secs(2));
        assert_eq!(config.long_poll_lookback, Duration::from_secs(300));
    }

    #[test]
    fn config_rejects_out_of_range_poll_timeout() {
        let mut map = HashMap::new();
        map.insert("SAFEGUARD_JWT_SECRET", SECRET);
        map.insert("SAFEGUARD_LONG_POLL_TIMEOUT_SECS", "600");

        let err = from_map(&map).unwrap_err();
        assert!(err.to_string().contains("SAFEGUARD_LONG_POLL_TIMEOUT_SECS"));
    }

    #[test]
    fn config_rejects_zero_check_interval() {
        let mut map = HashMap::new();
        map.insert("SAFEGUARD_JWT_SECRET", SECRET);
        map.insert("SAFEGUARD_LONG_POLL_CHECK_INTERVAL_SECS", "0");

        assert!(from_map(&map).is_err());
    }

    #[test]
    fn config_redacts_jwt_secret_in_debug() {
        let mut map = HashMap::new();
        map.insert("SAFEGUARD_JWT_SECRET", SECRET);

        let config = from_map(&map).unwrap();
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains(SECRET));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
