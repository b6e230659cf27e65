//! Environment-driven configuration helpers.
//!
//! Every config struct in the workspace is built from a lookup function
//! rather than reading `std::env` directly, so parsing can be tested without
//! mutating the process environment. Binaries pass [`process_env`].

use std::str::FromStr;

/// Key → value lookup used by every `from_lookup` constructor.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Read from the process environment (after `dotenvy` has run).
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a valid {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Fetch a variable, treating empty and whitespace-only values as unset.
pub fn var(lookup: Lookup<'_>, key: &str) -> Option<String> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a variable, falling back to `default` when unset.
pub fn parse_var<T: FromStr>(
    lookup: Lookup<'_>,
    key: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(lookup, key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            key,
            expected,
            value: raw,
        }),
    }
}

/// Parse a boolean flag (`true`/`false`, `1`/`0`, `yes`/`no`).
pub fn bool_var(lookup: Lookup<'_>, key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match var(lookup, key) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                expected: "boolean",
                value: raw,
            }),
        },
    }
}

/// Split a comma-separated variable, dropping empty items.
pub fn list_var(lookup: Lookup<'_>, key: &str, default: &str) -> Vec<String> {
    var(lookup, key)
        .unwrap_or_else(|| default.to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// HttpConfig
// ---------------------------------------------------------------------------

/// Listener and middleware settings shared by both HTTP services.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (service-specific default).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks (default: `10`).
    pub shutdown_timeout_secs: u64,
}

impl HttpConfig {
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `default_port`          |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `10`                    |
    pub fn from_lookup(lookup: Lookup<'_>, default_port: u16) -> Result<Self, ConfigError> {
        Ok(Self {
            host: var(lookup, "HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_var(lookup, "PORT", "u16", default_port)?,
            cors_origins: list_var(lookup, "CORS_ORIGINS", "http://localhost:5173"),
            request_timeout_secs: parse_var(lookup, "REQUEST_TIMEOUT_SECS", "u64", 30)?,
            shutdown_timeout_secs: parse_var(lookup, "SHUTDOWN_TIMEOUT_SECS", "u64", 10)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use assert_matches::assert_matches;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn http_config_defaults() {
        let vars = env(&[]);
        let config = HttpConfig::from_lookup(&|k| vars.get(k).cloned(), 8081).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8081);
        assert_eq!(config.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.shutdown_timeout_secs, 10);
    }

    #[test]
    fn http_config_overrides() {
        let vars = env(&[
            ("PORT", "9000"),
            ("CORS_ORIGINS", "http://a.test, http://b.test,,"),
        ]);
        let config = HttpConfig::from_lookup(&|k| vars.get(k).cloned(), 8080).unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn invalid_port_is_reported_with_key() {
        let vars = env(&[("PORT", "eighty")]);
        let err = HttpConfig::from_lookup(&|k| vars.get(k).cloned(), 8080).unwrap_err();

        assert_matches!(err, ConfigError::Invalid { key: "PORT", .. });
        assert_eq!(err.to_string(), "PORT must be a valid u16, got \"eighty\"");
    }

    #[test]
    fn blank_value_counts_as_unset() {
        let vars = env(&[("HOST", "  ")]);
        assert_eq!(var(&|k| vars.get(k).cloned(), "HOST"), None);
    }

    #[test]
    fn bool_var_accepts_common_spellings() {
        let vars = env(&[("A", "YES"), ("B", "0"), ("C", "maybe")]);
        let lookup = |k: &str| vars.get(k).cloned();

        assert!(bool_var(&lookup, "A", false).unwrap());
        assert!(!bool_var(&lookup, "B", true).unwrap());
        assert!(bool_var(&lookup, "C", false).is_err());
        assert!(bool_var(&lookup, "MISSING", true).unwrap());
    }
}
