//! Configuration for the Auth API service.

use std::str::FromStr;
use std::time::Duration;

use warden_auth_core::{AuthConfig, PasswordParams, SessionBackend};

use crate::cookie::SessionCookie;

/// Credential store implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL via `DATABASE_URL`
    Postgres,
    /// Process-local map, lost on restart
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid("STORE_BACKEND")),
        }
    }
}

/// Auth API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,

    /// Database URL, required for the Postgres store
    pub database_url: Option<String>,

    /// Credential store implementation
    pub store_backend: StoreBackend,

    /// Auth core configuration
    pub auth: AuthConfig,

    /// Session cookie attributes
    pub session_cookie: SessionCookie,

    /// Request timeout
    pub request_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let http_port = parse_or(&var, "HTTP_PORT", 8080)?;

        // Database (an absent URL selects the memory store)
        let database_url = var("DATABASE_URL").filter(|url| !url.is_empty());
        let store_backend = match var("STORE_BACKEND") {
            Some(value) => value.parse()?,
            None if database_url.is_some() => StoreBackend::Postgres,
            None => StoreBackend::Memory,
        };
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        // Token secret (minimum 32 bytes)
        let token_secret = var("TOKEN_SECRET").ok_or(ConfigError::Missing("TOKEN_SECRET"))?;

        let session_backend = match var("SESSION_BACKEND") {
            Some(value) => value
                .parse::<SessionBackend>()
                .map_err(|_| ConfigError::Invalid("SESSION_BACKEND"))?,
            None => SessionBackend::default(),
        };

        // Argon2 cost (defaults from the argon2 crate)
        let defaults = PasswordParams::default();
        let password_params = PasswordParams {
            memory_kib: parse_or(&var, "ARGON2_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&var, "ARGON2_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&var, "ARGON2_PARALLELISM", defaults.parallelism)?,
        };

        let auth = AuthConfig::try_new(token_secret)
            .map_err(|e| ConfigError::AuthConfig(e.to_string()))?
            .with_session_backend(session_backend)
            .with_password_params(password_params);

        // Cookie
        let cookie_name = var("SESSION_COOKIE_NAME").unwrap_or_else(|| "session_id".to_string());
        if cookie_name.is_empty()
            || !cookie_name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(ConfigError::Invalid("SESSION_COOKIE_NAME"));
        }
        let cookie_secure = parse_or(&var, "COOKIE_SECURE", false)?;

        // Request timeout (default 30 seconds)
        let request_timeout_secs: u64 = parse_or(&var, "REQUEST_TIMEOUT_SECS", 30)?;

        Ok(Self {
            http_port,
            database_url,
            store_backend,
            auth,
            session_cookie: SessionCookie::new(cookie_name, cookie_secure),
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}

fn parse_or<F, T>(var: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match var(key) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Auth config error: {0}")]
    AuthConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "config-test-token-secret-0123456789abc";

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("TOKEN_SECRET", SECRET)]).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.auth.session_backend, SessionBackend::Store);
        assert_eq!(config.session_cookie.name(), "session_id");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_database_url_selects_postgres() {
        let config = load(&[
            ("TOKEN_SECRET", SECRET),
            ("DATABASE_URL", "postgres://localhost/warden"),
        ])
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Postgres);
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let result = load(&[("TOKEN_SECRET", SECRET), ("STORE_BACKEND", "postgres")]);
        assert!(matches!(result, Err(ConfigError::Missing("DATABASE_URL"))));
    }

    #[test]
    fn test_token_secret_required_and_long_enough() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("TOKEN_SECRET"))));
        assert!(matches!(
            load(&[("TOKEN_SECRET", "short")]),
            Err(ConfigError::AuthConfig(_))
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (key, value) in [
            ("HTTP_PORT", "eighty"),
            ("SESSION_BACKEND", "redis"),
            ("COOKIE_SECURE", "maybe"),
            ("SESSION_COOKIE_NAME", "bad name;"),
            ("ARGON2_ITERATIONS", "-1"),
        ] {
            let result = load(&[("TOKEN_SECRET", SECRET), (key, value)]);
            assert!(matches!(result, Err(ConfigError::Invalid(k)) if k == key), "{key}");
        }
    }
}
