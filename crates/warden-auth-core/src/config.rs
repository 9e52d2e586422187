//! Configuration types for the auth service

use std::str::FromStr;

use crate::crypto::HmacKey;
use crate::AuthError;

/// Where session bindings live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionBackend {
    /// Session digest stored on the principal record
    #[default]
    Store,
    /// Instance-owned map from session digest to principal id
    Memory,
}

impl FromStr for SessionBackend {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "store" => Ok(Self::Store),
            "memory" => Ok(Self::Memory),
            other => Err(AuthError::Configuration(format!(
                "unknown session backend: {other}"
            ))),
        }
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Server secret keying the token digests (at least 32 bytes)
    pub token_secret: String,
    /// Session directory implementation
    pub session_backend: SessionBackend,
    /// Password hashing cost
    pub password_params: PasswordParams,
}

impl AuthConfig {
    /// Create a new auth config with default backend and hashing cost
    ///
    /// # Errors
    /// Returns `Configuration` if the secret is shorter than 32 bytes.
    pub fn try_new(token_secret: impl Into<String>) -> Result<Self, AuthError> {
        let token_secret = token_secret.into();
        if token_secret.len() < HmacKey::MIN_KEY_LENGTH {
            return Err(AuthError::Configuration(format!(
                "token secret must be at least {} bytes",
                HmacKey::MIN_KEY_LENGTH
            )));
        }
        Ok(Self {
            token_secret,
            session_backend: SessionBackend::default(),
            password_params: PasswordParams::default(),
        })
    }

    /// Set session backend
    pub fn with_session_backend(mut self, backend: SessionBackend) -> Self {
        self.session_backend = backend;
        self
    }

    /// Set password hashing parameters
    pub fn with_password_params(mut self, params: PasswordParams) -> Self {
        self.password_params = params;
        self
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_backend", &self.session_backend)
            .field("password_params", &self.password_params)
            .finish_non_exhaustive()
    }
}
