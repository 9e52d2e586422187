//! Salted password hashing with Argon2id
//!
//! Hashes are PHC strings: algorithm, parameters, salt and output in one
//! value, so verification needs nothing but the stored string. Output
//! comparison inside `password-hash` is constant time.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier as _, Version};
use secrecy::{ExposeSecret, Secret};
use std::sync::Arc;

use crate::config::PasswordParams;
use crate::token::generate_token;
use crate::AuthError;

/// One-way salted password hasher
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Hash of a random throwaway password, verified against when the
    /// identity is unknown so both login failures cost the same
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    /// Build a hasher with the given cost parameters.
    ///
    /// # Errors
    /// `Configuration` if Argon2 rejects the parameters.
    pub fn new(params: PasswordParams) -> Result<Self, AuthError> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|e| AuthError::Configuration(format!("invalid argon2 parameters: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut hasher = Self {
            argon2,
            dummy_hash: Arc::from(""),
        };
        let throwaway = Secret::new(generate_token());
        hasher.dummy_hash = Arc::from(hasher.hash(&throwaway)?);
        Ok(hasher)
    }

    /// Hash a password under a fresh random salt
    pub fn hash(&self, password: &Secret<String>) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.expose_secret().as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                tracing::error!(error = %e, "Password hashing failed");
                AuthError::Internal("password hashing failed".to_string())
            })
    }

    /// Check a password against a stored PHC hash.
    ///
    /// # Errors
    /// `InvalidState` if the stored value is not a usable Argon2 hash.
    pub fn verify(&self, password: &Secret<String>, stored_hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(stored_hash).map_err(|e| {
            tracing::error!(error = %e, "Stored password hash is not a PHC string");
            AuthError::InvalidState("stored password hash is malformed".to_string())
        })?;

        match self
            .argon2
            .verify_password(password.expose_secret().as_bytes(), &parsed)
        {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => {
                tracing::error!(error = %e, "Stored password hash could not be verified");
                Err(AuthError::InvalidState(
                    "stored password hash is unusable".to_string(),
                ))
            }
        }
    }

    /// Spend one verification on the dummy hash; the result is irrelevant
    pub fn verify_dummy(&self, password: &Secret<String>) {
        let _ = self.verify(password, &self.dummy_hash);
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap_hasher() -> PasswordHasher {
        PasswordHasher::new(PasswordParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    fn secret(s: &str) -> Secret<String> {
        Secret::new(s.to_string())
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = cheap_hasher();
        let h1 = hasher.hash(&secret("secret1")).unwrap();
        let h2 = hasher.hash(&secret("secret1")).unwrap();
        assert_ne!(h1, h2);
        assert!(hasher.verify(&secret("secret1"), &h1).unwrap());
        assert!(hasher.verify(&secret("secret1"), &h2).unwrap());
    }

    #[test]
    fn test_hash_never_contains_plaintext() {
        let hasher = cheap_hasher();
        let hash = hasher.hash(&secret("plaintext-password")).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("plaintext-password"));
    }

    #[test]
    fn test_verify_wrong_password() {
        let hasher = cheap_hasher();
        let hash = hasher.hash(&secret("secret1")).unwrap();
        assert!(!hasher.verify(&secret("wrong"), &hash).unwrap());
        assert!(!hasher.verify(&secret(""), &hash).unwrap());
    }

    #[test]
    fn test_verify_uses_parameters_embedded_in_hash() {
        let weak = cheap_hasher();
        let stronger = PasswordHasher::new(PasswordParams {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        let hash = weak.hash(&secret("secret1")).unwrap();
        assert!(stronger.verify(&secret("secret1"), &hash).unwrap());
    }

    #[test]
    fn test_verify_malformed_hash_is_invalid_state() {
        let hasher = cheap_hasher();
        let result = hasher.verify(&secret("secret1"), "not-a-phc-string");
        assert!(matches!(result, Err(AuthError::InvalidState(_))));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let result = PasswordHasher::new(PasswordParams {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });
        assert!(matches!(result, Err(AuthError::Configuration(_))));
    }
}
