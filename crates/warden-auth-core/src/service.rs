//! Auth service - ties together the credential store, password hashing,
//! token generation and the session directory

use secrecy::Secret;
use std::sync::Arc;
use uuid::Uuid;
use warden_db::{DbError, Lookup, NewPrincipal, PrincipalRepository, Update};
use warden_types::{Principal, ResetToken, SessionToken};

use crate::{
    config::{AuthConfig, SessionBackend},
    crypto::HmacKey,
    password::PasswordHasher,
    session::{MemorySessionDirectory, SessionDirectory, StoreSessionDirectory},
    token::generate_token,
    AuthError,
};

/// Authentication service
///
/// Provides the credential lifecycle:
/// - Registration and password login
/// - Session creation, resolution and logout
/// - Single-use password reset tokens
pub struct AuthService {
    config: AuthConfig,
    repo: Arc<dyn PrincipalRepository>,
    sessions: Arc<dyn SessionDirectory>,
    hasher: PasswordHasher,
    token_key: HmacKey,
}

impl AuthService {
    /// Create a new auth service with the session directory named by the config
    pub fn new(config: AuthConfig, repo: Arc<dyn PrincipalRepository>) -> Result<Self, AuthError> {
        let token_key = token_key(&config)?;
        let sessions: Arc<dyn SessionDirectory> = match config.session_backend {
            SessionBackend::Store => Arc::new(StoreSessionDirectory::new(
                Arc::clone(&repo),
                token_key.clone(),
            )),
            SessionBackend::Memory => Arc::new(MemorySessionDirectory::new(
                Arc::clone(&repo),
                token_key.clone(),
            )),
        };
        Self::assemble(config, repo, sessions, token_key)
    }

    /// Create a new auth service over an existing session directory
    pub fn with_session_directory(
        config: AuthConfig,
        repo: Arc<dyn PrincipalRepository>,
        sessions: Arc<dyn SessionDirectory>,
    ) -> Result<Self, AuthError> {
        let token_key = token_key(&config)?;
        Self::assemble(config, repo, sessions, token_key)
    }

    fn assemble(
        config: AuthConfig,
        repo: Arc<dyn PrincipalRepository>,
        sessions: Arc<dyn SessionDirectory>,
        token_key: HmacKey,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            hasher: PasswordHasher::new(config.password_params)?,
            token_key,
            config,
            repo,
            sessions,
        })
    }

    // =========================================================================
    // Credentials
    // =========================================================================

    /// Register a new principal
    pub async fn register(
        &self,
        identity: &str,
        password: Secret<String>,
    ) -> Result<Principal, AuthError> {
        if self
            .repo
            .find_optional(&[Lookup::Identity(identity.to_string())])
            .await?
            .is_some()
        {
            return Err(AuthError::DuplicateIdentity);
        }

        let password_hash = self.hash_password(password).await?;

        // A concurrent registration can still win here; the store reports it
        let row = self
            .repo
            .add(NewPrincipal {
                id: Uuid::new_v4(),
                identity: identity.to_string(),
                password_hash,
            })
            .await?;

        tracing::info!(principal_id = %row.id, "Principal registered");
        Ok(row.into())
    }

    /// Check a password login. Unknown identities are `false`, not an error.
    pub async fn login(&self, identity: &str, password: Secret<String>) -> Result<bool, AuthError> {
        let principal = self
            .repo
            .find_optional(&[Lookup::Identity(identity.to_string())])
            .await?;

        let hasher = self.hasher.clone();
        let Some(principal) = principal else {
            tokio::task::spawn_blocking(move || hasher.verify_dummy(&password))
                .await
                .map_err(join_error)?;
            tracing::debug!("Login for unknown identity");
            return Ok(false);
        };

        let stored_hash = principal.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
            .await
            .map_err(join_error)??;

        tracing::debug!(principal_id = %principal.id, valid, "Login checked");
        Ok(valid)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Open a session for the identity; `None` if it is not registered
    pub async fn create_session(&self, identity: &str) -> Result<Option<SessionToken>, AuthError> {
        match self.sessions.open(identity).await {
            Ok(token) => Ok(Some(token)),
            Err(AuthError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Principal owning the session token
    pub async fn resolve_session(&self, token: &str) -> Result<Option<Principal>, AuthError> {
        let principal = self.sessions.resolve(token).await?;
        Ok(principal.map(Principal::from))
    }

    /// End the identity's session, if any
    pub async fn destroy_session(&self, identity: &str) -> Result<(), AuthError> {
        self.sessions.close(identity).await
    }

    // =========================================================================
    // Password reset
    // =========================================================================

    /// Issue a reset token, replacing any pending one.
    ///
    /// # Errors
    /// `NotFound` if the identity is not registered.
    pub async fn request_reset_token(&self, identity: &str) -> Result<ResetToken, AuthError> {
        let principal = self
            .repo
            .find_by(&[Lookup::Identity(identity.to_string())])
            .await?;

        let token = generate_token();
        self.repo
            .update(
                principal.id,
                &[Update::ResetTokenHash(Some(self.token_key.digest(&token)))],
            )
            .await?;

        tracing::info!(principal_id = %principal.id, "Reset token issued");
        Ok(ResetToken::new(token))
    }

    /// Consume a reset token and set a new password.
    ///
    /// The password hash, the reset token and the stored session binding
    /// change in one store write guarded on the token still being pending.
    /// Map-held sessions stop resolving once the new hash is committed, so
    /// nothing is left to undo after the write.
    ///
    /// # Errors
    /// `InvalidToken` if no principal holds this token, including when it
    /// was already used.
    pub async fn update_password(
        &self,
        reset_token: &str,
        new_password: Secret<String>,
    ) -> Result<(), AuthError> {
        if reset_token.is_empty() {
            return Err(AuthError::InvalidToken);
        }

        let digest = self.token_key.digest(reset_token);
        let guard = [Lookup::ResetTokenHash(digest)];
        let Some(principal) = self.repo.find_optional(&guard).await? else {
            tracing::debug!("Reset attempted with unknown token");
            return Err(AuthError::InvalidToken);
        };

        let password_hash = self.hash_password(new_password).await?;

        let updates = [
            Update::PasswordHash(password_hash),
            Update::ResetTokenHash(None),
            Update::SessionTokenHash(None),
        ];
        match self.repo.update_if(principal.id, &guard, &updates).await {
            Ok(()) => {}
            Err(DbError::NotFound) => {
                tracing::debug!(principal_id = %principal.id, "Reset token consumed concurrently");
                return Err(AuthError::InvalidToken);
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(principal_id = %principal.id, "Password updated");
        Ok(())
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Check that the credential store is reachable
    pub async fn ping(&self) -> Result<(), AuthError> {
        self.repo.ping().await.map_err(AuthError::from)
    }

    /// Service configuration
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    async fn hash_password(&self, password: Secret<String>) -> Result<String, AuthError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(join_error)?
    }
}

fn token_key(config: &AuthConfig) -> Result<HmacKey, AuthError> {
    HmacKey::new(config.token_secret.as_bytes()).map_err(|e| AuthError::Configuration(e.to_string()))
}

fn join_error(e: tokio::task::JoinError) -> AuthError {
    tracing::error!("Password task failed: {}", e);
    AuthError::Internal("password task failed".to_string())
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
