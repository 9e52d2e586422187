//! Session directory
//!
//! Binds opaque session tokens to principals. Two implementations share the
//! `SessionDirectory` contract: one keeps the binding on the principal record
//! in the credential store, the other keeps an instance-owned map. Both hold
//! at most one live session per principal and only ever see token digests.
//! In both, committing a new password hash to the store ends the session in
//! the same write.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use warden_db::{Lookup, PrincipalRepository, PrincipalRow, Update};
use warden_types::SessionToken;

use crate::crypto::HmacKey;
use crate::token::generate_token;
use crate::AuthError;

/// Session binding capability
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    /// Bind a fresh token to the principal, replacing any previous binding.
    ///
    /// # Errors
    /// `NotFound` if no principal has this identity.
    async fn open(&self, identity: &str) -> Result<SessionToken, AuthError>;

    /// Principal bound to the token, if any
    async fn resolve(&self, token: &str) -> Result<Option<PrincipalRow>, AuthError>;

    /// Drop the principal's binding. Unknown or unbound identities are a no-op.
    async fn close(&self, identity: &str) -> Result<(), AuthError>;
}

/// Session binding stored as the principal's `session_token_hash`
#[derive(Clone)]
pub struct StoreSessionDirectory {
    repo: Arc<dyn PrincipalRepository>,
    key: HmacKey,
}

impl StoreSessionDirectory {
    /// Create a directory over the credential store
    pub fn new(repo: Arc<dyn PrincipalRepository>, key: HmacKey) -> Self {
        Self { repo, key }
    }
}

#[async_trait]
impl SessionDirectory for StoreSessionDirectory {
    async fn open(&self, identity: &str) -> Result<SessionToken, AuthError> {
        let principal = self
            .repo
            .find_by(&[Lookup::Identity(identity.to_string())])
            .await?;

        let token = generate_token();
        self.repo
            .update(
                principal.id,
                &[Update::SessionTokenHash(Some(self.key.digest(&token)))],
            )
            .await?;

        tracing::debug!(principal_id = %principal.id, "Session opened");
        Ok(SessionToken::new(token))
    }

    async fn resolve(&self, token: &str) -> Result<Option<PrincipalRow>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }
        let principal = self
            .repo
            .find_optional(&[Lookup::SessionTokenHash(self.key.digest(token))])
            .await?;
        Ok(principal)
    }

    async fn close(&self, identity: &str) -> Result<(), AuthError> {
        let Some(principal) = self
            .repo
            .find_optional(&[Lookup::Identity(identity.to_string())])
            .await?
        else {
            return Ok(());
        };

        if principal.has_session() {
            self.repo
                .update(principal.id, &[Update::SessionTokenHash(None)])
                .await?;
            tracing::debug!(principal_id = %principal.id, "Session closed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for StoreSessionDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSessionDirectory").finish_non_exhaustive()
    }
}

struct Binding {
    principal_id: Uuid,
    /// Digest of the password hash current when the session opened
    credential: String,
}

#[derive(Default)]
struct Bindings {
    by_digest: HashMap<String, Binding>,
    by_principal: HashMap<Uuid, String>,
}

impl Bindings {
    fn bind(&mut self, digest: String, binding: Binding) {
        if let Some(previous) = self
            .by_principal
            .insert(binding.principal_id, digest.clone())
        {
            self.by_digest.remove(&previous);
        }
        self.by_digest.insert(digest, binding);
    }

    fn unbind(&mut self, principal_id: Uuid) -> bool {
        match self.by_principal.remove(&principal_id) {
            Some(digest) => {
                self.by_digest.remove(&digest);
                true
            }
            None => false,
        }
    }

    fn unbind_digest(&mut self, digest: &str) {
        if let Some(binding) = self.by_digest.remove(digest) {
            if self.by_principal.get(&binding.principal_id).map(String::as_str) == Some(digest) {
                self.by_principal.remove(&binding.principal_id);
            }
        }
    }
}

/// Instance-owned session map, independent of the principal record
///
/// Bindings live as long as this value. The credential store is consulted
/// to resolve identities and to return the bound principal. A binding only
/// resolves while the principal's password hash is the one it was opened
/// under, so a password change in the store ends it with no further call.
#[derive(Clone)]
pub struct MemorySessionDirectory {
    repo: Arc<dyn PrincipalRepository>,
    key: HmacKey,
    bindings: Arc<RwLock<Bindings>>,
}

impl MemorySessionDirectory {
    /// Create an empty directory
    pub fn new(repo: Arc<dyn PrincipalRepository>, key: HmacKey) -> Self {
        Self {
            repo,
            key,
            bindings: Arc::new(RwLock::new(Bindings::default())),
        }
    }

    /// Number of held bindings, including ones not yet pruned after a
    /// password change
    pub async fn len(&self) -> usize {
        self.bindings.read().await.by_digest.len()
    }

    /// Whether no binding is held
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn credential(&self, principal: &PrincipalRow) -> String {
        self.key.digest(&principal.password_hash)
    }
}

#[async_trait]
impl SessionDirectory for MemorySessionDirectory {
    async fn open(&self, identity: &str) -> Result<SessionToken, AuthError> {
        let principal = self
            .repo
            .find_by(&[Lookup::Identity(identity.to_string())])
            .await?;

        let token = generate_token();
        self.bindings.write().await.bind(
            self.key.digest(&token),
            Binding {
                principal_id: principal.id,
                credential: self.credential(&principal),
            },
        );

        tracing::debug!(principal_id = %principal.id, "Session opened");
        Ok(SessionToken::new(token))
    }

    async fn resolve(&self, token: &str) -> Result<Option<PrincipalRow>, AuthError> {
        if token.is_empty() {
            return Ok(None);
        }
        let digest = self.key.digest(token);
        let (principal_id, credential) = match self.bindings.read().await.by_digest.get(&digest) {
            Some(binding) => (binding.principal_id, binding.credential.clone()),
            None => return Ok(None),
        };

        let Some(principal) = self.repo.find_optional(&[Lookup::Id(principal_id)]).await? else {
            return Ok(None);
        };

        if self.credential(&principal) != credential {
            self.bindings.write().await.unbind_digest(&digest);
            tracing::debug!(principal_id = %principal.id, "Session predates password change");
            return Ok(None);
        }
        Ok(Some(principal))
    }

    async fn close(&self, identity: &str) -> Result<(), AuthError> {
        let Some(principal) = self
            .repo
            .find_optional(&[Lookup::Identity(identity.to_string())])
            .await?
        else {
            return Ok(());
        };

        if self.bindings.write().await.unbind(principal.id) {
            tracing::debug!(principal_id = %principal.id, "Session closed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemorySessionDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySessionDirectory").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_db::{MemoryPrincipalRepository, NewPrincipal};

    fn key() -> HmacKey {
        HmacKey::new("session-directory-test-secret-0123456789").unwrap()
    }

    async fn repo_with(identity: &str) -> Arc<dyn PrincipalRepository> {
        let repo = MemoryPrincipalRepository::new();
        repo.add(NewPrincipal {
            id: Uuid::new_v4(),
            identity: identity.to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
        })
        .await
        .unwrap();
        Arc::new(repo)
    }

    fn directories(repo: Arc<dyn PrincipalRepository>) -> Vec<Box<dyn SessionDirectory>> {
        vec![
            Box::new(StoreSessionDirectory::new(Arc::clone(&repo), key())),
            Box::new(MemorySessionDirectory::new(repo, key())),
        ]
    }

    #[tokio::test]
    async fn test_open_resolve_close() {
        for dir in directories(repo_with("a@x.com").await) {
            let token = dir.open("a@x.com").await.unwrap();
            let principal = dir.resolve(token.as_str()).await.unwrap().unwrap();
            assert_eq!(principal.identity, "a@x.com");

            dir.close("a@x.com").await.unwrap();
            assert!(dir.resolve(token.as_str()).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_open_replaces_previous_binding() {
        for dir in directories(repo_with("a@x.com").await) {
            let first = dir.open("a@x.com").await.unwrap();
            let second = dir.open("a@x.com").await.unwrap();
            assert_ne!(first, second);
            assert!(dir.resolve(first.as_str()).await.unwrap().is_none());
            assert!(dir.resolve(second.as_str()).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_open_unknown_identity() {
        for dir in directories(repo_with("a@x.com").await) {
            let result = dir.open("nobody@x.com").await;
            assert!(matches!(result, Err(AuthError::NotFound)));
        }
    }

    #[tokio::test]
    async fn test_resolve_empty_and_unknown_tokens() {
        for dir in directories(repo_with("a@x.com").await) {
            dir.open("a@x.com").await.unwrap();
            assert!(dir.resolve("").await.unwrap().is_none());
            assert!(dir.resolve("not-a-session").await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        for dir in directories(repo_with("a@x.com").await) {
            dir.close("a@x.com").await.unwrap();
            dir.close("nobody@x.com").await.unwrap();
            dir.open("a@x.com").await.unwrap();
            dir.close("a@x.com").await.unwrap();
            dir.close("a@x.com").await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_store_directory_persists_digest_only() {
        let repo = repo_with("a@x.com").await;
        let dir = StoreSessionDirectory::new(Arc::clone(&repo), key());
        let token = dir.open("a@x.com").await.unwrap();

        let row = repo
            .find_by(&[Lookup::Identity("a@x.com".into())])
            .await
            .unwrap();
        let stored = row.session_token_hash.unwrap();
        assert_ne!(stored, token.as_str());
        assert_eq!(stored, key().digest(token.as_str()));
    }

    #[tokio::test]
    async fn test_memory_binding_ends_with_password_change() {
        let repo = repo_with("a@x.com").await;
        let dir = MemorySessionDirectory::new(Arc::clone(&repo), key());
        let token = dir.open("a@x.com").await.unwrap();

        let row = repo
            .find_by(&[Lookup::Identity("a@x.com".into())])
            .await
            .unwrap();
        repo.update(row.id, &[Update::PasswordHash("$argon2id$rotated".into())])
            .await
            .unwrap();

        assert!(dir.resolve(token.as_str()).await.unwrap().is_none());
        assert!(dir.is_empty().await);

        // A session opened under the new hash resolves
        let fresh = dir.open("a@x.com").await.unwrap();
        assert!(dir.resolve(fresh.as_str()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_memory_directories_are_independent() {
        let repo = repo_with("a@x.com").await;
        let one = MemorySessionDirectory::new(Arc::clone(&repo), key());
        let two = MemorySessionDirectory::new(repo, key());

        let token = one.open("a@x.com").await.unwrap();
        assert_eq!(one.len().await, 1);
        assert!(two.is_empty().await);
        assert!(two.resolve(token.as_str()).await.unwrap().is_none());
    }
}
