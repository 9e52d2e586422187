//! Common test utilities for warden-auth-core integration tests

pub mod failing_repo;

#[allow(unused_imports)]
pub use failing_repo::{FailingPrincipalRepository, PostWriteOutageRepository};

use secrecy::Secret;
use std::sync::Arc;
use warden_auth_core::{AuthConfig, AuthService, PasswordParams, SessionBackend};
use warden_db::{MemoryPrincipalRepository, PrincipalRepository};

pub const TEST_SECRET: &str = "integration-test-token-secret-0123456789";

/// Argon2 parameters cheap enough for tests
pub fn cheap_params() -> PasswordParams {
    PasswordParams {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}

pub fn test_config(backend: SessionBackend) -> AuthConfig {
    AuthConfig::try_new(TEST_SECRET)
        .unwrap()
        .with_session_backend(backend)
        .with_password_params(cheap_params())
}

/// Service over a fresh in-memory store, returning the store as well
#[allow(dead_code)]
pub fn service_with_repo(backend: SessionBackend) -> (AuthService, Arc<MemoryPrincipalRepository>) {
    let repo = Arc::new(MemoryPrincipalRepository::new());
    let dyn_repo: Arc<dyn PrincipalRepository> = repo.clone();
    let service = AuthService::new(test_config(backend), dyn_repo).unwrap();
    (service, repo)
}

#[allow(dead_code)]
pub fn service(backend: SessionBackend) -> AuthService {
    service_with_repo(backend).0
}

pub fn secret(s: &str) -> Secret<String> {
    Secret::new(s.to_string())
}
