//! Credential store doubles with a backend that goes down

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;
use warden_db::{
    DbError, DbResult, Lookup, MemoryPrincipalRepository, NewPrincipal, PrincipalRepository,
    PrincipalRow, Update,
};

/// Store whose backend is always down
#[derive(Default, Clone, Copy)]
pub struct FailingPrincipalRepository;

fn unavailable<T>() -> DbResult<T> {
    Err(DbError::Sqlx(sqlx::Error::PoolTimedOut))
}

#[async_trait]
impl PrincipalRepository for FailingPrincipalRepository {
    async fn add(&self, _principal: NewPrincipal) -> DbResult<PrincipalRow> {
        unavailable()
    }

    async fn find_by(&self, _lookups: &[Lookup]) -> DbResult<PrincipalRow> {
        unavailable()
    }

    async fn update_if(&self, _id: Uuid, _guard: &[Lookup], _updates: &[Update]) -> DbResult<()> {
        unavailable()
    }

    async fn ping(&self) -> DbResult<()> {
        unavailable()
    }
}

/// In-memory store whose identity lookups fail once a password has changed
#[derive(Default)]
pub struct PostWriteOutageRepository {
    inner: MemoryPrincipalRepository,
    password_written: AtomicBool,
}

#[async_trait]
impl PrincipalRepository for PostWriteOutageRepository {
    async fn add(&self, principal: NewPrincipal) -> DbResult<PrincipalRow> {
        self.inner.add(principal).await
    }

    async fn find_by(&self, lookups: &[Lookup]) -> DbResult<PrincipalRow> {
        let by_identity = lookups.iter().any(|l| matches!(l, Lookup::Identity(_)));
        if by_identity && self.password_written.load(Ordering::SeqCst) {
            return unavailable();
        }
        self.inner.find_by(lookups).await
    }

    async fn update_if(&self, id: Uuid, guard: &[Lookup], updates: &[Update]) -> DbResult<()> {
        self.inner.update_if(id, guard, updates).await?;
        if updates.iter().any(|u| matches!(u, Update::PasswordHash(_))) {
            self.password_written.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn ping(&self) -> DbResult<()> {
        self.inner.ping().await
    }
}
