//! In-memory principal repository
//!
//! Backs development runs and tests. Every lookup goes through an index keyed
//! by the looked-up value. Identity and token digests are claimed through
//! their index entries, which gives the same uniqueness rules as the
//! Postgres constraints. Updates are applied under the principal entry's
//! write lock, so readers never observe a half-applied update.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::PrincipalRow;
use crate::repo::{validate_lookups, validate_updates, Lookup, NewPrincipal, PrincipalRepository, Update};

const SESSION_CONSTRAINT: &str = "principals_session_token_hash_key";
const RESET_CONSTRAINT: &str = "principals_reset_token_hash_key";

/// In-memory principal repository
#[derive(Default, Clone)]
pub struct MemoryPrincipalRepository {
    principals: Arc<DashMap<Uuid, PrincipalRow>>,
    by_identity: Arc<DashMap<String, Uuid>>,
    by_session: Arc<DashMap<String, Uuid>>,
    by_reset: Arc<DashMap<String, Uuid>>,
}

impl MemoryPrincipalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored principals
    pub fn len(&self) -> usize {
        self.principals.len()
    }

    /// Returns `true` if no principal is stored
    pub fn is_empty(&self) -> bool {
        self.principals.is_empty()
    }

    fn locate(&self, lookup: &Lookup) -> Option<Uuid> {
        let (index, value) = match lookup {
            Lookup::Id(id) => return Some(*id),
            Lookup::Identity(value) => (&self.by_identity, value),
            Lookup::SessionTokenHash(value) => (&self.by_session, value),
            Lookup::ResetTokenHash(value) => (&self.by_reset, value),
        };
        index.get(value).map(|r| *r.value())
    }
}

/// Point the digest at `id`. Fails if another principal holds it.
fn claim(index: &DashMap<String, Uuid>, digest: Option<&str>, id: Uuid, constraint: &str) -> DbResult<()> {
    let Some(digest) = digest else {
        return Ok(());
    };
    match index.entry(digest.to_string()) {
        Entry::Occupied(held) if *held.get() != id => Err(DbError::InvalidState(format!(
            "unique constraint violated: {constraint}"
        ))),
        Entry::Occupied(_) => Ok(()),
        Entry::Vacant(slot) => {
            slot.insert(id);
            Ok(())
        }
    }
}

fn release(index: &DashMap<String, Uuid>, digest: Option<&str>, id: Uuid) {
    if let Some(digest) = digest {
        index.remove_if(digest, |_, holder| *holder == id);
    }
}

#[async_trait]
impl PrincipalRepository for MemoryPrincipalRepository {
    async fn add(&self, principal: NewPrincipal) -> DbResult<PrincipalRow> {
        match self.by_identity.entry(principal.identity.clone()) {
            Entry::Occupied(_) => Err(DbError::DuplicateIdentity(principal.identity)),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let row = PrincipalRow {
                    id: principal.id,
                    identity: principal.identity,
                    password_hash: principal.password_hash,
                    session_token_hash: None,
                    reset_token_hash: None,
                    created_at: now,
                    updated_at: now,
                };
                // Row first, so an identity in the index always resolves
                self.principals.insert(row.id, row.clone());
                slot.insert(row.id);
                Ok(row)
            }
        }
    }

    async fn find_by(&self, lookups: &[Lookup]) -> DbResult<PrincipalRow> {
        validate_lookups(lookups)?;

        let id = lookups
            .first()
            .and_then(|l| self.locate(l))
            .ok_or(DbError::NotFound)?;
        self.principals
            .get(&id)
            .map(|r| r.value().clone())
            .filter(|row| lookups.iter().all(|l| l.matches(row)))
            .ok_or(DbError::NotFound)
    }

    async fn update_if(&self, id: Uuid, guard: &[Lookup], updates: &[Update]) -> DbResult<()> {
        validate_updates(updates)?;

        let mut entry = self.principals.get_mut(&id).ok_or(DbError::NotFound)?;
        if !guard.iter().all(|l| l.matches(entry.value())) {
            return Err(DbError::NotFound);
        }

        let mut updated = entry.value().clone();
        for update in updates {
            update.apply(&mut updated);
        }

        let current = entry.value();
        let session_changed = current.session_token_hash != updated.session_token_hash;
        let reset_changed = current.reset_token_hash != updated.reset_token_hash;

        // Principal entry is held, index entries are taken after it
        if session_changed {
            claim(&self.by_session, updated.session_token_hash.as_deref(), id, SESSION_CONSTRAINT)?;
        }
        if reset_changed {
            if let Err(e) = claim(&self.by_reset, updated.reset_token_hash.as_deref(), id, RESET_CONSTRAINT) {
                if session_changed {
                    release(&self.by_session, updated.session_token_hash.as_deref(), id);
                }
                return Err(e);
            }
        }
        if session_changed {
            release(&self.by_session, current.session_token_hash.as_deref(), id);
        }
        if reset_changed {
            release(&self.by_reset, current.reset_token_hash.as_deref(), id);
        }

        updated.updated_at = Utc::now();
        *entry.value_mut() = updated;
        Ok(())
    }
}
