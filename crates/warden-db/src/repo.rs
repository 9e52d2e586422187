//! Repository traits
//!
//! The principal schema is closed: lookups and updates are enumerated
//! below, and string-keyed callers go through `from_pair`, which rejects
//! any name outside the schema.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::PrincipalRow;

/// Attribute equality used to select a principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Id(Uuid),
    Identity(String),
    SessionTokenHash(String),
    ResetTokenHash(String),
}

impl Lookup {
    /// Column this lookup compares against
    pub fn column(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::Identity(_) => "identity",
            Self::SessionTokenHash(_) => "session_token_hash",
            Self::ResetTokenHash(_) => "reset_token_hash",
        }
    }

    /// Whether `row` satisfies this equality
    pub fn matches(&self, row: &PrincipalRow) -> bool {
        match self {
            Self::Id(id) => row.id == *id,
            Self::Identity(identity) => row.identity == *identity,
            Self::SessionTokenHash(hash) => row.session_token_hash.as_deref() == Some(hash),
            Self::ResetTokenHash(hash) => row.reset_token_hash.as_deref() == Some(hash),
        }
    }

    /// Build a lookup from a field name and value
    ///
    /// # Errors
    /// `InvalidAttribute` if the field is not queryable or an `id` value is
    /// not a UUID.
    pub fn from_pair(field: &str, value: &str) -> DbResult<Self> {
        match field {
            "id" => Uuid::parse_str(value)
                .map(Self::Id)
                .map_err(|_| DbError::InvalidAttribute(format!("id: not a uuid: {value}"))),
            "identity" => Ok(Self::Identity(value.to_string())),
            "session_token_hash" => Ok(Self::SessionTokenHash(value.to_string())),
            "reset_token_hash" => Ok(Self::ResetTokenHash(value.to_string())),
            other => Err(DbError::InvalidAttribute(other.to_string())),
        }
    }
}

/// Attribute change applied to a principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    PasswordHash(String),
    SessionTokenHash(Option<String>),
    ResetTokenHash(Option<String>),
}

impl Update {
    /// Column this update writes
    pub fn column(&self) -> &'static str {
        match self {
            Self::PasswordHash(_) => "password_hash",
            Self::SessionTokenHash(_) => "session_token_hash",
            Self::ResetTokenHash(_) => "reset_token_hash",
        }
    }

    /// Apply this update to an in-memory row
    pub fn apply(&self, row: &mut PrincipalRow) {
        match self {
            Self::PasswordHash(hash) => row.password_hash.clone_from(hash),
            Self::SessionTokenHash(hash) => row.session_token_hash.clone_from(hash),
            Self::ResetTokenHash(hash) => row.reset_token_hash.clone_from(hash),
        }
    }

    /// Build an update from a field name and value (`None` clears the field)
    ///
    /// # Errors
    /// `InvalidAttribute` if the field is not updatable, or if the password
    /// hash would be cleared.
    pub fn from_pair(field: &str, value: Option<&str>) -> DbResult<Self> {
        let value = value.map(str::to_string);
        match field {
            "password_hash" => value
                .map(Self::PasswordHash)
                .ok_or_else(|| DbError::InvalidAttribute("password_hash cannot be null".into())),
            "session_token_hash" => Ok(Self::SessionTokenHash(value)),
            "reset_token_hash" => Ok(Self::ResetTokenHash(value)),
            other => Err(DbError::InvalidAttribute(other.to_string())),
        }
    }
}

/// Reject an empty predicate list
pub fn validate_lookups(lookups: &[Lookup]) -> DbResult<()> {
    if lookups.is_empty() {
        return Err(DbError::InvalidAttribute("no lookup attributes".into()));
    }
    Ok(())
}

/// Reject an empty update list or a column written twice
pub fn validate_updates(updates: &[Update]) -> DbResult<()> {
    if updates.is_empty() {
        return Err(DbError::InvalidAttribute("no update attributes".into()));
    }
    for (i, update) in updates.iter().enumerate() {
        if updates[..i].iter().any(|u| u.column() == update.column()) {
            return Err(DbError::InvalidAttribute(format!(
                "{} updated twice",
                update.column()
            )));
        }
    }
    Ok(())
}

/// New principal input
#[derive(Clone)]
pub struct NewPrincipal {
    pub id: Uuid,
    pub identity: String,
    pub password_hash: String,
}

impl std::fmt::Debug for NewPrincipal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewPrincipal")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// Principal repository trait
#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    /// Insert a new principal
    ///
    /// Fails with `DuplicateIdentity` if the identity is taken, including
    /// when a concurrent insert of the same identity wins the race.
    async fn add(&self, principal: NewPrincipal) -> DbResult<PrincipalRow>;

    /// Find the single principal matching every lookup
    ///
    /// `NotFound` on zero matches, `InvalidState` on more than one.
    async fn find_by(&self, lookups: &[Lookup]) -> DbResult<PrincipalRow>;

    /// Like `find_by`, with `NotFound` folded into `None`
    async fn find_optional(&self, lookups: &[Lookup]) -> DbResult<Option<PrincipalRow>> {
        match self.find_by(lookups).await {
            Ok(row) => Ok(Some(row)),
            Err(DbError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Apply all updates to the principal atomically
    async fn update(&self, id: Uuid, updates: &[Update]) -> DbResult<()> {
        self.update_if(id, &[], updates).await
    }

    /// Apply all updates atomically, only while every guard lookup still
    /// matches the principal. `NotFound` if the id is unknown or a guard
    /// no longer holds.
    async fn update_if(&self, id: Uuid, guard: &[Lookup], updates: &[Update]) -> DbResult<()>;

    /// Check that the backing store is reachable
    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }
}
