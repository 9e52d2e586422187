//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Principal row from the database
#[derive(Clone, PartialEq, Eq, FromRow)]
pub struct PrincipalRow {
    pub id: Uuid,
    pub identity: String,
    /// Argon2 PHC string (algorithm, parameters, salt and output)
    pub password_hash: String,
    /// Keyed digest of the active session identifier
    pub session_token_hash: Option<String>,
    /// Keyed digest of the pending reset token
    pub reset_token_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PrincipalRow {
    /// Convert to domain PrincipalId
    pub fn principal_id(&self) -> warden_types::PrincipalId {
        warden_types::PrincipalId(self.id)
    }

    /// Public view of this row, without credential material
    pub fn to_principal(&self) -> warden_types::Principal {
        warden_types::Principal {
            id: self.principal_id(),
            identity: self.identity.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Whether a session is currently bound to this principal
    pub fn has_session(&self) -> bool {
        self.session_token_hash.is_some()
    }

    /// Whether a password reset is pending
    pub fn has_pending_reset(&self) -> bool {
        self.reset_token_hash.is_some()
    }
}

impl From<PrincipalRow> for warden_types::Principal {
    fn from(row: PrincipalRow) -> Self {
        Self {
            id: warden_types::PrincipalId(row.id),
            identity: row.identity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl std::fmt::Debug for PrincipalRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrincipalRow")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("has_session", &self.has_session())
            .field("has_pending_reset", &self.has_pending_reset())
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}
