//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error (connection loss, pool exhaustion, protocol failure)
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// Identity already registered
    #[error("identity already registered: {0}")]
    DuplicateIdentity(String),

    /// Lookup or update names a field outside the principal schema
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// Store contents violate a uniqueness invariant
    #[error("invalid store state: {0}")]
    InvalidState(String),
}

/// Result alias for store operations
pub type DbResult<T> = Result<T, DbError>;
