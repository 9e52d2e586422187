//! Auth errors

use thiserror::Error;
use warden_db::DbError;

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Identity is already registered
    #[error("identity already registered")]
    DuplicateIdentity,

    /// No principal for the given identity
    #[error("principal not found")]
    NotFound,

    /// Reset token does not match any pending token
    #[error("invalid token")]
    InvalidToken,

    /// Store was asked about a field outside the principal schema
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// Store contents violate an invariant (duplicate uniques, bad hash)
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Credential store unreachable or failing
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::DuplicateIdentity => 400,
            Self::NotFound | Self::InvalidToken => 403,
            Self::Unavailable(_) => 503,
            Self::InvalidAttribute(_)
            | Self::InvalidState(_)
            | Self::Configuration(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateIdentity => "DUPLICATE_IDENTITY",
            Self::NotFound => "FORBIDDEN",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::InvalidAttribute(_) => "INVALID_ATTRIBUTE",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Unavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error signals a bug or data-integrity violation
    pub fn is_integrity_fault(&self) -> bool {
        matches!(self, Self::InvalidAttribute(_) | Self::InvalidState(_))
    }
}

impl From<DbError> for AuthError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => Self::NotFound,
            DbError::DuplicateIdentity(_) => Self::DuplicateIdentity,
            DbError::InvalidAttribute(attribute) => {
                tracing::error!(attribute = %attribute, "Invalid store attribute");
                Self::InvalidAttribute(attribute)
            }
            DbError::InvalidState(detail) => {
                tracing::error!(detail = %detail, "Credential store integrity violation");
                Self::InvalidState(detail)
            }
            DbError::Sqlx(e) => {
                tracing::error!("Database error: {}", e);
                Self::Unavailable(e.to_string())
            }
        }
    }
}
