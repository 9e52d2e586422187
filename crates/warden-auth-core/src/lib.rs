//! Warden Auth Core - Authentication business logic
//!
//! Credential lifecycle for Warden: salted password hashing, opaque
//! session and reset tokens, session binding and password reset.

pub mod config;
pub mod crypto;
pub mod error;
pub mod password;
pub mod service;
pub mod session;
pub mod token;

pub use config::{AuthConfig, PasswordParams, SessionBackend};
pub use crypto::{HmacKey, HmacKeyError};
pub use error::*;
pub use password::PasswordHasher;
pub use service::*;
pub use session::{MemorySessionDirectory, SessionDirectory, StoreSessionDirectory};
pub use token::generate_token;
