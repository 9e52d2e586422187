//! Warden Types - Shared domain types
//!
//! This crate contains domain types used across Warden crates:
//! - Principal identity
//! - Session and reset tokens

pub mod principal;
pub mod session;

pub use principal::*;
pub use session::*;
