//! HTTP handlers

mod auth;
mod health;

pub use auth::{index, login, logout, profile, register_user, reset_password_token, update_password};
pub use health::{health, ready};
