//! Warden DB - Credential store
//!
//! Principal persistence for Warden: a SQLx/PostgreSQL repository and an
//! in-memory repository behind the same `PrincipalRepository` trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_db::{create_pool, run_migrations, Lookup, PrincipalRepository, Repositories};
//!
//! let pool = create_pool("postgres://localhost/warden").await?;
//! run_migrations(&pool).await?;
//! let repos = Repositories::new(pool);
//!
//! let principal = repos
//!     .principals
//!     .find_by(&[Lookup::Identity("user@example.com".into())])
//!     .await?;
//! ```

pub mod error;
pub mod memory;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use memory::MemoryPrincipalRepository;
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, create_pool_with_options, run_migrations, DbPool, PoolOptions};
pub use repo::*;
