//! PostgreSQL repository implementations

mod principal;

pub use principal::PgPrincipalRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub principals: PgPrincipalRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            principals: PgPrincipalRepository::new(pool),
        }
    }
}
