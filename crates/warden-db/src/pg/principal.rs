//! PostgreSQL principal repository implementation

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::PrincipalRow;
use crate::repo::{validate_lookups, validate_updates, Lookup, NewPrincipal, PrincipalRepository, Update};

const COLUMNS: &str =
    "id, identity, password_hash, session_token_hash, reset_token_hash, created_at, updated_at";

const IDENTITY_CONSTRAINT: &str = "principals_identity_key";

/// PostgreSQL principal repository
#[derive(Clone)]
pub struct PgPrincipalRepository {
    pool: PgPool,
}

impl PgPrincipalRepository {
    /// Create a new principal repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Push `column = $n` for one lookup
fn push_condition(qb: &mut QueryBuilder<'_, Postgres>, lookup: &Lookup) {
    qb.push(lookup.column()).push(" = ");
    match lookup {
        Lookup::Id(id) => qb.push_bind(*id),
        Lookup::Identity(value) | Lookup::SessionTokenHash(value) | Lookup::ResetTokenHash(value) => {
            qb.push_bind(value.clone())
        }
    };
}

/// Translate unique-constraint violations into store errors
fn map_write_error(err: sqlx::Error, identity: Option<&str>) -> DbError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return match (db_err.constraint(), identity) {
                (Some(IDENTITY_CONSTRAINT), Some(identity)) => {
                    DbError::DuplicateIdentity(identity.to_string())
                }
                (constraint, _) => DbError::InvalidState(format!(
                    "unique constraint violated: {}",
                    constraint.unwrap_or("unknown")
                )),
            };
        }
    }
    DbError::Sqlx(err)
}

#[async_trait]
impl PrincipalRepository for PgPrincipalRepository {
    async fn add(&self, principal: NewPrincipal) -> DbResult<PrincipalRow> {
        let row = sqlx::query_as::<_, PrincipalRow>(&format!(
            r#"
            INSERT INTO principals (id, identity, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(principal.id)
        .bind(&principal.identity)
        .bind(&principal.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, Some(&principal.identity)))?;

        Ok(row)
    }

    async fn find_by(&self, lookups: &[Lookup]) -> DbResult<PrincipalRow> {
        validate_lookups(lookups)?;

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM principals"));
        for (i, lookup) in lookups.iter().enumerate() {
            qb.push(if i == 0 { " WHERE " } else { " AND " });
            push_condition(&mut qb, lookup);
        }
        // Two rows are enough to detect a broken uniqueness invariant
        qb.push(" LIMIT 2");

        let mut rows = qb
            .build_query_as::<PrincipalRow>()
            .fetch_all(&self.pool)
            .await?;

        match rows.len() {
            0 => Err(DbError::NotFound),
            1 => Ok(rows.remove(0)),
            _ => {
                let columns: Vec<&str> = lookups.iter().map(Lookup::column).collect();
                tracing::error!(columns = ?columns, "Multiple principals match unique lookup");
                Err(DbError::InvalidState(format!(
                    "multiple principals match {}",
                    columns.join(", ")
                )))
            }
        }
    }

    async fn update_if(&self, id: Uuid, guard: &[Lookup], updates: &[Update]) -> DbResult<()> {
        validate_updates(updates)?;

        // A single UPDATE statement, so readers see all or none of it
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE principals SET ");
        {
            let mut set = qb.separated(", ");
            for update in updates {
                set.push(format!("{} = ", update.column()));
                match update {
                    Update::PasswordHash(hash) => set.push_bind_unseparated(hash.clone()),
                    Update::SessionTokenHash(hash) | Update::ResetTokenHash(hash) => {
                        set.push_bind_unseparated(hash.clone())
                    }
                };
            }
            set.push("updated_at = NOW()");
        }
        qb.push(" WHERE id = ").push_bind(id);
        for lookup in guard {
            qb.push(" AND ");
            push_condition(&mut qb, lookup);
        }

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, None))?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
