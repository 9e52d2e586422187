//! Postgres store tests
//!
//! Each test gets a fresh database with `migrations/` applied. They need a
//! reachable server: `DATABASE_URL=postgres://... cargo test -p warden-db -- --ignored`

use sqlx::PgPool;
use uuid::Uuid;
use warden_db::pg::PgPrincipalRepository;
use warden_db::{DbError, Lookup, NewPrincipal, PrincipalRepository, Update};

fn new_principal(identity: &str) -> NewPrincipal {
    NewPrincipal {
        id: Uuid::new_v4(),
        identity: identity.to_string(),
        password_hash: "$argon2id$stub".to_string(),
    }
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_add_duplicate_identity(pool: PgPool) {
    let repo = PgPrincipalRepository::new(pool);
    let row = repo.add(new_principal("a@x.com")).await.unwrap();

    let result = repo.add(new_principal("a@x.com")).await;
    assert!(matches!(result, Err(DbError::DuplicateIdentity(ref i)) if i == "a@x.com"));

    let found = repo
        .find_by(&[Lookup::Identity("a@x.com".into())])
        .await
        .unwrap();
    assert_eq!(found.id, row.id);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_add_single_winner(pool: PgPool) {
    let repo = PgPrincipalRepository::new(pool);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.add(new_principal("race@x.com")).await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(DbError::DuplicateIdentity(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(wins, 1);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_update_if_consumed_guard_is_not_found(pool: PgPool) {
    let repo = PgPrincipalRepository::new(pool);
    let row = repo.add(new_principal("a@x.com")).await.unwrap();
    repo.update(
        row.id,
        &[
            Update::SessionTokenHash(Some("s1".into())),
            Update::ResetTokenHash(Some("r1".into())),
        ],
    )
    .await
    .unwrap();

    let guard = [Lookup::ResetTokenHash("r1".into())];
    let consume = [
        Update::PasswordHash("$argon2id$new".into()),
        Update::ResetTokenHash(None),
        Update::SessionTokenHash(None),
    ];
    repo.update_if(row.id, &guard, &consume).await.unwrap();
    assert!(matches!(
        repo.update_if(row.id, &guard, &consume).await,
        Err(DbError::NotFound)
    ));

    let found = repo.find_by(&[Lookup::Id(row.id)]).await.unwrap();
    assert_eq!(found.password_hash, "$argon2id$new");
    assert!(!found.has_session());
    assert!(!found.has_pending_reset());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_update_unknown_id_is_not_found(pool: PgPool) {
    let repo = PgPrincipalRepository::new(pool);
    assert!(matches!(
        repo.update(Uuid::new_v4(), &[Update::SessionTokenHash(None)]).await,
        Err(DbError::NotFound)
    ));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_token_digest_held_by_another_principal(pool: PgPool) {
    let repo = PgPrincipalRepository::new(pool);
    let a = repo.add(new_principal("a@x.com")).await.unwrap();
    let b = repo.add(new_principal("b@x.com")).await.unwrap();
    repo.update(a.id, &[Update::SessionTokenHash(Some("shared".into()))])
        .await
        .unwrap();

    let result = repo
        .update(b.id, &[Update::SessionTokenHash(Some("shared".into()))])
        .await;
    assert!(matches!(
        result,
        Err(DbError::InvalidState(ref m)) if m.contains("principals_session_token_hash_key")
    ));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_find_by_shared_digest_is_invalid_state(pool: PgPool) {
    // Drop the constraint so the table can reach the state it guards against
    sqlx::query("ALTER TABLE principals DROP CONSTRAINT principals_session_token_hash_key")
        .execute(&pool)
        .await
        .unwrap();

    let repo = PgPrincipalRepository::new(pool);
    let a = repo.add(new_principal("a@x.com")).await.unwrap();
    let b = repo.add(new_principal("b@x.com")).await.unwrap();
    for id in [a.id, b.id] {
        repo.update(id, &[Update::SessionTokenHash(Some("shared".into()))])
            .await
            .unwrap();
    }

    let result = repo
        .find_by(&[Lookup::SessionTokenHash("shared".into())])
        .await;
    assert!(matches!(result, Err(DbError::InvalidState(_))));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_ping(pool: PgPool) {
    let repo = PgPrincipalRepository::new(pool);
    repo.ping().await.unwrap();
}
