use migration::count_applied_migrations;
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use walls_backend::config::db::{DbKind, RuntimeEnv};
use walls_backend::infra::db::bootstrap_db;

use crate::support::resolve_test_db_kind;

#[tokio::test]
async fn migration_is_idempotent() {
    let db_kind = resolve_test_db_kind().expect("Failed to resolve DB kind");

    // Each in-memory bootstrap is a fresh database; only file and server
    // backends can observe a second run against the same schema.
    if db_kind == DbKind::SqliteMemory {
        return;
    }

    let pool1 = bootstrap_db(RuntimeEnv::Test, db_kind)
        .await
        .expect("bootstrap-1");
    let before = count_applied_migrations(&pool1).await.unwrap_or(0);

    let pool2 = bootstrap_db(RuntimeEnv::Test, db_kind)
        .await
        .expect("bootstrap-2");
    let after = count_applied_migrations(&pool2).await.unwrap_or(0);

    assert_eq!(before, after, "migration count changed on second bootstrap");
}

#[tokio::test]
async fn bootstrap_applies_all_migrations_and_seeds_once() {
    let db_kind = resolve_test_db_kind().expect("Failed to resolve DB kind");
    let backend = DatabaseBackend::from(db_kind);

    let pool = bootstrap_db(RuntimeEnv::Test, db_kind)
        .await
        .expect("bootstrap");
    assert_eq!(count_applied_migrations(&pool).await.unwrap(), 2);

    let row = pool
        .query_one(Statement::from_string(
            backend,
            "SELECT COUNT(*) AS n FROM levels WHERE level_number = 1",
        ))
        .await
        .expect("count query")
        .expect("one row");
    let n: i64 = row.try_get("", "n").expect("n column");
    assert_eq!(n, 1);
}

#[tokio::test]
async fn sqlite_connections_enforce_foreign_keys() {
    let db_kind = resolve_test_db_kind().expect("Failed to resolve DB kind");
    if db_kind == DbKind::Postgres {
        return;
    }

    let pool = bootstrap_db(RuntimeEnv::Test, db_kind)
        .await
        .expect("bootstrap");
    let row = pool
        .query_one(Statement::from_string(DatabaseBackend::Sqlite, "PRAGMA foreign_keys"))
        .await
        .expect("pragma")
        .expect("one row");
    let enabled: i32 = row.try_get_by_index(0).expect("pragma value");
    assert_eq!(enabled, 1);
}

#[tokio::test]
async fn prod_rejects_in_memory_database() {
    let err = bootstrap_db(RuntimeEnv::Prod, DbKind::SqliteMemory)
        .await
        .expect_err("sqlite-memory must not run in prod");
    assert!(err.to_string().contains("sqlite-memory"));
}
