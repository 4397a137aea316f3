use std::str::FromStr;
use std::time::Duration;

use db_infra::{build_admin_pool, orchestrate_migration_internal};
use migration::MigrationCommand;
use sea_orm::{DatabaseConnection, SqlxPostgresConnector, SqlxSqliteConnector};
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, trace};

use super::{DbKind, DbOwner, RuntimeEnv};
use crate::config::db::{
    build_connection_settings, build_session_statements, make_conn_spec, validate_db_config,
    ConnectionSettings, PoolPurpose,
};
use crate::error::AppError;

fn engine_name(db_kind: DbKind) -> &'static str {
    match db_kind {
        DbKind::Postgres => "postgresql",
        DbKind::SqliteFile | DbKind::SqliteMemory => "sqlite",
    }
}

/// Build the app DB *and* guarantee the schema is current.
///
/// - SqliteMemory: build the runtime pool and migrate on it, since every
///   in-memory connection is its own database.
/// - Others: migrate through the single-connection admin pool first, then
///   build the runtime pool. SQLite file PRAGMAs need exclusive access, so
///   they must be set before other connections exist.
pub async fn bootstrap_db(
    env: RuntimeEnv,
    db_kind: DbKind,
) -> Result<DatabaseConnection, AppError> {
    validate_db_config(env, db_kind)?;

    info!(
        env = ?env,
        db_kind = ?db_kind,
        engine = engine_name(db_kind),
        pid = std::process::id(),
        "bootstrap=start"
    );

    let settings = build_connection_settings(env, db_kind, PoolPurpose::Runtime)?;

    let conn = match db_kind {
        DbKind::SqliteMemory => {
            let pool = build_pool(env, db_kind, &settings).await?;
            orchestrate_migration_internal(&pool, env, db_kind, MigrationCommand::Up).await?;
            pool
        }
        DbKind::Postgres | DbKind::SqliteFile => {
            let admin_pool = build_admin_pool(env, db_kind).await?;
            orchestrate_migration_internal(&admin_pool, env, db_kind, MigrationCommand::Up)
                .await?;
            if let Err(e) = admin_pool.close().await {
                trace!(error = %e, "admin pool close failed");
            }
            build_pool(env, db_kind, &settings).await?
        }
    };

    info!("bootstrap=ready");
    Ok(conn)
}

/// Runtime pool with per-connection session settings applied in an
/// `after_connect` hook.
pub async fn build_pool(
    env: RuntimeEnv,
    db_kind: DbKind,
    pool_cfg: &ConnectionSettings,
) -> Result<DatabaseConnection, AppError> {
    let url = make_conn_spec(env, db_kind, DbOwner::App)?;
    let statements = build_session_statements(db_kind, &pool_cfg.db_settings);

    match db_kind {
        DbKind::SqliteFile | DbKind::SqliteMemory => {
            let connect_opts = SqliteConnectOptions::from_str(&url)
                .map_err(|e| AppError::config(format!("invalid SQLite connection options: {e}")))?
                .create_if_missing(true);

            let mut pool_opts = SqlitePoolOptions::new()
                .min_connections(pool_cfg.pool_min)
                .max_connections(pool_cfg.pool_max)
                .acquire_timeout(Duration::from_millis(pool_cfg.acquire_timeout_ms));

            // Closing the only in-memory connection drops the database with it.
            if db_kind == DbKind::SqliteMemory {
                pool_opts = pool_opts.idle_timeout(None).max_lifetime(None);
            }

            let pool = pool_opts
                .after_connect(move |conn, _meta| {
                    let statements = statements.clone();
                    Box::pin(async move {
                        for stmt in &statements {
                            sqlx::query(stmt).execute(&mut *conn).await?;
                        }
                        trace!("db=sqlite hook=after_connect ok");
                        Ok::<_, sqlx::Error>(())
                    })
                })
                .connect_with(connect_opts)
                .await
                .map_err(|e| {
                    AppError::config(format!("failed to create SQLite connection pool: {e}"))
                })?;

            // Warm-up so the hook has run before the first request.
            sqlx::query("SELECT 1;")
                .execute(&pool)
                .await
                .map_err(|e| AppError::config(format!("warmup query failed: {e}")))?;

            info!(
                engine = "sqlite",
                memory = db_kind == DbKind::SqliteMemory,
                min = pool_cfg.pool_min,
                max = pool_cfg.pool_max,
                acquire_timeout_ms = pool_cfg.acquire_timeout_ms,
                "pool=create"
            );
            Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
        }

        DbKind::Postgres => {
            // The admin pool already retried the connection, so the server is up.
            let pool = PgPoolOptions::new()
                .min_connections(pool_cfg.pool_min)
                .max_connections(pool_cfg.pool_max)
                .acquire_timeout(Duration::from_millis(pool_cfg.acquire_timeout_ms))
                .idle_timeout(Duration::from_secs(30))
                .after_connect(move |conn, _meta| {
                    let statements = statements.clone();
                    Box::pin(async move {
                        for stmt in &statements {
                            sqlx::query(stmt).execute(&mut *conn).await?;
                        }
                        Ok::<_, sqlx::Error>(())
                    })
                })
                .connect(&url)
                .await
                .map_err(|e| AppError::config(format!("failed to connect to Postgres: {e}")))?;

            info!(
                engine = "postgres",
                min = pool_cfg.pool_min,
                max = pool_cfg.pool_max,
                acquire_timeout_ms = pool_cfg.acquire_timeout_ms,
                "pool=create"
            );
            Ok(SqlxPostgresConnector::from_sqlx_postgres_pool(pool))
        }
    }
}
