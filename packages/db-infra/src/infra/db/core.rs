use std::future::Future;
use std::time::{Duration, Instant};

use migration::{migrate, MigrationCommand, Migrator, MigratorTrait};
use rand::Rng;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr,
    Statement,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use crate::config::db::{
    build_connection_settings, build_session_statements, make_conn_spec, sqlite_lock_path,
    validate_db_config, DbKind, DbOwner, DbSettings, PoolPurpose, RuntimeEnv,
};
use crate::error::DbInfraError;
use crate::infra::db::locking::{
    BootstrapLock, InMemoryLock, PgAdvisoryLock, SqliteFileLock,
};

const MIGRATION_BODY_TIMEOUT_MS: u64 = 120_000;

pub(crate) fn engine_name(db_kind: DbKind) -> &'static str {
    match db_kind {
        DbKind::Postgres => "postgresql",
        DbKind::SqliteFile | DbKind::SqliteMemory => "sqlite",
    }
}

/// Retry an async connect with a fixed interval between attempts.
pub async fn retry_connection<T, F, Fut>(
    mut connect_fn: F,
    max_attempts: u32,
    interval_ms: u64,
) -> Result<T, DbInfraError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbInfraError>>,
{
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match connect_fn().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(attempts = attempt, interval_ms, "connection_retry=success");
                }
                return Ok(result);
            }
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts,
                    interval_ms,
                    error = %e,
                    "connection_retry=failed"
                );
                last_error = Some(e);
                if attempt < max_attempts {
                    tokio::time::sleep(Duration::from_millis(interval_ms)).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| DbInfraError::config("connection retry made no attempts")))
}

/// Single-connection pool with owner credentials, used for migrations and locking.
///
/// The advisory lock lives on a session, so min=max=1 keeps every checkout on
/// the session that holds it.
pub async fn build_admin_pool(
    env: RuntimeEnv,
    db_kind: DbKind,
) -> Result<DatabaseConnection, DbInfraError> {
    let url = make_conn_spec(env, db_kind, DbOwner::Owner)?;

    let mut opt = ConnectOptions::new(&url);
    opt.min_connections(1)
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(2))
        .sqlx_logging(false);

    match db_kind {
        DbKind::Postgres => {
            retry_connection(
                || {
                    let opt = opt.clone();
                    async move {
                        Database::connect(opt).await.map_err(|e| {
                            DbInfraError::config(format!(
                                "failed to connect to Postgres (admin pool): {e}"
                            ))
                        })
                    }
                },
                5,
                500,
            )
            .await
        }
        DbKind::SqliteFile | DbKind::SqliteMemory => Database::connect(opt).await.map_err(|e| {
            DbInfraError::config(format!("failed to connect to SQLite (admin pool): {e}"))
        }),
    }
}

/// Mask the password part of a connection string.
pub fn sanitize_db_url(url: &str) -> String {
    let Some((auth, host)) = url.rsplit_once('@') else {
        return url.to_string();
    };
    match auth.rfind(':') {
        // "postgresql:" alone has no password to hide
        Some(pos) if auth[..pos].contains("//") => format!("{}:***@{}", &auth[..pos], host),
        _ => url.to_string(),
    }
}

/// True when the applied migrations match the compiled migrator exactly.
async fn fast_path_schema_check(conn: &DatabaseConnection) -> Result<bool, DbInfraError> {
    let expected = Migrator::migrations();
    let expected_last = expected.last().map(|m| m.name().to_string());

    let applied = match Migrator::get_applied_migrations(conn).await {
        Ok(applied) => applied,
        Err(DbErr::Exec(_)) | Err(DbErr::Query(_)) => {
            trace!(fastpath = "miss", reason = "migration_table_missing");
            return Ok(false);
        }
        Err(e) => {
            return Err(DbInfraError::config(format!(
                "failed to read applied migrations: {e}"
            )))
        }
    };

    let applied_last = applied.last().map(|m| m.name().to_string());
    let up_to_date = applied.len() == expected.len()
        && expected_last.is_some()
        && applied_last == expected_last;

    trace!(
        fastpath = if up_to_date { "hit" } else { "miss" },
        applied_count = applied.len(),
        expected_count = expected.len(),
        applied_last = applied_last.as_deref().unwrap_or(""),
        expected_last = expected_last.as_deref().unwrap_or("")
    );

    Ok(up_to_date)
}

/// Connect with owner credentials and run `command` under the bootstrap lock.
pub async fn orchestrate_migration(
    env: RuntimeEnv,
    db_kind: DbKind,
    command: MigrationCommand,
) -> Result<(), DbInfraError> {
    validate_db_config(env, db_kind)?;
    let admin_pool = build_admin_pool(env, db_kind).await?;
    orchestrate_migration_internal(&admin_pool, env, db_kind, command).await
}

/// Run `command` on an existing pool, serialized across processes by an
/// engine-appropriate lock.
pub async fn orchestrate_migration_internal(
    pool: &DatabaseConnection,
    env: RuntimeEnv,
    db_kind: DbKind,
    command: MigrationCommand,
) -> Result<(), DbInfraError> {
    info!(
        env = ?env,
        db_kind = ?db_kind,
        engine = engine_name(db_kind),
        command = ?command,
        "migrate=start"
    );

    if command == MigrationCommand::Status {
        migrate(pool, command)
            .await
            .map_err(|e| DbInfraError::config(format!("migration status failed: {e}")))?;
        info!("migrate=done");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let result = match db_kind {
        DbKind::Postgres => {
            let url = make_conn_spec(env, db_kind, DbOwner::Owner)?;
            let key = format!("walls:migrate:{:?}:{}", db_kind, sanitize_db_url(&url));
            let lock = PgAdvisoryLock::new(pool.clone(), &key);
            migrate_with_lock(pool, lock, env, db_kind, command, cancel).await
        }
        DbKind::SqliteFile => {
            let lock = SqliteFileLock::new(&sqlite_lock_path(db_kind, env)?);
            migrate_with_lock(pool, lock, env, db_kind, command, cancel).await
        }
        DbKind::SqliteMemory => {
            migrate_with_lock(pool, InMemoryLock, env, db_kind, command, cancel).await
        }
    };

    match &result {
        Ok(()) => info!("migrate=done"),
        Err(e) => {
            let message = e.message();
            if message.contains("database is locked") || message.contains("SQLITE_BUSY") {
                error!(error = %e, "sqlite_busy op=migrate");
            } else {
                error!(error = %e, "migrate=failed");
            }
        }
    }

    result
}

fn lock_acquire_budget_ms(env: RuntimeEnv) -> u64 {
    std::env::var("WALLS_MIGRATE_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(match env {
            RuntimeEnv::Test => 3000,
            RuntimeEnv::Prod => 900,
        })
}

async fn migrate_with_lock<L>(
    pool: &DatabaseConnection,
    mut lock: L,
    env: RuntimeEnv,
    db_kind: DbKind,
    command: MigrationCommand,
    cancel: CancellationToken,
) -> Result<(), DbInfraError>
where
    L: BootstrapLock,
{
    let settings = build_connection_settings(env, db_kind, PoolPurpose::Migration)?;
    let budget_ms = lock_acquire_budget_ms(env);
    let start = Instant::now();
    let mut attempts: u32 = 0;

    let guard = loop {
        attempts += 1;

        if command == MigrationCommand::Up && fast_path_schema_check(pool).await? {
            info!("migrate=skipped up_to_date=true");
            return Ok(());
        }

        if let Some(guard) = lock.try_acquire().await? {
            trace!(
                lock = "won",
                attempts,
                elapsed_ms = start.elapsed().as_millis()
            );
            break guard;
        }

        let delay_ms = (5u64 << attempts.saturating_sub(1).min(4)).min(80)
            + rand::rng().random_range(0..4u64);
        trace!(lock = "backoff", attempts, delay_ms);

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {
                if start.elapsed() >= Duration::from_millis(budget_ms) {
                    return Err(DbInfraError::config(format!(
                        "migration lock acquisition timeout after {:?} ({attempts} attempts)",
                        start.elapsed()
                    )));
                }
            }
            _ = cancel.cancelled() => {
                return Err(DbInfraError::config("migration cancelled while waiting for lock"));
            }
        }
    };

    let outcome =
        run_under_guard(pool, env, db_kind, command, &cancel, &settings.db_settings).await;

    if let Err(release_err) = guard.release().await {
        warn!(error = %release_err, "failed to release migration guard");
    }

    outcome
}

async fn run_under_guard(
    pool: &DatabaseConnection,
    env: RuntimeEnv,
    db_kind: DbKind,
    command: MigrationCommand,
    cancel: &CancellationToken,
    db_settings: &DbSettings,
) -> Result<(), DbInfraError> {
    let start = Instant::now();

    if db_kind == DbKind::SqliteFile {
        setup_sqlite_file_prerequisites(pool).await?;
    }
    apply_db_settings(pool, db_settings, db_kind).await?;

    let task_pool = pool.clone();
    let mut task = tokio::spawn(async move { migrate(&task_pool, command).await });

    tokio::select! {
        biased;

        joined = &mut task => match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(DbInfraError::config(format!("migration execution failed: {e}")));
            }
            Err(join_err) if join_err.is_panic() => {
                return Err(DbInfraError::config("migration task panicked"));
            }
            Err(_) => {
                return Err(DbInfraError::config("migration task was aborted"));
            }
        },
        _ = tokio::time::sleep(Duration::from_millis(MIGRATION_BODY_TIMEOUT_MS)) => {
            task.abort();
            let _ = task.await;
            return Err(DbInfraError::config(format!(
                "migration body timed out after {MIGRATION_BODY_TIMEOUT_MS}ms"
            )));
        }
        _ = cancel.cancelled() => {
            task.abort();
            let _ = task.await;
            return Err(DbInfraError::config("migration cancelled during execution"));
        }
    }

    let expected = Migrator::migrations().len();
    let applied = Migrator::get_applied_migrations(pool)
        .await
        .map(|m| m.len())
        .unwrap_or(0);

    info!(
        migrator = "ran",
        env = ?env,
        db_kind = ?db_kind,
        expected_count = expected,
        applied_count = applied,
        elapsed_ms = start.elapsed().as_millis()
    );

    match command {
        MigrationCommand::Reset if applied != 0 => Err(DbInfraError::config(format!(
            "reset left {applied} migrations applied"
        ))),
        MigrationCommand::Up | MigrationCommand::Fresh | MigrationCommand::Refresh
            if applied != expected =>
        {
            Err(DbInfraError::config(format!(
                "expected {expected} migrations applied, found {applied}"
            )))
        }
        _ => Ok(()),
    }
}

async fn apply_db_settings(
    pool: &DatabaseConnection,
    settings: &DbSettings,
    db_kind: DbKind,
) -> Result<(), DbInfraError> {
    let backend = DatabaseBackend::from(db_kind);
    for stmt in build_session_statements(db_kind, settings) {
        pool.execute(Statement::from_string(backend, stmt))
            .await
            .map_err(|e| DbInfraError::config(format!("failed to apply db settings: {e}")))?;
    }
    Ok(())
}

/// Database-wide PRAGMAs that need exclusive access, set before the runtime pool opens.
async fn setup_sqlite_file_prerequisites(pool: &DatabaseConnection) -> Result<(), DbInfraError> {
    for pragma in ["PRAGMA journal_mode = WAL;", "PRAGMA synchronous = NORMAL;"] {
        pool.execute(Statement::from_string(DatabaseBackend::Sqlite, pragma))
            .await
            .map_err(|e| DbInfraError::config(format!("failed to run '{pragma}': {e}")))?;
    }
    Ok(())
}
