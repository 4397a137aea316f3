use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::DbInfraError;

/// Stable advisory-lock id for a textual key.
pub fn pg_lock_id(key: &str) -> i64 {
    xxh3_64(key.as_bytes()) as i64
}

enum GuardKind {
    Postgres {
        admin_pool: DatabaseConnection,
        lock_key: i64,
    },
    SqliteFile {
        file: File,
        lock_path: PathBuf,
    },
    InMemory,
}

/// A held bootstrap lock. Must be released with [`Guard::release`].
pub struct Guard {
    kind: GuardKind,
}

impl Guard {
    pub async fn release(self) -> Result<(), DbInfraError> {
        match self.kind {
            GuardKind::InMemory => Ok(()),
            GuardKind::SqliteFile { file, lock_path } => {
                // Dropping the handle releases the OS lock even if unlock fails.
                if let Err(e) = fs4::fs_std::FileExt::unlock(&file) {
                    debug!(error = %e, lock_path = %lock_path.display(), "sqlite lock unlock error");
                } else {
                    debug!(lock_path = %lock_path.display(), "sqlite lock released");
                }
                Ok(())
            }
            GuardKind::Postgres {
                admin_pool,
                lock_key,
            } => {
                let stmt = Statement::from_sql_and_values(
                    DatabaseBackend::Postgres,
                    "SELECT pg_advisory_unlock($1) AS unlocked",
                    vec![lock_key.into()],
                );
                match admin_pool.query_one(stmt).await {
                    Ok(Some(row)) => {
                        let unlocked: bool = row.try_get("", "unlocked").map_err(|e| {
                            DbInfraError::config(format!("failed to read unlock result: {e}"))
                        })?;
                        if !unlocked {
                            warn!(lock_key, "advisory unlock returned false");
                        }
                    }
                    Ok(None) => warn!(lock_key, "advisory unlock returned no row"),
                    Err(e) => warn!(error = %e, lock_key, "advisory unlock failed"),
                }
                Ok(())
            }
        }
    }
}

/// Non-blocking lock used to serialize schema bootstrap across processes.
#[async_trait]
pub trait BootstrapLock {
    /// `Some(guard)` when acquired, `None` when another holder has it.
    async fn try_acquire(&mut self) -> Result<Option<Guard>, DbInfraError>;
}

/// Session-level `pg_try_advisory_lock` on the admin pool.
///
/// The admin pool must be min=max=1 so unlock runs on the locking session.
pub struct PgAdvisoryLock {
    admin_pool: DatabaseConnection,
    lock_key: i64,
}

impl PgAdvisoryLock {
    pub fn new(admin_pool: DatabaseConnection, key: &str) -> Self {
        Self {
            admin_pool,
            lock_key: pg_lock_id(key),
        }
    }
}

#[async_trait]
impl BootstrapLock for PgAdvisoryLock {
    async fn try_acquire(&mut self) -> Result<Option<Guard>, DbInfraError> {
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            "SELECT pg_try_advisory_lock($1) AS locked",
            vec![self.lock_key.into()],
        );

        let row = self
            .admin_pool
            .query_one(stmt)
            .await
            .map_err(|e| DbInfraError::config(format!("failed to acquire advisory lock: {e}")))?
            .ok_or_else(|| DbInfraError::config("pg_try_advisory_lock returned no row"))?;

        let locked: bool = row
            .try_get("", "locked")
            .map_err(|e| DbInfraError::config(format!("failed to read lock result: {e}")))?;

        Ok(locked.then(|| Guard {
            kind: GuardKind::Postgres {
                admin_pool: self.admin_pool.clone(),
                lock_key: self.lock_key,
            },
        }))
    }
}

/// Exclusive OS file lock on `<db>.migrate.lock`.
pub struct SqliteFileLock {
    lock_path: PathBuf,
}

impl SqliteFileLock {
    pub fn new(lock_path: &Path) -> Self {
        Self {
            lock_path: lock_path.to_path_buf(),
        }
    }
}

#[async_trait]
impl BootstrapLock for SqliteFileLock {
    async fn try_acquire(&mut self) -> Result<Option<Guard>, DbInfraError> {
        use fs4::fs_std::FileExt;

        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbInfraError::config(format!("failed to create lock directory: {e}"))
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| DbInfraError::config(format!("failed to open lock file: {e}")))?;

        match file.try_lock_exclusive() {
            Ok(true) => {
                debug!(lock_path = %self.lock_path.display(), "sqlite lock acquired");
                Ok(Some(Guard {
                    kind: GuardKind::SqliteFile {
                        file,
                        lock_path: self.lock_path.clone(),
                    },
                }))
            }
            Ok(false) => Ok(None),
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(DbInfraError::config(format!(
                "failed to lock {}: {e}",
                self.lock_path.display()
            ))),
        }
    }
}

/// In-memory databases live in one process; nothing to coordinate.
pub struct InMemoryLock;

#[async_trait]
impl BootstrapLock for InMemoryLock {
    async fn try_acquire(&mut self) -> Result<Option<Guard>, DbInfraError> {
        Ok(Some(Guard {
            kind: GuardKind::InMemory,
        }))
    }
}
