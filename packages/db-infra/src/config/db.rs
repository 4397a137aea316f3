use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use sea_orm::DatabaseBackend;

use crate::error::DbInfraError;

/// Runtime environment the process is configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeEnv {
    Prod,
    Test,
}

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbKind {
    Postgres,
    SqliteFile,
    SqliteMemory,
}

impl FromStr for DbKind {
    type Err = DbInfraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "sqlite-file" | "sqlite_file" | "sqlite" => Ok(Self::SqliteFile),
            "sqlite-memory" | "sqlite_memory" | "memory" => Ok(Self::SqliteMemory),
            other => Err(DbInfraError::config(format!(
                "unsupported database kind '{other}' (expected postgres | sqlite-file | sqlite-memory)"
            ))),
        }
    }
}

impl From<DbKind> for DatabaseBackend {
    fn from(kind: DbKind) -> Self {
        match kind {
            DbKind::Postgres => DatabaseBackend::Postgres,
            DbKind::SqliteFile | DbKind::SqliteMemory => DatabaseBackend::Sqlite,
        }
    }
}

/// Which credentials a connection uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbOwner {
    /// Application-level access (runtime queries)
    App,
    /// Owner-level access (schema changes / migrations)
    Owner,
}

/// What a pool is going to be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolPurpose {
    Runtime,
    Migration,
}

/// Per-session settings applied to every new connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbSettings {
    Postgres {
        app_name: String,
        statement_timeout: String,
    },
    Sqlite {
        busy_timeout_ms: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub pool_min: u32,
    pub pool_max: u32,
    pub acquire_timeout_ms: u64,
    pub db_settings: DbSettings,
}

/// Database connection parameters read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub app_user: String,
    pub app_password: String,
    pub owner_user: String,
    pub owner_password: String,
    pub prod_db: String,
    pub test_db: String,
    pub sqlite_dir: PathBuf,
}

impl DbConfig {
    pub fn from_env() -> Result<Self, DbInfraError> {
        let port_raw = env::var("POSTGRES_PORT").unwrap_or_else(|_| "5432".to_string());
        let port = port_raw.parse::<u16>().map_err(|_| {
            DbInfraError::config(format!("POSTGRES_PORT must be a valid port, got '{port_raw}'"))
        })?;

        let app_user = env::var("APP_DB_USER").unwrap_or_else(|_| "wallsincoming".to_string());
        let app_password =
            env::var("APP_DB_PASSWORD").unwrap_or_else(|_| "wallsincoming".to_string());

        Ok(Self {
            host: env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port,
            owner_user: env::var("WALLS_OWNER_USER").unwrap_or_else(|_| app_user.clone()),
            owner_password: env::var("WALLS_OWNER_PASSWORD")
                .unwrap_or_else(|_| app_password.clone()),
            app_user,
            app_password,
            prod_db: env::var("PROD_DB").unwrap_or_else(|_| "wallsincoming".to_string()),
            test_db: env::var("TEST_DB").unwrap_or_else(|_| "wallsincoming_test".to_string()),
            sqlite_dir: env::var("SQLITE_DB_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
        })
    }

    fn db_name(&self, env: RuntimeEnv) -> Result<&str, DbInfraError> {
        match env {
            RuntimeEnv::Prod => Ok(&self.prod_db),
            RuntimeEnv::Test => {
                // Enforce safety: test DB must end with "_test"
                if !self.test_db.ends_with("_test") {
                    return Err(DbInfraError::config(format!(
                        "Test profile requires database name to end with '_test', but got: '{}'",
                        self.test_db
                    )));
                }
                Ok(&self.test_db)
            }
        }
    }

    fn credentials(&self, owner: DbOwner) -> (&str, &str) {
        match owner {
            DbOwner::App => (&self.app_user, &self.app_password),
            DbOwner::Owner => (&self.owner_user, &self.owner_password),
        }
    }

    /// Path of the SQLite database file for the given environment.
    pub fn sqlite_file(&self, env: RuntimeEnv) -> Result<PathBuf, DbInfraError> {
        let name = self.db_name(env)?;
        Ok(self.sqlite_dir.join(format!("{name}.sqlite")))
    }

    /// Connection string for the given environment, engine and owner.
    pub fn conn_spec(
        &self,
        env: RuntimeEnv,
        db_kind: DbKind,
        owner: DbOwner,
    ) -> Result<String, DbInfraError> {
        match db_kind {
            DbKind::Postgres => {
                let db_name = self.db_name(env)?;
                let (user, password) = self.credentials(owner);
                let user = utf8_percent_encode(user, NON_ALPHANUMERIC);
                let password = utf8_percent_encode(password, NON_ALPHANUMERIC);
                Ok(format!(
                    "postgresql://{user}:{password}@{}:{}/{db_name}",
                    self.host, self.port
                ))
            }
            DbKind::SqliteFile => {
                let path = self.sqlite_file(env)?;
                Ok(format!("sqlite://{}?mode=rwc", path.display()))
            }
            DbKind::SqliteMemory => Ok("sqlite::memory:".to_string()),
        }
    }
}

/// Builds a connection string from environment configuration.
pub fn make_conn_spec(
    env: RuntimeEnv,
    db_kind: DbKind,
    owner: DbOwner,
) -> Result<String, DbInfraError> {
    DbConfig::from_env()?.conn_spec(env, db_kind, owner)
}

/// Lock file used to serialize migrations against a SQLite file (`<db>.migrate.lock`).
pub fn sqlite_lock_path(db_kind: DbKind, env: RuntimeEnv) -> Result<PathBuf, DbInfraError> {
    match db_kind {
        DbKind::SqliteFile => {
            let file = DbConfig::from_env()?.sqlite_file(env)?;
            Ok(lock_path_for(&file))
        }
        _ => Err(DbInfraError::config(
            "sqlite_lock_path only works with the sqlite-file database kind",
        )),
    }
}

pub fn lock_path_for(db_file: &Path) -> PathBuf {
    db_file.with_extension("migrate.lock")
}

/// Reject combinations that cannot work.
pub fn validate_db_config(env: RuntimeEnv, db_kind: DbKind) -> Result<(), DbInfraError> {
    if env == RuntimeEnv::Prod && db_kind == DbKind::SqliteMemory {
        return Err(DbInfraError::config(
            "sqlite-memory is ephemeral and cannot be used with the prod environment",
        ));
    }
    Ok(())
}

pub fn build_connection_settings(
    env: RuntimeEnv,
    db_kind: DbKind,
    purpose: PoolPurpose,
) -> Result<ConnectionSettings, DbInfraError> {
    let db_settings = match db_kind {
        DbKind::Postgres => DbSettings::Postgres {
            app_name: match purpose {
                PoolPurpose::Runtime => "walls-backend".to_string(),
                PoolPurpose::Migration => "walls-migrate".to_string(),
            },
            statement_timeout: match purpose {
                PoolPurpose::Runtime => "15s".to_string(),
                PoolPurpose::Migration => "0".to_string(),
            },
        },
        DbKind::SqliteFile | DbKind::SqliteMemory => DbSettings::Sqlite {
            busy_timeout_ms: 5000,
        },
    };

    // Every in-memory connection is its own database, so the pool must hold exactly one.
    let (pool_min, pool_max) = match (db_kind, purpose) {
        (DbKind::SqliteMemory, _) => (1, 1),
        (_, PoolPurpose::Migration) => (1, 1),
        (DbKind::SqliteFile, PoolPurpose::Runtime) => (1, 4),
        (DbKind::Postgres, PoolPurpose::Runtime) => match env {
            RuntimeEnv::Prod => (2, 10),
            RuntimeEnv::Test => (1, 4),
        },
    };

    Ok(ConnectionSettings {
        pool_min,
        pool_max,
        acquire_timeout_ms: 5000,
        db_settings,
    })
}

/// Build ordered session-level SQL statements for the given database kind and settings.
/// SQLite file prerequisites (journal_mode, synchronous) are handled separately.
pub fn build_session_statements(db_kind: DbKind, settings: &DbSettings) -> Vec<String> {
    match (db_kind, settings) {
        (DbKind::SqliteFile | DbKind::SqliteMemory, DbSettings::Sqlite { busy_timeout_ms }) => {
            vec![
                "PRAGMA foreign_keys = ON;".to_string(),
                format!("PRAGMA busy_timeout = {busy_timeout_ms};"),
            ]
        }
        (
            DbKind::Postgres,
            DbSettings::Postgres {
                app_name,
                statement_timeout,
            },
        ) => vec![
            // application_name is safe to single-quote; minimal escaping
            format!("SET application_name = '{}';", app_name.replace('\'', "''")),
            "SET timezone = 'UTC';".to_string(),
            "SET client_encoding = 'UTF8';".to_string(),
            format!("SET statement_timeout = '{statement_timeout}';"),
        ],
        _ => Vec::new(),
    }
}
