//! Database configuration lives in `db-infra` so the migration CLI shares it.

pub use db_infra::config::db::{
    build_connection_settings, build_session_statements, make_conn_spec, validate_db_config,
    ConnectionSettings, DbKind, DbOwner, DbSettings, PoolPurpose, RuntimeEnv,
};
