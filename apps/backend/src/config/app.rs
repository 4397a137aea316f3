use std::env;
use std::path::{Path, PathBuf};

use crate::config::db::{DbKind, RuntimeEnv};
use crate::error::AppError;

const DEFAULT_MODEL_PATH: &str = "models/yolo26x-pose.onnx";

/// Origins the game clients are served from during development.
pub const DEFAULT_CORS_ORIGINS: [&str; 6] = [
    "http://localhost:8080",
    "http://127.0.0.1:8080",
    "http://localhost:5000",
    "http://127.0.0.1:5000",
    "http://localhost:3000",
    "http://127.0.0.1:3000",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PoseConfig {
    /// Absolute (or base-dir resolved) path of the ONNX pose model
    pub model_path: PathBuf,
    /// Load the model during startup instead of on the first request
    pub preload: bool,
}

impl PoseConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            preload: false,
        }
    }
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_PATH)
    }
}

/// Process configuration read once from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: RuntimeEnv,
    pub db_kind: DbKind,
    pub cors_origins: Vec<String>,
    pub pose: PoseConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let host = env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port_raw = env::var("BACKEND_PORT").unwrap_or_else(|_| "8000".to_string());
        let port = port_raw.parse::<u16>().map_err(|_| {
            AppError::config(format!("BACKEND_PORT must be a valid port, got '{port_raw}'"))
        })?;

        let runtime_env = match env::var("APP_ENV") {
            Ok(raw) => parse_runtime_env(&raw)?,
            Err(_) => RuntimeEnv::Prod,
        };

        let db_kind = match env::var("DB_KIND") {
            Ok(raw) => raw.parse::<DbKind>()?,
            Err(_) => DbKind::Postgres,
        };

        let cors_origins = parse_origins(&env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default());

        let base_dir = env::var("POSE_MODEL_BASE_DIR")
            .map(PathBuf::from)
            .or_else(|_| env::current_dir())
            .map_err(|e| AppError::config(format!("cannot determine model base dir: {e}")))?;
        let raw_model = env::var("POSE_MODEL_PATH").unwrap_or_else(|_| DEFAULT_MODEL_PATH.into());

        let preload = env::var("POSE_PRELOAD")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            env: runtime_env,
            db_kind,
            cors_origins,
            pose: PoseConfig {
                model_path: resolve_model_path(&base_dir, &raw_model),
                preload,
            },
        })
    }
}

fn parse_runtime_env(raw: &str) -> Result<RuntimeEnv, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "prod" | "production" => Ok(RuntimeEnv::Prod),
        "test" => Ok(RuntimeEnv::Test),
        other => Err(AppError::config(format!(
            "APP_ENV must be prod or test, got '{other}'"
        ))),
    }
}

/// Relative model paths are taken from `base_dir`.
pub fn resolve_model_path(base_dir: &Path, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Comma-separated origins; blank, "null" and non-http entries are ignored.
/// Falls back to [`DEFAULT_CORS_ORIGINS`] when nothing usable is configured.
pub fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "null")
        .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect()
    } else {
        origins
    }
}
