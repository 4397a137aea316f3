use std::sync::Arc;

use tracing::info;

use crate::config::app::PoseConfig;
use crate::config::db::{DbKind, RuntimeEnv};
use crate::error::AppError;
use crate::infra::db::bootstrap_db;
use crate::pose::PoseService;
use crate::state::app_state::AppState;

/// Builder for creating AppState instances (used in both tests and main)
pub struct StateBuilder {
    env: RuntimeEnv,
    db_kind: Option<DbKind>,
    pose_config: PoseConfig,
    pose_service: Option<Arc<PoseService>>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            env: RuntimeEnv::Prod,
            db_kind: None,
            pose_config: PoseConfig::default(),
            pose_service: None,
        }
    }

    pub fn with_env(mut self, env: RuntimeEnv) -> Self {
        self.env = env;
        self
    }

    pub fn with_db(mut self, db_kind: DbKind) -> Self {
        self.db_kind = Some(db_kind);
        self
    }

    pub fn with_pose_config(mut self, config: PoseConfig) -> Self {
        self.pose_config = config;
        self
    }

    /// Use a prebuilt service instead of the ONNX model from the pose config.
    pub fn with_pose_service(mut self, service: Arc<PoseService>) -> Self {
        self.pose_service = Some(service);
        self
    }

    pub async fn build(self) -> Result<AppState, AppError> {
        let pose = match self.pose_service {
            Some(service) => service,
            None => Arc::new(PoseService::onnx(&self.pose_config)),
        };

        if self.pose_config.preload {
            let svc = Arc::clone(&pose);
            tokio::task::spawn_blocking(move || svc.preload())
                .await
                .map_err(|e| AppError::config(format!("pose preload task failed: {e}")))?
                .map_err(|e| AppError::config(format!("pose model preload failed: {e}")))?;
            info!(model_path = %self.pose_config.model_path.display(), "pose model preloaded");
        }

        match self.db_kind {
            Some(db_kind) => {
                // single entrypoint: build + migrate
                let conn = bootstrap_db(self.env, db_kind).await?;
                Ok(AppState::new(conn, pose))
            }
            None => Ok(AppState::without_db(pose)),
        }
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}
