use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::pose::PoseService;

/// Application state containing shared resources
#[derive(Debug, Clone)]
pub struct AppState {
    /// Database connection (optional for test scenarios)
    db: Option<DatabaseConnection>,
    /// Lazily loaded pose model
    pose: Arc<PoseService>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, pose: Arc<PoseService>) -> Self {
        Self { db: Some(db), pose }
    }

    /// State without a database connection (pose-only tests, health checks)
    pub fn without_db(pose: Arc<PoseService>) -> Self {
        Self { db: None, pose }
    }

    pub fn db(&self) -> Option<&DatabaseConnection> {
        self.db.as_ref()
    }

    pub fn pose(&self) -> Arc<PoseService> {
        Arc::clone(&self.pose)
    }
}
