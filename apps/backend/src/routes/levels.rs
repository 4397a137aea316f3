use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::db::require_db;
use crate::error::AppError;
use crate::repos::levels::{self, Level};
use crate::state::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct LevelResponse {
    pub id: i64,
    pub level_number: i32,
    pub name: String,
    pub difficulty: String,
    pub hole_type: String,
}

impl From<Level> for LevelResponse {
    fn from(level: Level) -> Self {
        Self {
            id: level.id,
            level_number: level.level_number,
            name: level.name,
            difficulty: level.difficulty,
            hole_type: level.hole_type,
        }
    }
}

/// GET /api/levels
async fn list_levels(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let db = require_db(&app_state)?;
    let levels = levels::list_levels(db).await?;
    let body: Vec<LevelResponse> = levels.into_iter().map(LevelResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /api/levels/{level_number}
async fn get_level(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let db = require_db(&app_state)?;
    let level = levels::get_level(db, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(LevelResponse::from(level)))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::get().to(list_levels))
        .route("/{level_number}", web::get().to(get_level));
}
