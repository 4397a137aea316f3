use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use tracing::info;

use crate::db::require_db;
use crate::db::txn::with_txn;
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::extractors::ValidatedJson;
use crate::repos::scores::{self, NewScore, Score, DEFAULT_SCORE_LIMIT};
use crate::state::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateScoreRequest {
    pub level_id: i64,
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub score: i32,
    #[serde(default)]
    pub passed: bool,
}

/// Echo of a newly stored score.
#[derive(Debug, Serialize)]
pub struct CreatedScoreResponse {
    pub id: i64,
    pub level_id: i64,
    pub player_name: Option<String>,
    pub score: i32,
    pub passed: bool,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub id: i64,
    pub level_id: i64,
    pub player_name: Option<String>,
    pub score: i32,
    pub passed: bool,
    pub created_at: String,
}

impl TryFrom<Score> for ScoreResponse {
    type Error = AppError;

    fn try_from(score: Score) -> Result<Self, Self::Error> {
        let created_at = score.created_at.format(&Rfc3339).map_err(|e| {
            AppError::internal(ErrorCode::Internal, format!("timestamp formatting failed: {e}"))
        })?;
        Ok(Self {
            id: score.id,
            level_id: score.level_id,
            player_name: score.player_name,
            score: score.score,
            passed: score.passed,
            created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListScoresQuery {
    pub limit: Option<i64>,
}

/// POST /api/scores
async fn create_score(
    body: ValidatedJson<CreateScoreRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    let new_score = NewScore {
        level_id: req.level_id,
        player_name: req.player_name,
        score: req.score,
        passed: req.passed,
    };

    let score = with_txn(&app_state, |txn| {
        Box::pin(async move { Ok(scores::create_score(txn, new_score).await?) })
    })
    .await?;

    info!(
        score_id = score.id,
        level_id = score.level_id,
        score = score.score,
        passed = score.passed,
        "score recorded"
    );

    Ok(HttpResponse::Ok().json(CreatedScoreResponse {
        id: score.id,
        level_id: score.level_id,
        player_name: score.player_name,
        score: score.score,
        passed: score.passed,
    }))
}

/// GET /api/scores/level/{level_id}?limit=20
async fn list_scores_by_level(
    path: web::Path<i64>,
    query: web::Query<ListScoresQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let db = require_db(&app_state)?;
    let limit = query.limit.unwrap_or(DEFAULT_SCORE_LIMIT);
    let rows = scores::list_scores_by_level(db, path.into_inner(), limit).await?;
    let body = rows
        .into_iter()
        .map(ScoreResponse::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HttpResponse::Ok().json(body))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("", web::post().to(create_score))
        .route("/level/{level_id}", web::get().to(list_scores_by_level));
}
