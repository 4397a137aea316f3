//! Score repository functions.

use sea_orm::ConnectionTrait;

use crate::adapters::scores_sea::{self as scores_adapter, ScoreCreate};
use crate::errors::domain::DomainError;

pub const DEFAULT_SCORE_LIMIT: i64 = 20;
pub const MAX_PLAYER_NAME_CHARS: usize = 64;

/// Score domain model
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub id: i64,
    pub level_id: i64,
    pub player_name: Option<String>,
    pub score: i32,
    pub passed: bool,
    pub created_at: time::OffsetDateTime,
}

impl From<crate::entities::scores::Model> for Score {
    fn from(model: crate::entities::scores::Model) -> Self {
        Self {
            id: model.id,
            level_id: model.level_id,
            player_name: model.player_name,
            score: model.score,
            passed: model.passed,
            created_at: model.created_at,
        }
    }
}

/// Input for a new score row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScore {
    pub level_id: i64,
    pub player_name: Option<String>,
    pub score: i32,
    pub passed: bool,
}

fn validate_player_name(name: Option<&str>) -> Result<(), DomainError> {
    match name {
        Some(n) if n.chars().count() > MAX_PLAYER_NAME_CHARS => Err(DomainError::validation(
            format!("player_name must be at most {MAX_PLAYER_NAME_CHARS} characters"),
        )),
        _ => Ok(()),
    }
}

fn validate_limit(limit: i64) -> Result<u64, DomainError> {
    u64::try_from(limit)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| DomainError::validation("limit must be a positive integer"))
}

/// Persist a score. A `level_id` with no matching level surfaces as a
/// foreign-key conflict.
pub async fn create_score<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    new_score: NewScore,
) -> Result<Score, DomainError> {
    validate_player_name(new_score.player_name.as_deref())?;

    let dto = ScoreCreate {
        level_id: new_score.level_id,
        player_name: new_score.player_name,
        score: new_score.score,
        passed: new_score.passed,
    };
    let model = scores_adapter::create_score(conn, dto).await?;
    Ok(Score::from(model))
}

/// Highest scores for a level. An unknown level yields an empty list.
pub async fn list_scores_by_level<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    level_id: i64,
    limit: i64,
) -> Result<Vec<Score>, DomainError> {
    let limit = validate_limit(limit)?;
    let models = scores_adapter::find_ranked_by_level(conn, level_id, limit).await?;
    Ok(models.into_iter().map(Score::from).collect())
}
