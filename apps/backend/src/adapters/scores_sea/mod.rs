//! SeaORM adapter for scores repository.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::scores;

pub mod dto;

pub use dto::ScoreCreate;

/// Insert a score. `created_at` is stamped here so ranking ties are ordered
/// by submission time regardless of backend clock precision.
pub async fn create_score<C: ConnectionTrait>(
    conn: &C,
    dto: ScoreCreate,
) -> Result<scores::Model, sea_orm::DbErr> {
    let score = scores::ActiveModel {
        id: sea_orm::NotSet,
        level_id: Set(dto.level_id),
        player_name: Set(dto.player_name),
        score: Set(dto.score),
        passed: Set(dto.passed),
        created_at: Set(time::OffsetDateTime::now_utc()),
    };

    score.insert(conn).await
}

/// Top `limit` scores for a level: score desc, newest first, then id desc.
pub async fn find_ranked_by_level<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    level_id: i64,
    limit: u64,
) -> Result<Vec<scores::Model>, sea_orm::DbErr> {
    scores::Entity::find()
        .filter(scores::Column::LevelId.eq(level_id))
        .order_by_desc(scores::Column::Score)
        .order_by_desc(scores::Column::CreatedAt)
        .order_by_desc(scores::Column::Id)
        .limit(limit)
        .all(conn)
        .await
}
