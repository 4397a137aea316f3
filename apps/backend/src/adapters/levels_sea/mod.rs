//! SeaORM adapter for the read-only levels table.

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect, Select,
};

use crate::entities::levels;

/// Public projection of a level row (no timestamps).
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct LevelRow {
    pub id: i64,
    pub level_number: i32,
    pub name: String,
    pub difficulty: String,
    pub hole_type: String,
}

fn summary_query() -> Select<levels::Entity> {
    levels::Entity::find().select_only().columns([
        levels::Column::Id,
        levels::Column::LevelNumber,
        levels::Column::Name,
        levels::Column::Difficulty,
        levels::Column::HoleType,
    ])
}

/// All levels ordered by level_number ascending.
pub async fn list_all<C: ConnectionTrait + Send + Sync>(
    conn: &C,
) -> Result<Vec<LevelRow>, sea_orm::DbErr> {
    summary_query()
        .order_by_asc(levels::Column::LevelNumber)
        .into_model::<LevelRow>()
        .all(conn)
        .await
}

pub async fn find_by_number<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    level_number: i32,
) -> Result<Option<LevelRow>, sea_orm::DbErr> {
    summary_query()
        .filter(levels::Column::LevelNumber.eq(level_number))
        .into_model::<LevelRow>()
        .one(conn)
        .await
}
