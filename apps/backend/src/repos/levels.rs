//! Level repository functions.

use sea_orm::ConnectionTrait;

use crate::adapters::levels_sea as levels_adapter;
use crate::errors::domain::{DomainError, NotFoundKind};

/// Level domain model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    pub id: i64,
    pub level_number: i32,
    pub name: String,
    pub difficulty: String,
    pub hole_type: String,
}

impl From<levels_adapter::LevelRow> for Level {
    fn from(row: levels_adapter::LevelRow) -> Self {
        Self {
            id: row.id,
            level_number: row.level_number,
            name: row.name,
            difficulty: row.difficulty,
            hole_type: row.hole_type,
        }
    }
}

/// Every level, ascending by level number.
pub async fn list_levels<C: ConnectionTrait + Send + Sync>(
    conn: &C,
) -> Result<Vec<Level>, DomainError> {
    let rows = levels_adapter::list_all(conn).await?;
    Ok(rows.into_iter().map(Level::from).collect())
}

/// Look up a level by its number (not its id). Numbers outside the column's
/// range cannot exist, so they are reported as not found.
pub async fn get_level<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    level_number: i64,
) -> Result<Level, DomainError> {
    let missing = || DomainError::not_found(NotFoundKind::Level, "level does not exist");
    let Ok(level_number) = i32::try_from(level_number) else {
        return Err(missing());
    };
    levels_adapter::find_by_number(conn, level_number)
        .await?
        .map(Level::from)
        .ok_or_else(missing)
}
