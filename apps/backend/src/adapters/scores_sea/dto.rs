//! DTOs for scores_sea adapter.

/// DTO for inserting a score.
#[derive(Debug, Clone)]
pub struct ScoreCreate {
    pub level_id: i64,
    pub player_name: Option<String>,
    pub score: i32,
    pub passed: bool,
}
