use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::{ColumnDef, ForeignKeyAction, Index, Table};

#[derive(DeriveMigrationName)]
pub struct Migration;

// ----- Iden enums for tables & columns -----
#[derive(Iden)]
enum Levels {
    Table,
    Id,
    LevelNumber,
    Name,
    Difficulty,
    HoleType,
    CreatedAt,
}

#[derive(Iden)]
enum Scores {
    Table,
    Id,
    LevelId,
    PlayerName,
    Score,
    Passed,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // levels table
        manager
            .create_table(
                Table::create()
                    .table(Levels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Levels::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(
                        ColumnDef::new(Levels::LevelNumber)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Levels::Name).string_len(64).not_null())
                    .col(ColumnDef::new(Levels::Difficulty).string_len(32).not_null())
                    .col(ColumnDef::new(Levels::HoleType).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Levels::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // scores table
        manager
            .create_table(
                Table::create()
                    .table(Scores::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Scores::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Scores::LevelId).big_integer().not_null())
                    .col(ColumnDef::new(Scores::PlayerName).string_len(64).null())
                    .col(
                        ColumnDef::new(Scores::Score)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Scores::Passed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Scores::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scores_level_id")
                            .from(Scores::Table, Scores::LevelId)
                            .to(Levels::Table, Levels::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // leaderboard lookups: WHERE level_id = ? ORDER BY score DESC, created_at DESC
        manager
            .create_index(
                Index::create()
                    .name("ix_scores_level_rank")
                    .table(Scores::Table)
                    .col(Scores::LevelId)
                    .col(Scores::Score)
                    .col(Scores::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // drop in reverse order + drop index before table
        manager
            .drop_index(
                Index::drop()
                    .name("ix_scores_level_rank")
                    .table(Scores::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Scores::Table).if_exists().to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Levels::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}
