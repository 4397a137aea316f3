use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, Statement};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Levels {
    Table,
    LevelNumber,
    Name,
    Difficulty,
    HoleType,
}

pub const DEFAULT_LEVEL_NUMBER: i32 = 1;
pub const DEFAULT_LEVEL_NAME: &str = "半圆之门";
pub const DEFAULT_LEVEL_DIFFICULTY: &str = "简单";
pub const DEFAULT_LEVEL_HOLE_TYPE: &str = "semicircle";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = manager.get_database_backend();

        let row = db
            .query_one(Statement::from_string(
                backend,
                "SELECT COUNT(*) AS n FROM levels",
            ))
            .await?;
        let existing: i64 = match row {
            Some(row) => row.try_get("", "n")?,
            None => 0,
        };

        // Seed only an empty table; operators may have curated levels already.
        if existing > 0 {
            tracing::info!(existing, "seed_default_level=skipped");
            return Ok(());
        }

        let insert = Query::insert()
            .into_table(Levels::Table)
            .columns([
                Levels::LevelNumber,
                Levels::Name,
                Levels::Difficulty,
                Levels::HoleType,
            ])
            .values_panic([
                DEFAULT_LEVEL_NUMBER.into(),
                DEFAULT_LEVEL_NAME.into(),
                DEFAULT_LEVEL_DIFFICULTY.into(),
                DEFAULT_LEVEL_HOLE_TYPE.into(),
            ])
            .to_owned();

        manager.exec_stmt(insert).await?;
        tracing::info!(level_number = DEFAULT_LEVEL_NUMBER, "seed_default_level=inserted");
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(Levels::Table)
            .and_where(Expr::col(Levels::LevelNumber).eq(DEFAULT_LEVEL_NUMBER))
            .to_owned();
        manager.exec_stmt(delete).await?;
        Ok(())
    }
}
