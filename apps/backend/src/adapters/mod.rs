//! SeaORM adapters. Functions here return `sea_orm::DbErr`; repos translate.

pub mod levels_sea;
pub mod scores_sea;
