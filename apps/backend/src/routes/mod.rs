use actix_web::error::{PathError, QueryPayloadError};
use actix_web::{web, HttpRequest};

use crate::error::AppError;
use crate::errors::ErrorCode;

pub mod health;
pub mod levels;
pub mod pose;
pub mod scores;

fn path_error(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::bad_request(ErrorCode::BadRequest, format!("Invalid path parameter: {err}")).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::bad_request(ErrorCode::BadRequest, format!("Invalid query string: {err}")).into()
}

/// Register every route plus extractor error handlers.
///
/// Used by `main.rs` and by route tests so both see the same surface.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PathConfig::default().error_handler(path_error))
        .app_data(web::QueryConfig::default().error_handler(query_error));

    // Root and health: /, /health
    cfg.configure(health::configure_routes);

    // Levels: /api/levels/**
    cfg.service(web::scope("/api/levels").configure(levels::configure_routes));

    // Scores: /api/scores/**
    cfg.service(web::scope("/api/scores").configure(scores::configure_routes));

    // Pose: /api/pose/**
    cfg.service(web::scope("/api/pose").configure(pose::configure_routes));
}
