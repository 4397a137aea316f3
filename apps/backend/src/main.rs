use actix_web::{web, App, HttpServer};
use tracing::{error, info};
use walls_backend::config::app::AppConfig;
use walls_backend::infra::state::build_state;
use walls_backend::middleware::cors::cors_middleware;
use walls_backend::middleware::request_trace::RequestTrace;
use walls_backend::middleware::structured_logger::StructuredLogger;
use walls_backend::middleware::trace_span::TraceSpan;
use walls_backend::routes;

mod telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables must be set by the runtime environment:
    // - Docker: docker-compose env_file or docker run --env-file
    // - Local dev: source env files manually (e.g., set -a; . ./.env; set +a)
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    info!(
        host = %config.host,
        port = config.port,
        db_kind = ?config.db_kind,
        model_path = %config.pose.model_path.display(),
        "starting Walls Incoming backend"
    );

    let app_state = match build_state()
        .with_env(config.env)
        .with_db(config.db_kind)
        .with_pose_config(config.pose.clone())
        .build()
        .await
    {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "failed to build application state");
            std::process::exit(1);
        }
    };

    info!("database connected and migrated");

    let data = web::Data::new(app_state);
    let origins = config.cors_origins.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(cors_middleware(&origins))
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
