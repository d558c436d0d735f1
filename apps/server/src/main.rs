#![warn(clippy::all, clippy::pedantic)]

use std::{env, sync::Arc};

use actix_web::{App, HttpServer, web};
use tracing::{info, warn};

mod error;
mod routes;
mod state;

use error::AppError;
use state::AppState;
use upwatch_service::{
    config::Config,
    database::LibsqlStore,
    monitoring::{HttpProber, RunCoordinator},
    rate_limit::RateLimiter,
};

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let config = Config::from_config(env::var_os("UPWATCH_CONFIG"))?;
    let format = config.logging.format.parse::<logger::LogFormat>().unwrap_or_default();
    logger::init_tracing_with(&config.logging.level, format);

    let cron_secret = env::var("CRON_SECRET").ok().filter(|secret| !secret.is_empty());
    if cron_secret.is_none() {
        warn!("CRON_SECRET is not set; every check run request will be rejected");
    }

    let store = LibsqlStore::open(&config.database.path, config.database.max_connections).await?;
    let prober = HttpProber::from_config(&config.checks).map_err(|e| AppError::HttpClient(e.to_string()))?;

    let state = web::Data::new(AppState {
        coordinator: Arc::new(RunCoordinator::new(Arc::new(store), Arc::new(prober), config.checks.batch_size)),
        cron_secret,
        limiter: Arc::new(RateLimiter::new()),
        cron_cooldown: config.server.cron_cooldown(),
    });

    run_server(&config, state).await
}

async fn run_server(config: &Config, state: web::Data<AppState>) -> Result<(), AppError> {
    let addr = (config.server.bind.as_str(), config.server.port);
    info!(bind = %config.server.bind, port = config.server.port, "Starting server");

    HttpServer::new(move || App::new().app_data(state.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
