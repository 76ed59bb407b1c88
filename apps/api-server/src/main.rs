//! # Gatekeep API Server
//!
//! Reference host wiring the admission controller and result cache into
//! an Actix-web server.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

#[cfg(feature = "scheduler")]
mod background;
mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use config::AppConfig;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;
    let state = AppState::new(&config).map_err(std::io::Error::other)?;

    #[cfg(feature = "scheduler")]
    let mut scheduler = start_scheduler(&state)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    #[cfg(not(feature = "scheduler"))]
    tracing::warn!("Built without scheduler; idle windows and expired entries are not swept periodically");

    tracing::info!(
        "Starting Gatekeep API Server on {}:{}",
        config.host,
        config.port
    );

    let server_state = state.clone();
    HttpServer::new(move || {
        let state = server_state.clone();
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(|cfg| handlers::configure_routes(cfg, &state))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    #[cfg(feature = "scheduler")]
    if let Err(e) = scheduler.shutdown().await {
        tracing::error!("Failed to stop scheduler: {}", e);
    }

    Ok(())
}

#[cfg(feature = "scheduler")]
async fn start_scheduler(
    state: &AppState,
) -> Result<background::Scheduler, tokio_cron_scheduler::JobSchedulerError> {
    let scheduler = background::Scheduler::new(background::SchedulerConfig::from_env()).await?;
    scheduler.add_reaper(state.reapers()).await?;
    scheduler.start().await?;
    Ok(scheduler)
}
