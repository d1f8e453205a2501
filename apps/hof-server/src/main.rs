//! Process entry point: loads `.env`, initialises telemetry, bootstraps
//! [`AppState`], and starts the three scheduled jobs. Blocks on Ctrl+C —
//! the HTTP listener that would otherwise keep the process alive lives in
//! the excluded web layer.

use hof_server::{crons, AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = hof_config::Config::from_env()?;

    let format = if config.is_production() {
        hof_telemetry::LogFormat::Production
    } else {
        hof_telemetry::LogFormat::Development
    };
    hof_telemetry::init("hof_server", format);

    info!(env = ?config.env, "starting hall of fame server");

    let state = AppState::bootstrap(&config).await?;

    crons::spawn_dirty_drain(state.stats_reconciler.clone());
    crons::spawn_daily_reconciliation(state.stats_reconciler.clone());
    crons::spawn_hourly_averages(state.per_day_averages.clone());

    info!("scheduled jobs running, waiting for shutdown signal");

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }

    info!("shutting down");
    Ok(())
}
