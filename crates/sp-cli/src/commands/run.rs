//! The `run` subcommand: the long-running checkpoint controller.

use std::sync::Arc;

use anyhow::{Context, Result};
use sp_core::reconcile::Reconciler;
use sp_core::scan_loop::ScanLoop;
use sp_core::schedule::refresh_schedule;
use sp_core::tracker::SharedState;
use sp_core::types::ScannerId;
use sp_gateway::RestGateway;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::Config;
use crate::hardware::{ConsoleIndicator, LogActuator, StdinScanner};

/// Spawns the schedule-refresh task and the scan loop, then waits for
/// ctrl-c.
pub async fn run(config: &Config) -> Result<()> {
    let gateway =
        RestGateway::new(&config.store_url).context("failed to set up the store client")?;
    let scanner_id =
        ScannerId::new(config.scanner_id.as_str()).context("scanner_id must be non-empty")?;
    let shared = Arc::new(SharedState::new());
    let indicator = ConsoleIndicator::new(config.room.clone());
    let cancel = CancellationToken::new();

    let refresh_task = {
        let gateway = gateway.clone();
        let shared = Arc::clone(&shared);
        let indicator = indicator.clone();
        let room = config.room.clone();
        let cancel = cancel.clone();
        let period = config.refresh_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let now = chrono::Local::now().naive_local();
                        if let Err(error) =
                            refresh_schedule(&gateway, &shared, &indicator, &room, now).await
                        {
                            tracing::warn!(%error, "schedule refresh failed");
                        }
                    }
                }
            }
            tracing::info!("refresh task shutting down");
        })
    };

    let reconciler = Reconciler::new(gateway, Arc::clone(&shared), scanner_id, config.dwell());
    let scan_loop = ScanLoop::new(
        StdinScanner::new(),
        LogActuator,
        indicator,
        reconciler,
        Arc::clone(&shared),
        config.scan_loop(),
    );
    let scan_task = tokio::spawn(scan_loop.run(cancel.clone()));

    tracing::info!(room = %config.room, "checkpoint controller running");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested");
    cancel.cancel();

    let (refresh, scan) = tokio::join!(refresh_task, scan_task);
    refresh.context("refresh task panicked")?;
    scan.context("scan loop panicked")?;
    Ok(())
}
