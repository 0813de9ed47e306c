// src/server/spawner.rs

//! Spawns the server's long-running background tasks.

use super::context::ServerContext;
use super::metrics_server;
use crate::core::bus::BusDispatcherTask;
use anyhow::{Result, anyhow};
use tracing::info;

/// Spawns all background tasks into the context's JoinSet.
pub fn spawn_all(ctx: &mut ServerContext) -> Result<()> {
    let server_state = &ctx.state;
    let shutdown_tx = &ctx.shutdown_tx;
    let background_tasks = &mut ctx.background_tasks;

    // --- Message Bus ---
    let bus_rx = ctx
        .bus_rx
        .take()
        .ok_or_else(|| anyhow!("Message bus receiver was already taken"))?;
    let dispatcher = BusDispatcherTask::new(server_state.clone(), bus_rx);
    let shutdown_rx_bus = shutdown_tx.subscribe();
    background_tasks.spawn(async move {
        dispatcher.run(shutdown_rx_bus).await;
        Ok(())
    });

    // --- Metrics Server ---
    if server_state.config.metrics.enabled {
        let metrics_state = server_state.clone();
        let shutdown_rx_metrics = shutdown_tx.subscribe();
        background_tasks.spawn(async move {
            metrics_server::run_metrics_server(metrics_state, shutdown_rx_metrics).await;
            Ok(())
        });
    } else {
        info!("Prometheus metrics server is disabled in the configuration.");
    }

    info!("All background tasks have been spawned.");
    Ok(())
}
