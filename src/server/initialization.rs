// src/server/initialization.rs

//! Handles server initialization: validating the configuration, building the
//! shared state and binding the listener.

use super::context::ServerContext;
use crate::config::Config;
use crate::core::state::ServerState;
use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::info;

/// Initializes all server components before starting the main loop.
///
/// Failing to bind is fatal and is returned to the caller; there is no retry.
pub async fn setup(config: Config) -> Result<ServerContext> {
    config.validate_runtime()?;
    log_startup_info(&config);
    let (shutdown_tx, _) = broadcast::channel(1);

    let listen_addr = config.listen_addr();
    let server_init = ServerState::initialize(config);
    info!("Server state initialized.");

    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind listener on {listen_addr}"))?;
    info!("relaychat listening on {}", listener.local_addr()?);

    Ok(ServerContext {
        state: server_init.state,
        bus_rx: Some(server_init.bus_rx),
        listener,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    })
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    info!(
        "Idle timeout {:?} (grace {:?}), command prefix '{}', max {} clients.",
        config.idle_timeout, config.timeout_grace, config.command_prefix, config.max_clients
    );
    info!(
        "Outbound queues hold {} messages; overflow policy is {:?}.",
        config.outbound_queue_capacity, config.overflow_policy
    );
}
