// src/server/mod.rs

use crate::config::Config;
use crate::core::state::ServerState;
use anyhow::{Result, anyhow};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

mod connection_loop;
mod context;
mod initialization;
mod metrics_server;
mod spawner;

pub use connection_loop::shutdown_signal;

/// The main server startup function, orchestrating all setup phases.
/// Runs until SIGINT or SIGTERM.
pub async fn run(config: Config) -> Result<()> {
    // 1. Initialize server state and the listener.
    let mut server_context = initialization::setup(config).await?;

    // 2. Spawn all background tasks.
    spawner::spawn_all(&mut server_context)?;

    // 3. Start the main connection acceptance loop. This function will run until shutdown.
    connection_loop::run(server_context, shutdown_signal()).await;

    Ok(())
}

/// Starts a server in the background and returns once it is accepting
/// connections. Each call is an independent instance with its own state.
pub async fn spawn(config: Config) -> Result<RunningServer> {
    let mut server_context = initialization::setup(config).await?;
    spawner::spawn_all(&mut server_context)?;

    let local_addr = server_context.listener.local_addr()?;
    let state = server_context.state.clone();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(connection_loop::run(server_context, async move {
        // A dropped handle shuts the server down as well.
        let _ = shutdown_rx.await;
    }));

    Ok(RunningServer {
        local_addr,
        state,
        shutdown_tx: Some(shutdown_tx),
        handle: Some(handle),
    })
}

/// A handle to a server started with [`spawn`].
pub struct RunningServer {
    local_addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RunningServer {
    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The shared state of the running instance.
    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Performs the graceful shutdown and waits for it to complete.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take()
            && tx.send(()).is_err()
        {
            debug!("Server at {} had already stopped.", self.local_addr);
        }
        match self.handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| anyhow!("Server task failed during shutdown: {e}")),
            None => Ok(()),
        }
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take()
            && tx.send(()).is_err()
        {
            warn!("Server at {} had already stopped.", self.local_addr);
        }
    }
}
