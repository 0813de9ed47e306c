// src/server/connection_loop.rs

//! Contains the main server loop for accepting connections and handling graceful shutdown.

use super::context::ServerContext;
use crate::connection::{self, ConnectionGuard, Session};
use crate::core::metrics;
use crate::core::protocol::OutboundMessage;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Pause after a failed `accept` so a persistent error (e.g. fd exhaustion) does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);
/// How long sessions get to flush the shutdown notice before their tasks are aborted.
const CLIENT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// The main server loop that accepts connections and handles graceful shutdown.
///
/// Runs until `shutdown` resolves or a background task dies.
pub async fn run(mut ctx: ServerContext, shutdown: impl Future<Output = ()>) {
    let mut client_tasks = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Shutdown requested, initiating graceful shutdown.");
                break;
            }

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                    Ok(Err(e)) => { error!("CRITICAL: Background task failed: {}. Shutting down.", e); break; }
                    Err(e) => { error!("CRITICAL: Background task panicked: {e:?}. Shutting down."); break; }
                }
            },

            res = ctx.listener.accept() => match res {
                Ok((socket, addr)) => accept_connection(&ctx, &mut client_tasks, socket, addr),
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            },

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client handler panicked: {e:?}");
                }
            },
        }
    }

    info!("Shutting down. Disconnecting {} clients.", ctx.state.clients.len());
    let sessions: Vec<_> = ctx
        .state
        .clients
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    for session in &sessions {
        if let Err(e) = session.send(OutboundMessage::notice("server is shutting down")) {
            debug!("Could not deliver shutdown notice to {}: {}", session.addr(), e);
        }
        session.begin_close();
        session.offline();
    }
    ctx.state.registry.clear();

    if ctx.shutdown_tx.send(()).is_err() {
        debug!("No background task was listening for the shutdown signal.");
    }

    if tokio::time::timeout(CLIENT_DRAIN_TIMEOUT, async {
        while client_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for client connections to close; aborting them.");
        client_tasks.shutdown().await;
    }
    info!("All client connections closed.");

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(Duration::from_secs(10), async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    };
    info!("Server shutdown complete.");
}

/// Registers a freshly accepted socket and spawns its session, or turns it away
/// when the server is full.
fn accept_connection(
    ctx: &ServerContext,
    client_tasks: &mut JoinSet<()>,
    socket: TcpStream,
    addr: SocketAddr,
) {
    let state = &ctx.state;
    info!("Accepted new connection from: {}", addr);
    state.stats.increment_total_connections();
    metrics::CONNECTIONS_RECEIVED_TOTAL.inc();

    if state.clients.len() >= state.config.max_clients {
        warn!(
            "Rejecting {}: max_clients ({}) reached.",
            addr, state.config.max_clients
        );
        metrics::CONNECTIONS_REJECTED_TOTAL.inc();
        client_tasks.spawn(reject(socket, addr));
        return;
    }

    let id = state.next_session_id();
    let (session, outbound_rx) = Session::new(id, addr, state.config.outbound_queue_capacity);

    // The remote address is the default identity. If a client already renamed
    // itself to that exact string, fall back to a suffixed one.
    let default_identity = addr.to_string();
    if let Err(e) = state.registry.insert(&default_identity, session.clone()) {
        let fallback = format!("{default_identity}#{id}");
        debug!("{}; registering {} as {} instead.", e, addr, fallback);
        if let Err(e) = state.registry.insert(&fallback, session.clone()) {
            error!("Could not register connection from {}: {}", addr, e);
            session.offline();
            return;
        }
    }

    let guard = ConnectionGuard::new(state.clone(), session);
    client_tasks.spawn(connection::serve(guard, socket, outbound_rx));
}

/// Tells a client it cannot be served and closes the socket.
async fn reject(mut socket: TcpStream, addr: SocketAddr) {
    let notice = OutboundMessage::notice("server is full").into_bytes();
    if let Err(e) = socket.write_all(&notice).await {
        debug!("Could not send rejection notice to {}: {}", addr, e);
    }
    if let Err(e) = socket.shutdown().await {
        debug!("Error shutting down rejected socket {}: {}", addr, e);
    }
}

/// Resolves when the process receives SIGINT or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
        info!("SIGINT received.");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("SIGTERM received.");
            }
            Err(e) => {
                error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
