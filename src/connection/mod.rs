// src/connection/mod.rs

//! Manages the lifecycle of a single client TCP connection: the shared session
//! handle, the reader, the writer, and the idle supervisor.

mod guard;
mod handler;
mod session;
mod supervisor;
mod writer;

pub use guard::ConnectionGuard;
pub use handler::{ConnectionHandler, DisconnectReason};
pub use session::{Session, SessionState};
pub use supervisor::{IdleSupervisor, SupervisorOutcome, WatchdogState};
pub use writer::SessionWriter;

use bytes::Bytes;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Runs a registered session to completion over `socket`. The guard, created by
/// the acceptor when the connection was counted, is released when every task of
/// the session has finished.
///
/// The reader, the writer and the idle supervisor each run as their own task.
/// The join notice is published before any of them start, so the newcomer's
/// outbound queue already holds it when the writer begins.
pub async fn serve(guard: ConnectionGuard, socket: TcpStream, outbound_rx: mpsc::Receiver<Bytes>) {
    let state = guard.state.clone();
    let session = guard.session.clone();

    let identity = session.identity();
    if let Err(e) = state.bus.notify(format!("{identity} joined")).await {
        debug!("Could not publish join notice for {}: {}", identity, e);
    }

    let (read_half, write_half) = socket.into_split();
    let (keepalive_tx, keepalive_rx) = mpsc::channel(1);

    let mut tasks = JoinSet::new();
    let reader = ConnectionHandler::new(read_half, session.clone(), state.clone(), keepalive_tx);
    tasks.spawn(async move {
        reader.run().await;
    });
    let writer = SessionWriter::new(
        write_half,
        outbound_rx,
        session.clone(),
        state.config.max_line_length,
    );
    tasks.spawn(async move {
        writer.run().await;
    });
    let supervisor = IdleSupervisor::new(state.clone(), session.clone(), keepalive_rx);
    tasks.spawn(async move {
        supervisor.run().await;
    });

    while let Some(res) = tasks.join_next().await {
        if let Err(e) = res
            && e.is_panic()
        {
            error!("A task for {} panicked: {e:?}", session.addr());
            session.offline();
        }
    }
    drop(guard);
}
