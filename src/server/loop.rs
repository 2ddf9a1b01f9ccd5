//! Server loop
//!
//! Accepts connections until a shutdown signal arrives.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::shutdown_signal;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop on the current `LocalSet`
///
/// Returns once SIGINT or SIGTERM is received. Connections still in flight
/// are dropped with the runtime.
pub async fn run_server(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
) {
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => match accept_result {
                Ok((stream, peer_addr)) => {
                    accept_connection(stream, peer_addr, &state, &active_connections);
                }
                Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
            },
            () = &mut shutdown => break,
        }
    }

    logger::log_server_stopped(active_connections.load(Ordering::SeqCst));
}
