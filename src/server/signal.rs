//! Shutdown signal handling
//!
//! SIGTERM and SIGINT stop the server on unix; elsewhere only Ctrl+C does.

use crate::logger;

/// Resolve when the process is asked to stop
#[cfg(unix)]
pub async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            logger::log_error(&format!("Failed to register signal handlers: {e}"));
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => logger::log_shutdown_requested("SIGTERM"),
        _ = sigint.recv() => logger::log_shutdown_requested("SIGINT"),
    }
}

/// Resolve when the process is asked to stop
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => logger::log_shutdown_requested("Ctrl+C"),
        Err(e) => {
            logger::log_error(&format!("Failed to listen for Ctrl+C: {e}"));
            std::future::pending::<()>().await;
        }
    }
}
