//! Termination signal handling.

/// Wait for a termination signal.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the agent stops
/// cleanly whether interrupted interactively or by a process manager
/// (e.g. systemd, Docker, Kubernetes). Resolving once is enough: the
/// caller cancels a token, and cancelling twice is harmless.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), shutting down");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
