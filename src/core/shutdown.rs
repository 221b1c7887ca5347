use tokio::signal;
use tokio::sync::watch;

/// Resolves once Ctrl+C or SIGTERM arrives.
pub(crate) async fn shutdown_signal() {
    let source = wait_for_signal().await;
    tracing::info!(signal = source, "Shutdown signal received");
}

/// Spawns a listener that flips the returned receiver to `true` on shutdown.
pub(crate) fn shutdown_receiver() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        if tx.send(true).is_err() {
            tracing::warn!("No background task is listening for shutdown");
        }
    });
    rx
}

async fn wait_for_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "ctrl_c",
        _ = terminate => "sigterm",
    }
}
