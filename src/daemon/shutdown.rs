use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Detects signals sent to the process and cancels `cancelation`. Returns early when something
/// else cancels it first.
///
/// On Windows detached processes can't detect signals sent to them, so there the daemon is
/// usually stopped by force and loses the time since its last checkpoint.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C");
            cancelation.cancel();
        },
        _ = terminate() => {
            info!("Received SIGTERM");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => {},
    };
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::error!("Failed to listen for SIGTERM {e:?}");
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await
}
