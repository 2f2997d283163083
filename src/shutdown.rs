use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Install a handler that listens for SIGINT and SIGTERM.
///
/// Returns a `CancellationToken` that is cancelled when either signal is
/// received. The supervision loop selects on this token so an interrupt can
/// break a pending wait, offer to kill the job, and still drain the
/// remaining logs before the process exits.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, stopping supervision");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, stopping supervision");
            }
        }

        token_clone.cancel();
    });

    token
}
