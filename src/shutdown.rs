use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

pub type ShutdownSender = broadcast::Sender<()>;
pub type ShutdownReceiver = broadcast::Receiver<()>;

/// Broadcast channel size for shutdown notifications (single signal fan-out).
const SHUTDOWN_CHANNEL_CAPACITY: usize = 1;

#[must_use]
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    broadcast::channel::<()>(SHUTDOWN_CHANNEL_CAPACITY)
}

/// Resolves once a shutdown is broadcast. A closed channel never resolves:
/// losing every sender is not a request to stop.
pub async fn wait_for_shutdown(shutdown_rx: &mut ShutdownReceiver) {
    loop {
        match shutdown_rx.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => return,
            Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

/// Forwards Ctrl-C (and SIGTERM on unix) into the shutdown channel. The task
/// ends on its own once any shutdown has been broadcast.
#[must_use]
pub fn setup_signal_shutdown_handler(shutdown_tx: &ShutdownSender) -> JoinHandle<()> {
    let shutdown_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        let mut shutdown_rx = shutdown_tx.subscribe();

        #[cfg(unix)]
        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                warn!("Failed to register SIGTERM handler: {}", err);
                None
            }
        };

        #[cfg(unix)]
        {
            tokio::select! {
                () = wait_for_shutdown(&mut shutdown_rx) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted; stopping the run.");
                    drop(shutdown_tx.send(()));
                }
                () = async {
                    let Some(signal) = term_signal.as_mut() else {
                        return std::future::pending::<()>().await;
                    };
                    signal.recv().await;
                } => {
                    info!("Terminated; stopping the run.");
                    drop(shutdown_tx.send(()));
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                () = wait_for_shutdown(&mut shutdown_rx) => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted; stopping the run.");
                    drop(shutdown_tx.send(()));
                }
            }
        }
    })
}
