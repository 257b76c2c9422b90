//! OS signal handling.

use tracing::debug;

/// Waits for SIGINT or SIGTERM and returns the signal's name.
///
/// Only one watcher is expected per process.
pub async fn wait_for_os_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate())?;
        debug!("waiting for interrupt or terminate");
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                Ok("interrupt")
            }
            _ = terminate.recv() => Ok("terminated"),
        }
    }

    #[cfg(not(unix))]
    {
        debug!("waiting for interrupt");
        tokio::signal::ctrl_c().await?;
        Ok("interrupt")
    }
}
