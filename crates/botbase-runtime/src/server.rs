//! The server facade: start, announce, listen, shut down.

use std::future::Future;
use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use botbase_core::{BotError, ConvId, Result, ServerConfig};

use crate::diagnostics::DiagnosticRunner;
use crate::dispatch::CommandDispatcher;
use crate::fs_bridge::{CommandFsBridge, FilesystemBridge};
use crate::handler::{Handler, LogSource, Shutdowner};
use crate::listener::{listen_for_convs, listen_for_messages};
use crate::reporter::ChatReporter;
use crate::shutdown::{ShutdownListener, ShutdownSignal};
use crate::signals::wait_for_os_signal;
use crate::transport::{ChatTransport, Connector};

/// State acquired by [`Server::start`].
struct Started {
    transport: Arc<dyn ChatTransport>,
    runner: Arc<DiagnosticRunner>,
}

/// A chat-bot server.
///
/// Built once per process from an immutable [`ServerConfig`], started once,
/// then shared (typically in an `Arc`) between the task running
/// [`listen`](Self::listen) and the one running
/// [`handle_signals`](Self::handle_signals).
pub struct Server {
    config: Arc<ServerConfig>,
    shutdown: ShutdownSignal,
    log_source: Option<Arc<dyn LogSource>>,
    fs_bridge: Arc<dyn FilesystemBridge>,
    started: Option<Started>,
}

impl Server {
    /// Creates a server. The filesystem bridge defaults to
    /// [`CommandFsBridge`] over `config.fs_program`.
    pub fn new(config: ServerConfig) -> Self {
        let fs_bridge = Arc::new(CommandFsBridge::new(
            config.fs_program.clone(),
            config.command_timeout,
        ));
        Self {
            config: Arc::new(config),
            shutdown: ShutdownSignal::new(),
            log_source: None,
            fs_bridge,
            started: None,
        }
    }

    /// Installs the client used by `!botlog`.
    pub fn with_log_source(mut self, source: Arc<dyn LogSource>) -> Self {
        self.log_source = Some(source);
        self
    }

    /// Replaces the filesystem bridge.
    pub fn with_fs_bridge(mut self, bridge: Arc<dyn FilesystemBridge>) -> Self {
        self.fs_bridge = bridge;
        self
    }

    /// The configuration in force.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Connects the transport. May be called once.
    pub async fn start(&mut self, connector: &dyn Connector) -> Result<Arc<dyn ChatTransport>> {
        if self.started.is_some() {
            return Err(BotError::AlreadyStarted);
        }

        let transport = connector.connect().await?;
        let runner = Arc::new(DiagnosticRunner::new(
            Arc::clone(&transport),
            Arc::clone(&self.config),
            self.log_source.clone(),
            Arc::clone(&self.fs_bridge),
        ));
        self.started = Some(Started {
            transport: Arc::clone(&transport),
            runner,
        });

        info!(bot_admins = ?self.config.bot_admins, "server started");
        Ok(transport)
    }

    /// Returns true once [`start`](Self::start) has succeeded.
    pub fn is_started(&self) -> bool {
        self.started.is_some()
    }

    fn started(&self) -> Result<&Started> {
        self.started.as_ref().ok_or(BotError::NotStarted)
    }

    /// Announces the bot to the configured target.
    ///
    /// The target is tried as a conversation ID, then an account name, then
    /// a team name. If all fail, the team-name error is returned. Does
    /// nothing without a configured target.
    pub async fn send_announcement(&self, running: &str) -> Result<()> {
        let Some(target) = self.config.announcement.as_deref() else {
            return Ok(());
        };
        let transport = &self.started()?.transport;

        match transport
            .send_by_conv_id(&ConvId::from_string(target), running)
            .await
        {
            Ok(()) => {
                info!("announcement success");
                return Ok(());
            }
            Err(e) => debug!(target = %target, error = %e, "failed to announce self as conv ID"),
        }

        match transport.send_by_account_name(target, running).await {
            Ok(()) => {
                info!("announcement success");
                return Ok(());
            }
            Err(e) => debug!(target = %target, error = %e, "failed to announce self as user"),
        }

        match transport.send_by_group_name(target, running).await {
            Ok(()) => {
                info!("announcement success");
                Ok(())
            }
            Err(e) => {
                warn!(target = %target, error = %e, "failed to announce self as team");
                Err(e)
            }
        }
    }

    /// Runs both listener loops until shutdown or the first fatal loop error.
    ///
    /// The config, including the admin list, is fixed from here on.
    pub async fn listen(&self, handler: Arc<dyn Handler>) -> Result<()> {
        let started = self.started()?;
        let sub = started.transport.listen().await.map_err(|e| {
            warn!(error = %e, "failed to listen");
            e
        })?;
        info!("startup success, listening for messages and convs...");

        let dispatcher = Arc::new(CommandDispatcher::new(
            Arc::clone(&started.runner),
            Arc::clone(&handler),
            ChatReporter::new(Arc::clone(&started.transport)),
        ));

        let mut loops = JoinSet::new();
        loops.spawn(listen_for_messages(
            self.shutdown.subscribe(),
            Arc::clone(&sub),
            dispatcher,
        ));
        loops.spawn(listen_for_convs(self.shutdown.subscribe(), sub, handler));

        while let Some(joined) = loops.join_next().await {
            let outcome = joined
                .map_err(|e| BotError::Task(e.to_string()))
                .and_then(|result| result);
            if let Err(e) = outcome {
                warn!(error = %e, "listener failed");
                loops.abort_all();
                return Err(e);
            }
        }

        info!("listen: shut down");
        Ok(())
    }

    /// Fires the shutdown signal and stops the transport.
    ///
    /// Only the first call does anything; later calls return `Ok(())`.
    pub async fn shutdown(&self) -> Result<()> {
        if !self.shutdown.signal() {
            debug!("shutdown already requested");
            return Ok(());
        }
        info!("shutting down");
        if let Some(started) = &self.started {
            started.transport.shutdown().await?;
        }
        Ok(())
    }

    /// A handle for observing the shutdown signal.
    pub fn shutdown_listener(&self) -> ShutdownListener {
        self.shutdown.subscribe()
    }

    /// Waits for SIGINT or SIGTERM, then shuts down the server and
    /// `secondary`. Failures, including failing to install the signal
    /// handlers, are logged, not returned.
    pub async fn handle_signals(&self, secondary: Option<&dyn Shutdowner>) -> Result<()> {
        self.shutdown_on_signal(wait_for_os_signal(), secondary).await;
        Ok(())
    }

    async fn shutdown_on_signal<F>(&self, signal: F, secondary: Option<&dyn Shutdowner>)
    where
        F: Future<Output = std::io::Result<&'static str>>,
    {
        match signal.await {
            Ok(name) => self.shutdown_on(async move { name }, secondary).await,
            Err(e) => warn!(error = %e, "unable to listen for OS signals"),
        }
    }

    /// Waits for `trigger`, then shuts down the server and `secondary`.
    pub async fn shutdown_on<F, S>(&self, trigger: F, secondary: Option<&dyn Shutdowner>)
    where
        F: Future<Output = S>,
        S: std::fmt::Display,
    {
        let reason = trigger.await;
        info!(reason = %reason, "received {}, shutting down", reason);
        if let Err(e) = self.shutdown().await {
            warn!(error = %e, "unable to shutdown server");
        }
        if let Some(secondary) = secondary {
            if let Err(e) = secondary.shutdown().await {
                warn!(error = %e, "unable to shutdown secondary resource");
            }
        }
    }

    /// Hands over the handles of profile uploads started so far.
    pub fn take_deliveries(&self) -> Vec<JoinHandle<()>> {
        self.started
            .as_ref()
            .map(|s| s.runner.take_deliveries())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_setup_failure_is_not_an_error() {
        let server = Server::new(ServerConfig::new());
        let failed = async {
            Err::<&'static str, _>(std::io::Error::new(
                std::io::ErrorKind::Other,
                "no signal driver",
            ))
        };

        server.shutdown_on_signal(failed, None).await;
        assert!(!server.shutdown_listener().is_signaled());
    }

    #[tokio::test]
    async fn test_signal_shuts_down_unstarted_server() {
        let server = Server::new(ServerConfig::new());

        server
            .shutdown_on_signal(async { Ok::<_, std::io::Error>("terminated") }, None)
            .await;
        assert!(server.shutdown_listener().is_signaled());
    }
}
