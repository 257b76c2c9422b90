//! A transport that talks to the local terminal.
//!
//! Every line on stdin arrives as a message from the configured user in a
//! single direct conversation. Replies and attachments are printed to
//! stdout. No new-conversation events are ever produced.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::debug;

use botbase_core::{BotError, Channel, ConvId, ConvSummary, Message, Result};
use botbase_runtime::{ChatTransport, Connector, Subscription};

/// Conversation ID used for console messages.
pub const CONSOLE_CONV: &str = "console";

/// Connects a [`ConsoleTransport`].
pub struct ConsoleConnector {
    user: String,
    program: String,
}

impl ConsoleConnector {
    /// `user` is the sender of stdin lines; `program` runs diagnostic
    /// commands.
    pub fn new(user: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            program: program.into(),
        }
    }
}

#[async_trait]
impl Connector for ConsoleConnector {
    async fn connect(&self) -> Result<Arc<dyn ChatTransport>> {
        let (closed, _) = watch::channel(false);
        Ok(Arc::new(ConsoleTransport {
            user: self.user.clone(),
            program: self.program.clone(),
            closed,
        }))
    }
}

/// Terminal-backed transport.
pub struct ConsoleTransport {
    user: String,
    program: String,
    closed: watch::Sender<bool>,
}

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn listen(&self) -> Result<Arc<dyn Subscription>> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tx.send(line).is_err() {
                    break;
                }
            }
            debug!("stdin closed");
        });

        Ok(Arc::new(ConsoleSubscription {
            user: self.user.clone(),
            lines: Mutex::new(rx),
            closed: self.closed.subscribe(),
        }))
    }

    async fn send_by_conv_id(&self, conv_id: &ConvId, body: &str) -> Result<()> {
        if conv_id.as_str() != CONSOLE_CONV {
            return Err(BotError::Transport(format!("unknown conversation {}", conv_id)));
        }
        println!("[bot] {}", body);
        Ok(())
    }

    async fn send_by_account_name(&self, name: &str, body: &str) -> Result<()> {
        println!("[bot -> @{}] {}", name, body);
        Ok(())
    }

    async fn send_by_group_name(&self, team: &str, body: &str) -> Result<()> {
        println!("[bot -> {}] {}", team, body);
        Ok(())
    }

    async fn send_attachment(&self, conv_id: &ConvId, path: &Path, _title: &str) -> Result<()> {
        if !path.exists() {
            return Err(BotError::Transport(format!("no such file: {}", path.display())));
        }
        println!("[bot -> {}] attachment: {}", conv_id, path.display());
        Ok(())
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd
    }

    async fn shutdown(&self) -> Result<()> {
        self.closed.send_replace(true);
        Ok(())
    }
}

struct ConsoleSubscription {
    user: String,
    lines: Mutex<mpsc::UnboundedReceiver<String>>,
    closed: watch::Receiver<bool>,
}

#[async_trait]
impl Subscription for ConsoleSubscription {
    async fn read_message(&self) -> Result<Message> {
        let mut closed = self.closed.clone();
        let mut lines = self.lines.lock().await;
        tokio::select! {
            line = lines.recv() => match line {
                Some(line) => Ok(Message::text(
                    CONSOLE_CONV,
                    self.user.as_str(),
                    Channel::direct(self.user.as_str()),
                    line,
                )),
                None => Err(BotError::SubscriptionClosed("stdin closed".to_string())),
            },
            _ = closed.wait_for(|c| *c) => {
                Err(BotError::SubscriptionClosed("console shut down".to_string()))
            }
        }
    }

    async fn read_new_conv(&self) -> Result<ConvSummary> {
        let mut closed = self.closed.clone();
        let _ = closed.wait_for(|c| *c).await;
        Err(BotError::SubscriptionClosed("console shut down".to_string()))
    }
}
