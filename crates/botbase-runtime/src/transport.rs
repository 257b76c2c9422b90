//! The chat backend as seen by the server.
//!
//! Implementations own the wire protocol, retries and authentication. The
//! server only needs to read events, send text and attachments, build
//! commands in the client's runtime context, and shut the client down.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use botbase_core::{ConvId, ConvSummary, Message, Result};

/// A live subscription to incoming events.
///
/// Both reads are called concurrently from separate tasks. A read may fail
/// transiently without closing the subscription; once it can never yield
/// again it must return [`BotError::SubscriptionClosed`].
///
/// [`BotError::SubscriptionClosed`]: botbase_core::BotError::SubscriptionClosed
#[async_trait]
pub trait Subscription: Send + Sync {
    /// Waits for the next chat message.
    async fn read_message(&self) -> Result<Message>;

    /// Waits for the next conversation the bot was added to.
    async fn read_new_conv(&self) -> Result<ConvSummary>;
}

/// A connected chat client.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Opens a subscription for messages and new conversations.
    async fn listen(&self) -> Result<Arc<dyn Subscription>>;

    /// Sends text to a conversation by ID.
    async fn send_by_conv_id(&self, conv_id: &ConvId, body: &str) -> Result<()>;

    /// Sends text to the private conversation with an account.
    async fn send_by_account_name(&self, name: &str, body: &str) -> Result<()>;

    /// Sends text to a team's default channel.
    async fn send_by_group_name(&self, team: &str, body: &str) -> Result<()>;

    /// Uploads a local file to a conversation.
    async fn send_attachment(&self, conv_id: &ConvId, path: &Path, title: &str) -> Result<()>;

    /// Builds a command that runs the client binary with `args`, in the
    /// client's home and configuration.
    fn command(&self, args: &[String]) -> Command;

    /// Stops the client.
    async fn shutdown(&self) -> Result<()>;
}

/// Creates the transport when the server starts.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Starts a chat client and returns a handle to it.
    async fn connect(&self) -> Result<Arc<dyn ChatTransport>>;
}
