//! Application-facing extension points.

use async_trait::async_trait;

use botbase_core::{ConvSummary, LogSourceOptions, Message, Result};

/// Application logic plugged into the server.
///
/// Errors are logged (and, for commands, echoed to the conversation); they
/// never stop the listener loops.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handles a message that is not a diagnostic command.
    async fn handle_command(&self, msg: &Message) -> Result<()>;

    /// Handles a conversation the bot was newly added to.
    async fn handle_new_conv(&self, conv: &ConvSummary) -> Result<()>;
}

/// A secondary resource stopped after the server on OS signals.
#[async_trait]
pub trait Shutdowner: Send + Sync {
    /// Stops the resource.
    async fn shutdown(&self) -> Result<()>;
}

/// Source of the bot's own recent log lines.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Fetches the latest lines, oldest first.
    async fn latest_lines(&self, options: &LogSourceOptions) -> Result<Vec<String>>;
}
