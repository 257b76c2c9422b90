//! Error types shared by every botbase crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while running a bot server.
#[derive(Debug, Error)]
pub enum BotError {
    /// A transport call failed. Reads that fail this way are retried.
    #[error("transport error: {0}")]
    Transport(String),

    /// The subscription can no longer yield events.
    #[error("subscription closed: {0}")]
    SubscriptionClosed(String),

    /// An application or diagnostic handler failed.
    #[error("handler error: {0}")]
    Handler(String),

    /// An external command could not be spawned or exited unsuccessfully.
    #[error("command `{program}` failed: {reason}")]
    Command {
        /// Program that was run.
        program: String,
        /// What went wrong.
        reason: String,
    },

    /// An external command did not finish in time.
    #[error("command `{program}` timed out after {timeout:?}")]
    Timeout {
        /// Program that was run.
        program: String,
        /// The limit that was exceeded.
        timeout: Duration,
    },

    /// A required piece of configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// The external log source failed.
    #[error("log source error: {0}")]
    LogSource(String),

    /// The filesystem bridge failed.
    #[error("kbfsOutput: {0}")]
    FsBridge(String),

    /// A command body could not be split into shell words.
    #[error("invalid command: {0}")]
    InvalidCommand(#[from] shell_words::ParseError),

    /// The server was started twice.
    #[error("server already started")]
    AlreadyStarted,

    /// The server has not been started.
    #[error("server not started")]
    NotStarted,

    /// A supervised task panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BotError {
    /// Creates a handler error from anything displayable.
    pub fn handler(e: impl std::fmt::Display) -> Self {
        BotError::Handler(e.to_string())
    }

    /// Returns true if a listener loop must stop after seeing this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BotError::SubscriptionClosed(_))
    }
}

/// Result type for botbase operations.
pub type Result<T> = std::result::Result<T, BotError>;
