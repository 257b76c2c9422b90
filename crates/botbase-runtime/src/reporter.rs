//! Diagnostic text posted back to conversations.

use std::sync::Arc;

use tracing::{debug, warn};

use botbase_core::ConvId;

use crate::transport::ChatTransport;

/// Posts status and error text to conversations.
///
/// Failures to send are logged and swallowed; reporting never fails the
/// caller.
#[derive(Clone)]
pub struct ChatReporter {
    transport: Arc<dyn ChatTransport>,
}

impl ChatReporter {
    /// Creates a reporter that sends through `transport`.
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    /// Sends `text` to the conversation.
    pub async fn echo(&self, conv_id: &ConvId, text: &str) {
        if let Err(e) = self.transport.send_by_conv_id(conv_id, text).await {
            warn!(conv_id = %conv_id, error = %e, "unable to echo to conversation");
        }
    }

    /// Logs at debug level and sends `text` to the conversation.
    pub async fn debug(&self, conv_id: &ConvId, text: &str) {
        debug!(conv_id = %conv_id, "{}", text);
        self.echo(conv_id, text).await;
    }

    /// Logs at warn level and sends `text` to the conversation.
    pub async fn debug_full(&self, conv_id: &ConvId, text: &str) {
        warn!(conv_id = %conv_id, "{}", text);
        self.echo(conv_id, text).await;
    }
}
