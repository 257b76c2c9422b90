//! Routing of incoming messages.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error};

use botbase_core::{classify, Message, Route};

use crate::diagnostics::DiagnosticRunner;
use crate::handler::Handler;
use crate::reporter::ChatReporter;

/// Sends each message to exactly one of the diagnostic runner or the
/// application handler.
///
/// Nothing a handler does, error or panic, escapes [`dispatch`](Self::dispatch).
pub struct CommandDispatcher {
    runner: Arc<DiagnosticRunner>,
    handler: Arc<dyn Handler>,
    reporter: ChatReporter,
}

impl CommandDispatcher {
    /// Creates a dispatcher.
    pub fn new(
        runner: Arc<DiagnosticRunner>,
        handler: Arc<dyn Handler>,
        reporter: ChatReporter,
    ) -> Self {
        Self {
            runner,
            handler,
            reporter,
        }
    }

    /// Routes one message.
    pub async fn dispatch(&self, msg: &Message) {
        match classify(msg.text.as_deref()) {
            Route::Diagnostic(cmd) => {
                debug!(conv_id = %msg.conv_id, command = ?cmd, "diagnostic command");
                match AssertUnwindSafe(self.runner.run(cmd, msg)).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        self.reporter
                            .debug_full(
                                &msg.conv_id,
                                &format!("unable to handle {}: {}", cmd.action(), e),
                            )
                            .await;
                    }
                    Err(panic) => {
                        error!(
                            conv_id = %msg.conv_id,
                            panic = %panic_message(panic.as_ref()),
                            "{} handler panicked",
                            cmd.action()
                        );
                    }
                }
            }
            Route::Application => {
                match AssertUnwindSafe(self.handler.handle_command(msg))
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        self.reporter
                            .debug(&msg.conv_id, &format!("unable to handle command: {}", e))
                            .await;
                    }
                    Err(panic) => {
                        error!(
                            conv_id = %msg.conv_id,
                            panic = %panic_message(panic.as_ref()),
                            "command handler panicked"
                        );
                    }
                }
            }
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
