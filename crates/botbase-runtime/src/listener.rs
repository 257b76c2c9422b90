//! The two listener loops.
//!
//! Each loop polls the shutdown signal before every read, so a loop stops
//! at most one read after shutdown is requested. An in-flight read is not
//! interrupted.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, warn};

use botbase_core::{BotError, Result};

use crate::dispatch::{panic_message, CommandDispatcher};
use crate::handler::Handler;
use crate::shutdown::ShutdownListener;
use crate::transport::Subscription;

/// What a loop should do after a failed read.
fn on_read_error(name: &str, shutdown: &ShutdownListener, e: BotError) -> Option<Result<()>> {
    if !e.is_fatal() {
        debug!(listener = name, error = %e, "read error");
        return None;
    }
    if shutdown.is_signaled() {
        debug!(listener = name, error = %e, "subscription closed during shutdown");
        return Some(Ok(()));
    }
    warn!(listener = name, error = %e, "subscription closed");
    Some(Err(e))
}

/// Reads chat messages and dispatches them until shutdown.
pub async fn listen_for_messages(
    shutdown: ShutdownListener,
    sub: Arc<dyn Subscription>,
    dispatcher: Arc<CommandDispatcher>,
) -> Result<()> {
    loop {
        if shutdown.is_signaled() {
            debug!("message listener: shutting down");
            return Ok(());
        }

        let msg = match sub.read_message().await {
            Ok(msg) => msg,
            Err(e) => match on_read_error("messages", &shutdown, e) {
                Some(done) => return done,
                None => {
                    tokio::task::yield_now().await;
                    continue;
                }
            },
        };

        dispatcher.dispatch(&msg).await;
    }
}

/// Reads new-conversation events and passes them to the handler until
/// shutdown.
pub async fn listen_for_convs(
    shutdown: ShutdownListener,
    sub: Arc<dyn Subscription>,
    handler: Arc<dyn Handler>,
) -> Result<()> {
    loop {
        if shutdown.is_signaled() {
            debug!("conversation listener: shutting down");
            return Ok(());
        }

        let conv = match sub.read_new_conv().await {
            Ok(conv) => conv,
            Err(e) => match on_read_error("convs", &shutdown, e) {
                Some(done) => return done,
                None => {
                    tokio::task::yield_now().await;
                    continue;
                }
            },
        };

        match AssertUnwindSafe(handler.handle_new_conv(&conv))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(conv_id = %conv.id, error = %e, "unable to handle new conversation"),
            Err(panic) => error!(
                conv_id = %conv.id,
                panic = %panic_message(panic.as_ref()),
                "new conversation handler panicked"
            ),
        }
    }
}
