//! Orchestration core for botbase chat bots.
//!
//! This crate runs a bot on top of any chat backend that implements
//! [`ChatTransport`]:
//! - two listener loops, one for messages and one for new conversations
//! - a [`CommandDispatcher`] that routes diagnostic commands to the
//!   [`DiagnosticRunner`] and everything else to the application [`Handler`]
//! - a one-shot [`ShutdownSignal`] shared by both loops and fired on
//!   SIGINT/SIGTERM
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use botbase_core::ServerConfig;
//! use botbase_runtime::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(ServerConfig::from_env());
//!     server.start(&MyConnector::new()).await?;
//!     server.send_announcement("I'm running.").await?;
//!
//!     let server = Arc::new(server);
//!     let signals = Arc::clone(&server);
//!     tokio::spawn(async move { signals.handle_signals(None).await });
//!
//!     server.listen(Arc::new(MyHandler)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Concurrency
//!
//! The loops check the shutdown signal before each read and never
//! interrupt an in-flight read. Profile uploads run on their own tasks and are
//! not cancelled by shutdown.

pub mod diagnostics;
pub mod dispatch;
pub mod fs_bridge;
pub mod handler;
pub mod listener;
pub mod process;
pub mod reporter;
pub mod server;
pub mod shutdown;
pub mod signals;
pub mod transport;

pub use diagnostics::{botlog_folder, DiagnosticRunner};
pub use dispatch::CommandDispatcher;
pub use fs_bridge::{CommandFsBridge, FilesystemBridge};
pub use handler::{Handler, LogSource, Shutdowner};
pub use process::{run_captured, run_checked, ProcessOutput};
pub use reporter::ChatReporter;
pub use server::Server;
pub use shutdown::{ShutdownListener, ShutdownSignal};
pub use signals::wait_for_os_signal;
pub use transport::{ChatTransport, Connector, Subscription};
