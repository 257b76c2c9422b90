//! botbase console runner.
//!
//! Start with:
//! ```bash
//! cargo run -p botbase-cli -- --user alice --admin alice
//! ```
//! then type `!pprof cpu -d 10s` or any other text.

mod console;

use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use botbase_core::{BotError, ConvSummary, Message, Result, ServerConfig, DEFAULT_BOT_ADMINS};
use botbase_runtime::{ChatTransport, Handler, Server};

use crate::console::ConsoleConnector;

/// Run a botbase server against the local terminal
#[derive(Parser, Debug)]
#[command(name = "botbase")]
#[command(about = "Run a botbase chat bot with stdin as the chat")]
struct Args {
    /// Account name that stdin lines are sent as
    #[arg(short, long, env = "BOTBASE_CONSOLE_USER", default_value = DEFAULT_BOT_ADMINS[0])]
    user: String,

    /// Admin allowed to run diagnostic commands (repeatable)
    #[arg(short, long = "admin")]
    admins: Vec<String>,

    /// Announcement target
    #[arg(long)]
    announce: Option<String>,

    /// Program that runs `log send` and `pprof`
    #[arg(long, default_value = "keybase")]
    program: String,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Replies to every message with its text.
struct EchoHandler {
    transport: Arc<dyn ChatTransport>,
}

#[async_trait]
impl Handler for EchoHandler {
    async fn handle_command(&self, msg: &Message) -> Result<()> {
        let Some(text) = msg.text.as_deref() else {
            return Ok(());
        };
        self.transport
            .send_by_conv_id(&msg.conv_id, &format!("echo: {}", text))
            .await
    }

    async fn handle_new_conv(&self, conv: &ConvSummary) -> Result<()> {
        self.transport
            .send_by_conv_id(&conv.id, "Hello! Everything you say, I say back.")
            .await
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let _ = dotenvy::dotenv();

    let filter = match args.verbose {
        0 => "botbase=info,botbase_runtime=info",
        1 => "botbase=debug,botbase_runtime=debug,botbase_core=debug",
        2 => "botbase=trace,botbase_runtime=trace,botbase_core=trace",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut config = ServerConfig::from_env().with_fs_program(args.program.clone());
    if let Some(announce) = args.announce {
        config = config.with_announcement(announce);
    }
    if !args.admins.is_empty() {
        config = config.with_bot_admins(args.admins);
    }

    let mut server = Server::new(config);
    let transport = server
        .start(&ConsoleConnector::new(args.user.clone(), args.program))
        .await?;
    info!(user = %args.user, "console connected");

    if let Err(e) = server.send_announcement("I'm running.").await {
        error!(error = %e, "announcement failed");
    }

    let server = Arc::new(server);
    let signals = Arc::clone(&server);
    tokio::spawn(async move {
        if let Err(e) = signals.handle_signals(None).await {
            error!(error = %e, "signal handling failed");
        }
    });

    println!("\n[botbase] type a message, Ctrl+C or Ctrl+D to stop\n");

    match server.listen(Arc::new(EchoHandler { transport })).await {
        Ok(()) => Ok(()),
        Err(BotError::SubscriptionClosed(reason)) => {
            info!(reason = %reason, "console closed");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
