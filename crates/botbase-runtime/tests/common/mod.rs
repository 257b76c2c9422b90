//! Test doubles for the server's collaborators.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{mpsc, watch};

use botbase_core::{
    BotError, Channel, ConvId, ConvSummary, LogSourceOptions, Message, Result, ServerConfig,
};
use botbase_runtime::{
    ChatTransport, Connector, FilesystemBridge, Handler, LogSource, Shutdowner, Subscription,
};

pub const ADMIN: &str = "admin";

pub fn config(tmp: &Path) -> ServerConfig {
    ServerConfig::new()
        .with_bot_admins([ADMIN])
        .with_tmp_dir(tmp)
        .with_attachment_grace(Duration::from_millis(10))
        .with_cleanup_delay(Duration::from_millis(20))
        .with_command_timeout(Duration::from_secs(5))
}

pub fn text(sender: &str, body: &str) -> Message {
    Message::text("conv-1", sender, Channel::direct("admin,bot"), body)
}

/// Polls `cond` until it holds or a second passes.
pub async fn wait_until<F: Fn() -> bool>(cond: F) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}

// ---------------------------------------------------------------------------
// Subscription

pub struct MockSubscription {
    messages: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<Message>>>,
    convs: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<ConvSummary>>>,
    closed: watch::Sender<bool>,
    pub message_reads: AtomicUsize,
    pub conv_reads: AtomicUsize,
}

impl MockSubscription {
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    async fn read<T>(
        &self,
        rx: &tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<T>>>,
    ) -> Result<T> {
        let mut closed = self.closed.subscribe();
        let mut rx = rx.lock().await;
        tokio::select! {
            item = rx.recv() => {
                item.unwrap_or_else(|| Err(BotError::SubscriptionClosed("feed dropped".to_string())))
            }
            _ = closed.wait_for(|c| *c) => {
                Err(BotError::SubscriptionClosed("transport shut down".to_string()))
            }
        }
    }
}

#[async_trait]
impl Subscription for MockSubscription {
    async fn read_message(&self) -> Result<Message> {
        self.message_reads.fetch_add(1, Ordering::SeqCst);
        self.read(&self.messages).await
    }

    async fn read_new_conv(&self) -> Result<ConvSummary> {
        self.conv_reads.fetch_add(1, Ordering::SeqCst);
        self.read(&self.convs).await
    }
}

/// Test-side ends of a subscription.
pub struct Feed {
    pub messages: Option<mpsc::UnboundedSender<Result<Message>>>,
    pub convs: Option<mpsc::UnboundedSender<Result<ConvSummary>>>,
}

impl Feed {
    pub fn message(&self, msg: Message) {
        self.messages.as_ref().unwrap().send(Ok(msg)).unwrap();
    }

    pub fn message_error(&self, e: BotError) {
        self.messages.as_ref().unwrap().send(Err(e)).unwrap();
    }

    pub fn conv(&self, conv: ConvSummary) {
        self.convs.as_ref().unwrap().send(Ok(conv)).unwrap();
    }
}

// ---------------------------------------------------------------------------
// Transport

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Conv(String, String),
    Account(String, String),
    Group(String, String),
}

impl Sent {
    pub fn body(&self) -> &str {
        match self {
            Sent::Conv(_, b) | Sent::Account(_, b) | Sent::Group(_, b) => b,
        }
    }
}

pub struct MockTransport {
    pub sub: Arc<MockSubscription>,
    pub sent: Mutex<Vec<Sent>>,
    pub attachments: Mutex<Vec<(ConvId, PathBuf)>>,
    pub commands: Mutex<Vec<Vec<String>>>,
    pub shutdowns: AtomicUsize,
    pub fail_conv: AtomicBool,
    pub fail_account: AtomicBool,
    pub fail_group: AtomicBool,
    pub fail_attachment: AtomicBool,
    program: Vec<String>,
}

impl MockTransport {
    /// `program` is the command line every `command()` call runs; the
    /// requested args are appended.
    pub fn new(program: &[&str]) -> (Arc<Self>, Feed) {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (conv_tx, conv_rx) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);
        let sub = Arc::new(MockSubscription {
            messages: tokio::sync::Mutex::new(msg_rx),
            convs: tokio::sync::Mutex::new(conv_rx),
            closed,
            message_reads: AtomicUsize::new(0),
            conv_reads: AtomicUsize::new(0),
        });
        let transport = Arc::new(Self {
            sub,
            sent: Mutex::new(Vec::new()),
            attachments: Mutex::new(Vec::new()),
            commands: Mutex::new(Vec::new()),
            shutdowns: AtomicUsize::new(0),
            fail_conv: AtomicBool::new(false),
            fail_account: AtomicBool::new(false),
            fail_group: AtomicBool::new(false),
            fail_attachment: AtomicBool::new(false),
            program: program.iter().map(|s| s.to_string()).collect(),
        });
        let feed = Feed {
            messages: Some(msg_tx),
            convs: Some(conv_tx),
        };
        (transport, feed)
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_containing(&self, needle: &str) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| s.body().contains(needle))
            .collect()
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }

    pub fn attachments(&self) -> Vec<(ConvId, PathBuf)> {
        self.attachments.lock().unwrap().clone()
    }

    fn record(&self, sent: Sent, fail: &AtomicBool, what: &str) -> Result<()> {
        self.sent.lock().unwrap().push(sent);
        if fail.load(Ordering::SeqCst) {
            return Err(BotError::Transport(format!("{} send failed", what)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn listen(&self) -> Result<Arc<dyn Subscription>> {
        Ok(Arc::clone(&self.sub) as Arc<dyn Subscription>)
    }

    async fn send_by_conv_id(&self, conv_id: &ConvId, body: &str) -> Result<()> {
        self.record(
            Sent::Conv(conv_id.to_string(), body.to_string()),
            &self.fail_conv,
            "conv",
        )
    }

    async fn send_by_account_name(&self, name: &str, body: &str) -> Result<()> {
        self.record(
            Sent::Account(name.to_string(), body.to_string()),
            &self.fail_account,
            "account",
        )
    }

    async fn send_by_group_name(&self, team: &str, body: &str) -> Result<()> {
        self.record(
            Sent::Group(team.to_string(), body.to_string()),
            &self.fail_group,
            "group",
        )
    }

    async fn send_attachment(&self, conv_id: &ConvId, path: &Path, _title: &str) -> Result<()> {
        self.attachments
            .lock()
            .unwrap()
            .push((conv_id.clone(), path.to_path_buf()));
        if self.fail_attachment.load(Ordering::SeqCst) {
            return Err(BotError::Transport("upload failed".to_string()));
        }
        Ok(())
    }

    fn command(&self, args: &[String]) -> Command {
        self.commands.lock().unwrap().push(args.to_vec());
        let mut cmd = Command::new(&self.program[0]);
        cmd.args(&self.program[1..]).args(args);
        cmd
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.sub.close();
        Ok(())
    }
}

pub struct MockConnector(pub Arc<MockTransport>);

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Arc<dyn ChatTransport>> {
        Ok(Arc::clone(&self.0) as Arc<dyn ChatTransport>)
    }
}

// ---------------------------------------------------------------------------
// Handler

#[derive(Default)]
pub struct MockHandler {
    pub commands: Mutex<Vec<Message>>,
    pub convs: Mutex<Vec<ConvSummary>>,
}

impl MockHandler {
    pub fn command_count(&self) -> usize {
        self.commands.lock().unwrap().len()
    }

    pub fn conv_count(&self) -> usize {
        self.convs.lock().unwrap().len()
    }
}

#[async_trait]
impl Handler for MockHandler {
    async fn handle_command(&self, msg: &Message) -> Result<()> {
        self.commands.lock().unwrap().push(msg.clone());
        match msg.text.as_deref() {
            Some("panic") => panic!("handler exploded"),
            Some("fail") => Err(BotError::handler("no such command")),
            _ => Ok(()),
        }
    }

    async fn handle_new_conv(&self, conv: &ConvSummary) -> Result<()> {
        self.convs.lock().unwrap().push(conv.clone());
        if conv.id.as_str() == "bad-conv" {
            return Err(BotError::handler("cannot greet"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Log source and filesystem bridge

pub struct MockLogSource {
    pub lines: Vec<String>,
    pub calls: AtomicUsize,
}

impl MockLogSource {
    pub fn new(lines: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LogSource for MockLogSource {
    async fn latest_lines(&self, _options: &LogSourceOptions) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.lines.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOp {
    MakeDir(String),
    /// Source path, destination folder, file content at move time.
    Move(PathBuf, String, String),
}

#[derive(Default)]
pub struct MockBridge {
    pub ops: Mutex<Vec<BridgeOp>>,
    pub fail_move: AtomicBool,
}

impl MockBridge {
    pub fn ops(&self) -> Vec<BridgeOp> {
        self.ops.lock().unwrap().clone()
    }
}

#[async_trait]
impl FilesystemBridge for MockBridge {
    async fn make_dir(&self, path: &str) -> Result<()> {
        self.ops.lock().unwrap().push(BridgeOp::MakeDir(path.to_string()));
        Ok(())
    }

    async fn move_file(&self, src: &Path, dest_dir: &str) -> Result<()> {
        let content = tokio::fs::read_to_string(src).await?;
        self.ops.lock().unwrap().push(BridgeOp::Move(
            src.to_path_buf(),
            dest_dir.to_string(),
            content,
        ));
        if self.fail_move.load(Ordering::SeqCst) {
            return Err(BotError::Transport("mv refused".to_string()));
        }
        // A real bridge leaves nothing behind locally.
        tokio::fs::remove_file(src).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Secondary shutdown

#[derive(Default)]
pub struct MockShutdowner {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Shutdowner for MockShutdowner {
    async fn shutdown(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(BotError::Transport("already stopped".to_string()))
    }
}
