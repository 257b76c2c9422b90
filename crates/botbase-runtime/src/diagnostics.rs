//! Admin-only diagnostic commands: log send, bot log retrieval, profiling.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempPath;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use botbase_core::{
    format_duration, plan_profile, AdminGate, BotError, Channel, ConvId, DiagnosticCommand,
    Message, ProfilePlan, Result, ServerConfig, PROFILE_USAGE,
};

use crate::fs_bridge::FilesystemBridge;
use crate::handler::LogSource;
use crate::process::{run_captured, run_checked};
use crate::reporter::ChatReporter;
use crate::transport::ChatTransport;

/// Runs diagnostic commands for allow-listed senders.
///
/// Profiling uploads happen on spawned tasks. Their handles are kept until
/// collected with [`take_deliveries`](Self::take_deliveries); shutting the
/// server down does not cancel them, so a capture in flight at shutdown
/// still uploads and cleans up on its own schedule.
pub struct DiagnosticRunner {
    transport: Arc<dyn ChatTransport>,
    config: Arc<ServerConfig>,
    gate: AdminGate,
    reporter: ChatReporter,
    log_source: Option<Arc<dyn LogSource>>,
    fs_bridge: Arc<dyn FilesystemBridge>,
    deliveries: Mutex<Vec<JoinHandle<()>>>,
}

impl DiagnosticRunner {
    /// Creates a runner.
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        config: Arc<ServerConfig>,
        log_source: Option<Arc<dyn LogSource>>,
        fs_bridge: Arc<dyn FilesystemBridge>,
    ) -> Self {
        Self {
            gate: AdminGate::new(config.bot_admins.iter().cloned()),
            reporter: ChatReporter::new(Arc::clone(&transport)),
            transport,
            config,
            log_source,
            fs_bridge,
            deliveries: Mutex::new(Vec::new()),
        }
    }

    /// The allow-list in force.
    pub fn gate(&self) -> &AdminGate {
        &self.gate
    }

    /// Runs `cmd` on behalf of the message sender.
    ///
    /// Senders not on the allow-list are ignored without a reply.
    pub async fn run(&self, cmd: DiagnosticCommand, msg: &Message) -> Result<()> {
        if !self.gate.check(msg.sender_name(), cmd.action()) {
            return Ok(());
        }
        info!(sender = %msg.sender_name(), conv_id = %msg.conv_id, "running {}", cmd.action());
        match cmd {
            DiagnosticCommand::LogSend => self.log_send(msg).await,
            DiagnosticCommand::BotLog => self.bot_log(msg).await,
            DiagnosticCommand::Profile => self.profile(msg).await,
        }
    }

    /// Hands over the handles of uploads started so far.
    pub fn take_deliveries(&self) -> Vec<JoinHandle<()>> {
        let mut deliveries = self
            .deliveries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *deliveries)
    }

    async fn log_send(&self, msg: &Message) -> Result<()> {
        let conv_id = &msg.conv_id;
        self.reporter.echo(conv_id, "starting a log send...").await;

        let args = vec![
            "log".to_string(),
            "send".to_string(),
            "--no-confirm".to_string(),
            "--feedback".to_string(),
            format!("managed-bot log requested by @{}", msg.sender_name()),
        ];
        let output = run_captured(self.transport.command(&args), self.config.command_timeout).await?;
        if !output.stdout.is_empty() {
            self.reporter
                .debug_full(conv_id, &format!("log send output: ```{}```", output.stdout))
                .await;
        }
        output.check()
    }

    async fn profile(&self, msg: &Message) -> Result<()> {
        let conv_id = &msg.conv_id;
        let body = msg.text.as_deref().unwrap_or_default();
        let default = self.config.default_profile_duration;

        let request = match plan_profile(body, &self.config.tmp_dir, default, unix_now())? {
            ProfilePlan::Usage => {
                self.reporter.debug_full(conv_id, PROFILE_USAGE).await;
                return Ok(());
            }
            ProfilePlan::Capture(request) => request,
        };

        if let Some(e) = &request.duration_error {
            self.reporter
                .debug_full(
                    conv_id,
                    &format!(
                        "unable to parse duration using default of {}: {}",
                        format_duration(default),
                        e
                    ),
                )
                .await;
        }

        self.reporter
            .echo(conv_id, &format!("starting pprof... [{}]", request.args.join(" ")))
            .await;
        if let Err(e) =
            run_checked(self.transport.command(&request.args), self.config.command_timeout).await
        {
            remove_artifact(&request.output_path).await;
            return Err(e);
        }

        let handle = tokio::spawn(deliver_profile(
            Arc::clone(&self.transport),
            self.reporter.clone(),
            conv_id.clone(),
            request.output_path.clone(),
            request.ready_after(self.config.attachment_grace),
            self.config.cleanup_delay,
        ));
        self.track(handle);
        Ok(())
    }

    async fn bot_log(&self, msg: &Message) -> Result<()> {
        let conv_id = &msg.conv_id;
        let (options, source) = match (&self.config.log_source, &self.log_source) {
            (Some(options), Some(source)) => (options, source),
            (None, _) => {
                return Err(BotError::Config("log source not configured".to_string()));
            }
            (Some(_), None) => {
                return Err(BotError::Config("no log source client installed".to_string()));
            }
        };

        self.reporter.echo(conv_id, "fetching logs from cloud watch").await;
        let lines = source.latest_lines(options).await?;

        let folder = botlog_folder(&msg.channel);
        self.fs_bridge
            .make_dir(&folder)
            .await
            .map_err(|e| BotError::FsBridge(format!("failed to make directory: {}", e)))?;

        let tmp_dir = self.config.tmp_dir.clone();
        let secs = unix_now();
        let artifact = tokio::task::spawn_blocking(move || write_botlog(&tmp_dir, secs, &lines))
            .await
            .map_err(|e| BotError::Task(e.to_string()))?
            .map_err(|e| BotError::FsBridge(format!("failed to write log output: {}", e)))?;
        let file_name = artifact
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.fs_bridge
            .move_file(&artifact, &folder)
            .await
            .map_err(|e| BotError::FsBridge(format!("failed to move log output: {}", e)))?;

        let dest = format!("{}/{}", folder, file_name);
        self.reporter.echo(conv_id, &format!("log output: {}", dest)).await;
        Ok(())
    }

    fn track(&self, handle: JoinHandle<()>) {
        let mut deliveries = self
            .deliveries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        deliveries.retain(|h| !h.is_finished());
        deliveries.push(handle);
    }
}

/// Folder in the shared filesystem where `!botlog` output lands.
pub fn botlog_folder(channel: &Channel) -> String {
    let tld = if channel.is_team() { "team" } else { "private" };
    format!("/keybase/{}/{}/botlogs", tld, channel.name)
}

/// Waits for a capture to finish, uploads it, then deletes it.
async fn deliver_profile(
    transport: Arc<dyn ChatTransport>,
    reporter: ChatReporter,
    conv_id: ConvId,
    path: PathBuf,
    ready_after: Duration,
    cleanup_delay: Duration,
) {
    tokio::time::sleep(ready_after).await;
    if let Err(e) = transport.send_attachment(&conv_id, &path, "").await {
        reporter
            .debug_full(&conv_id, &format!("unable to send attachment profile: {}", e))
            .await;
    }

    tokio::time::sleep(cleanup_delay).await;
    debug!(path = %path.display(), "cleaning up");
    remove_artifact(&path).await;
}

/// Deletes a capture output. Failures are logged only.
async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!(path = %path.display(), error = %e, "unable to clean up"),
    }
}

/// Writes `!botlog` output to `<dir>/botlogs-<secs>.txt`.
///
/// The file is deleted when the returned path is dropped.
fn write_botlog(dir: &Path, secs: u64, lines: &[String]) -> std::io::Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(&format!("botlogs-{}", secs))
        .suffix(".txt")
        .rand_bytes(0)
        .tempfile_in(dir)?;
    file.write_all(lines.join("\n").as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}

fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}
