//! Server configuration.
//!
//! A [`ServerConfig`] is built once, before the server starts, and is then
//! shared read-only by every loop and handler.
//!
//! # Environment Variables
//!
//! - `BOTBASE_ANNOUNCEMENT`: conversation, user or team to announce to
//! - `BOTBASE_BOT_ADMINS`: comma separated admin allow-list
//! - `BOTBASE_LOG_REGION` / `BOTBASE_LOG_GROUP`: external log source scope
//! - `BOTBASE_TMP_DIR`: directory for diagnostic artifacts
//! - `BOTBASE_FS_PROGRAM`: program providing the `fs` bridge commands

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

/// Environment variable for the announcement target.
pub const ANNOUNCEMENT_ENV: &str = "BOTBASE_ANNOUNCEMENT";

/// Environment variable for the admin allow-list.
pub const BOT_ADMINS_ENV: &str = "BOTBASE_BOT_ADMINS";

/// Environment variable for the log source region.
pub const LOG_REGION_ENV: &str = "BOTBASE_LOG_REGION";

/// Environment variable for the log source group.
pub const LOG_GROUP_ENV: &str = "BOTBASE_LOG_GROUP";

/// Environment variable for the artifact directory.
pub const TMP_DIR_ENV: &str = "BOTBASE_TMP_DIR";

/// Environment variable for the filesystem bridge program.
pub const FS_PROGRAM_ENV: &str = "BOTBASE_FS_PROGRAM";

/// Admins used when none are configured.
pub const DEFAULT_BOT_ADMINS: &[&str] = &["botadmin"];

/// Capture window used when a `!pprof` duration does not parse.
pub const DEFAULT_PROFILE_DURATION: Duration = Duration::from_secs(5 * 60);

/// Where the external log source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSourceOptions {
    /// Region / credential scope.
    pub region: String,
    /// Log group to read from.
    pub log_group: String,
}

impl LogSourceOptions {
    /// Creates log source options.
    pub fn new(region: impl Into<String>, log_group: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            log_group: log_group.into(),
        }
    }
}

/// Configuration for a bot server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Announcement target. `None` disables announcements.
    pub announcement: Option<String>,
    /// Accounts allowed to run diagnostic commands. Exact match only.
    pub bot_admins: Vec<String>,
    /// External log source, required by `!botlog`.
    pub log_source: Option<LogSourceOptions>,
    /// Directory where diagnostic artifacts are written.
    pub tmp_dir: PathBuf,
    /// Extra wait after a capture window before uploading the result.
    pub attachment_grace: Duration,
    /// Wait after an upload attempt before deleting the artifact.
    pub cleanup_delay: Duration,
    /// Upper bound on any single diagnostic subprocess.
    pub command_timeout: Duration,
    /// Capture window used when the requested one does not parse.
    pub default_profile_duration: Duration,
    /// Program providing `fs mkdir` / `fs mv`.
    pub fs_program: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            announcement: None,
            bot_admins: DEFAULT_BOT_ADMINS.iter().map(|s| s.to_string()).collect(),
            log_source: None,
            tmp_dir: std::env::temp_dir(),
            attachment_grace: Duration::from_secs(1),
            cleanup_delay: Duration::from_secs(60),
            command_timeout: Duration::from_secs(10 * 60),
            default_profile_duration: DEFAULT_PROFILE_DURATION,
            fs_program: "keybase".to_string(),
        }
    }
}

impl ServerConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a config from `BOTBASE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(announcement) = lookup(ANNOUNCEMENT_ENV) {
            config = config.with_announcement(announcement);
        }

        if let Some(admins) = lookup(BOT_ADMINS_ENV) {
            let admins = parse_admin_list(&admins);
            if admins.is_empty() {
                debug!("{} is empty, keeping default admins", BOT_ADMINS_ENV);
            } else {
                config.bot_admins = admins;
            }
        }

        match (lookup(LOG_REGION_ENV), lookup(LOG_GROUP_ENV)) {
            (Some(region), Some(group)) if !region.is_empty() && !group.is_empty() => {
                config.log_source = Some(LogSourceOptions::new(region, group));
            }
            (None, None) => {}
            _ => debug!(
                "both {} and {} are needed for a log source",
                LOG_REGION_ENV, LOG_GROUP_ENV
            ),
        }

        if let Some(dir) = lookup(TMP_DIR_ENV).filter(|d| !d.is_empty()) {
            config.tmp_dir = PathBuf::from(dir);
        }

        if let Some(program) = lookup(FS_PROGRAM_ENV).filter(|p| !p.is_empty()) {
            config.fs_program = program;
        }

        config
    }

    /// Sets the announcement target. An empty string disables announcements.
    pub fn with_announcement(mut self, announcement: impl Into<String>) -> Self {
        let announcement = announcement.into();
        self.announcement = if announcement.trim().is_empty() {
            None
        } else {
            Some(announcement)
        };
        self
    }

    /// Replaces the admin allow-list.
    pub fn with_bot_admins<I, S>(mut self, admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bot_admins = admins.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the external log source.
    pub fn with_log_source(mut self, options: LogSourceOptions) -> Self {
        self.log_source = Some(options);
        self
    }

    /// Sets the artifact directory.
    pub fn with_tmp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tmp_dir = dir.into();
        self
    }

    /// Sets the grace period before an upload.
    pub fn with_attachment_grace(mut self, grace: Duration) -> Self {
        self.attachment_grace = grace;
        self
    }

    /// Sets the delay before an artifact is deleted.
    pub fn with_cleanup_delay(mut self, delay: Duration) -> Self {
        self.cleanup_delay = delay;
        self
    }

    /// Sets the subprocess timeout.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the filesystem bridge program.
    pub fn with_fs_program(mut self, program: impl Into<String>) -> Self {
        self.fs_program = program.into();
        self
    }
}

fn parse_admin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
