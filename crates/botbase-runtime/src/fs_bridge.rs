//! Bridge into the chat backend's shared filesystem.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use botbase_core::Result;

use crate::process::run_checked;

/// Directory and move operations inside the shared filesystem namespace
/// (`/keybase/team/<name>/...`, `/keybase/private/<names>/...`).
#[async_trait]
pub trait FilesystemBridge: Send + Sync {
    /// Creates `path`, including parents.
    async fn make_dir(&self, path: &str) -> Result<()>;

    /// Moves a local file into `dest_dir`.
    async fn move_file(&self, src: &Path, dest_dir: &str) -> Result<()>;
}

/// Bridge backed by `<program> fs mkdir` and `<program> fs mv`.
#[derive(Debug, Clone)]
pub struct CommandFsBridge {
    program: String,
    timeout: Duration,
}

impl CommandFsBridge {
    /// Creates a bridge that runs `program`.
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn fs_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("fs");
        cmd
    }
}

#[async_trait]
impl FilesystemBridge for CommandFsBridge {
    async fn make_dir(&self, path: &str) -> Result<()> {
        debug!(path = %path, "fs mkdir");
        let mut cmd = self.fs_command();
        cmd.arg("mkdir").arg(path);
        run_checked(cmd, self.timeout).await.map(|_| ())
    }

    async fn move_file(&self, src: &Path, dest_dir: &str) -> Result<()> {
        debug!(src = %src.display(), dest = %dest_dir, "fs mv");
        let mut cmd = self.fs_command();
        cmd.arg("mv").arg(src).arg(dest_dir);
        run_checked(cmd, self.timeout).await.map(|_| ())
    }
}
