//! Time-boxed subprocess execution.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::trace;

use botbase_core::{BotError, Result};

/// Output of a finished subprocess.
#[derive(Debug)]
pub struct ProcessOutput {
    /// Name of the program that ran.
    pub program: String,
    /// Exit status.
    pub status: ExitStatus,
    /// Everything written to stdout.
    pub stdout: String,
    /// Everything written to stderr.
    pub stderr: String,
}

impl ProcessOutput {
    /// Converts a non-zero exit into an error.
    pub fn check(&self) -> Result<()> {
        if self.status.success() {
            return Ok(());
        }
        let stderr = self.stderr.trim();
        let reason = if stderr.is_empty() {
            self.status.to_string()
        } else {
            format!("{}: {}", self.status, stderr)
        };
        Err(BotError::Command {
            program: self.program.clone(),
            reason,
        })
    }
}

/// Runs `cmd`, reading stdout and stderr to the end before waiting for exit.
///
/// The child is killed if it outlives `timeout`.
pub async fn run_captured(mut cmd: Command, timeout: Duration) -> Result<ProcessOutput> {
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();
    trace!(program = %program, args = ?cmd.as_std().get_args().collect::<Vec<_>>(), "spawning");

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| BotError::Command {
        program: program.clone(),
        reason: format!("unable to start command: {}", e),
    })?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let run = async {
        let (stdout, stderr) = tokio::try_join!(read_all(stdout), read_all(stderr))?;
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((status, stdout, stderr))
    };

    let (status, stdout, stderr) = match tokio::time::timeout(timeout, run).await {
        Ok(result) => result.map_err(|e| BotError::Command {
            program: program.clone(),
            reason: format!("unable to read output: {}", e),
        })?,
        Err(_) => {
            return Err(BotError::Timeout { program, timeout });
        }
    };

    trace!(
        program = %program,
        status = %status,
        stdout_len = stdout.len(),
        stderr_len = stderr.len(),
        "command completed"
    );

    Ok(ProcessOutput {
        program,
        status,
        stdout,
        stderr,
    })
}

/// Runs `cmd` and fails on a non-zero exit.
pub async fn run_checked(cmd: Command, timeout: Duration) -> Result<ProcessOutput> {
    let output = run_captured(cmd, timeout).await?;
    output.check()?;
    Ok(output)
}

async fn read_all<R>(pipe: Option<R>) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let output = run_checked(sh("echo hello"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.stdout, "hello\n");
        assert!(output.status.success());
    }

    #[tokio::test]
    async fn test_nonzero_exit_keeps_output() {
        let output = run_captured(sh("echo partial; echo bad >&2; exit 3"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.stdout, "partial\n");
        let err = output.check().unwrap_err();
        assert!(matches!(err, BotError::Command { ref reason, .. } if reason.contains("bad")));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let cmd = Command::new("/nonexistent/botbase-test-binary");
        let err = run_captured(cmd, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, BotError::Command { .. }));
    }

    #[tokio::test]
    async fn test_timeout() {
        let err = run_captured(sh("sleep 5"), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::Timeout { ref program, .. } if program == "sh"));
    }
}
