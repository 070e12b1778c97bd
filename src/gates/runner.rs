use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout as tokio_timeout;
use tracing::debug;

use crate::error::GateError;

/// Exit code a POSIX shell returns when the command does not exist
pub const COMMAND_NOT_FOUND: i32 = 127;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CommandOutput {
    /// Last `max_lines` lines of combined output, for failure reports
    pub fn tail(&self, max_lines: usize) -> String {
        let combined = format!("{}{}", self.stdout, self.stderr);
        let lines: Vec<&str> = combined.lines().collect();
        let start = lines.len().saturating_sub(max_lines);
        lines[start..].join("\n")
    }
}

/// Executes test commands for the test gate
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, GateError>;
}

/// Runs each candidate through `sh -c` in the roadmap directory
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

#[async_trait]
impl TestRunner for ShellRunner {
    async fn run(
        &self,
        command: &str,
        cwd: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, GateError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!("Running '{}' in {}", command, cwd.display());
        let start = Instant::now();

        // Dropping the timed-out future kills the child
        let output = tokio_timeout(timeout, cmd.output())
            .await
            .map_err(|_| GateError::Timeout(timeout))?
            .map_err(|source| GateError::Spawn {
                command: command.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shell_runner_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ShellRunner;

        let ok = runner
            .run("echo hi", dir.path(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(ok.exit_code, 0);
        assert_eq!(ok.stdout.trim(), "hi");

        let missing = runner
            .run("definitely-not-a-real-binary-xyz", dir.path(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(missing.exit_code, COMMAND_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_shell_runner_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShellRunner
            .run("sleep 5", dir.path(), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Timeout(_)));
    }

    #[test]
    fn test_output_tail() {
        let out = CommandOutput {
            exit_code: 1,
            stdout: "a\nb\nc\n".to_string(),
            stderr: "d\n".to_string(),
            duration: Duration::ZERO,
        };
        assert_eq!(out.tail(2), "c\nd");
    }
}
