use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

pub(crate) fn command_line(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Seam between the skills and the processes they shell out to.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    fn working_dir(&self) -> &Path;

    fn default_timeout(&self) -> Duration {
        Duration::from_secs(60)
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput>;

    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        self.run_with_timeout(program, args, self.default_timeout())
            .await
    }

    /// Runs the command and returns stdout, failing on a non-zero exit.
    async fn run_checked(&self, program: &str, args: &[&str]) -> Result<String> {
        let output = self.run(program, args).await?;

        if !output.success {
            return Err(Error::CommandFailed {
                command: command_line(program, args),
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

/// Runs real processes with `tokio::process`.
pub struct SystemRunner {
    working_dir: PathBuf,
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn default_timeout(&self) -> Duration {
        self.timeout
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput> {
        debug!(program, args = ?args, dir = %self.working_dir.display(), "Running command");

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(&self.working_dir)
            .kill_on_drop(true);

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ToolNotFound(program.to_string()));
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                warn!(program, args = ?args, secs = timeout.as_secs(), "Command timed out");
                return Err(Error::Timeout {
                    command: command_line(program, args),
                    secs: timeout.as_secs(),
                });
            }
        };

        let result = CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !result.success {
            warn!(program, args = ?args, stderr = %result.stderr.trim(), "Command failed");
        }

        Ok(result)
    }
}


#[cfg(test)]
mod tests {
    use super::fake::ScriptedRunner;
    use super::*;

    #[test]
    fn test_command_line() {
        assert_eq!(command_line("git", &["log", "-1"]), "git log -1");
        assert_eq!(command_line("gh", &[]), "gh");
    }

    #[tokio::test]
    async fn test_run_checked_returns_stdout() {
        let runner = ScriptedRunner::new().on("git status", "clean\n");
        let out = runner.run_checked("git", &["status"]).await.unwrap();
        assert_eq!(out, "clean\n");
    }

    #[tokio::test]
    async fn test_run_checked_reports_failure() {
        let runner = ScriptedRunner::new().fail("git log", "fatal: bad revision");
        let err = runner.run_checked("git", &["log"]).await.unwrap_err();
        match err {
            Error::CommandFailed { command, stderr } => {
                assert_eq!(command, "git log");
                assert_eq!(stderr, "fatal: bad revision");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_longest_prefix_wins() {
        let runner = ScriptedRunner::new()
            .on("git", "generic")
            .on("git log -1", "specific");
        let out = runner.run_checked("git", &["log", "-1", "x"]).await.unwrap();
        assert_eq!(out, "specific");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let runner = ScriptedRunner::new().missing("radon");
        let err = runner.run("radon", &["cc", "."]).await.unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(name) if name == "radon"));
    }

    #[tokio::test]
    async fn test_system_runner_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let runner = SystemRunner::new(dir.path());
        let err = runner
            .run("definitely-not-a-real-binary-skillsets", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
    }
}
