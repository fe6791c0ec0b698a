//! Git subprocess runner.
//!
//! Every git invocation goes through `GitRunner::run`, which passes its
//! arguments to the binary as an argument vector. Nothing supplied by a
//! caller is ever interpreted by a shell: a ref like `master; rm -fr /` is a
//! single (bad) revision argument. The archiver is the one user of
//! `GitRunner::shell`, and it escapes every dynamic fragment first.
//!
//! A non-zero exit status is not an error here; callers inspect
//! `ProcessOutput` and decide. Spawn failures and timeouts are errors.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::config::GitConfig;
use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct GitRunner {
    binary: PathBuf,
    timeout: Option<Duration>,
    jobs: usize,
}

#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Shell-escaped rendering of the invocation, for diagnostics
    pub command: String,
    pub stdout: Vec<u8>,
    pub stderr: String,
    /// Exit code; `None` when the process was killed by a signal
    pub status: Option<i32>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

impl GitRunner {
    pub fn new(config: &GitConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout: config.timeout,
            jobs: config.jobs.max(1),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// How many commands a single fan-out may have running at once.
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Runs `<git> --git-dir <git_dir> <args...>` without a shell.
    pub async fn run<I, S>(&self, git_dir: &Path, args: I) -> Result<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let display = self.command_line(git_dir, &args);

        let mut command = Command::new(&self.binary);
        command.arg("--git-dir").arg(git_dir).args(&args);

        self.execute(command, display).await
    }

    /// Runs a prepared shell pipeline with `sh -c`.
    ///
    /// The caller is responsible for escaping every dynamic fragment of
    /// `script` with [`shell_escape`].
    pub async fn shell(&self, script: &str) -> Result<ProcessOutput> {
        let mut command = Command::new("sh");
        command.arg("-c").arg(script);

        self.execute(command, format!("sh -c {}", shell_escape(script)))
            .await
    }

    /// Renders a git invocation the way a shell user would have to type it.
    pub fn command_line<S: AsRef<OsStr>>(&self, git_dir: &Path, args: &[S]) -> String {
        let mut parts = vec![
            shell_escape(&self.binary.to_string_lossy()),
            "--git-dir".to_string(),
            shell_escape(&git_dir.to_string_lossy()),
        ];
        parts.extend(
            args.iter()
                .map(|a| shell_escape(&a.as_ref().to_string_lossy())),
        );
        parts.join(" ")
    }

    async fn execute(&self, mut command: Command, command_display: String) -> Result<ProcessOutput> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(command = %command_display, "spawning");
        let child = command.spawn()?;

        // Dropping the wait future on timeout kills the child (kill_on_drop).
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    tracing::warn!(command = %command_display, "git command timed out");
                    AppError::Timeout {
                        command: command_display.clone(),
                        seconds: limit.as_secs(),
                    }
                })??,
            None => child.wait_with_output().await?,
        };

        let result = ProcessOutput {
            command: command_display,
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            status: output.status.code(),
        };

        if !result.success() {
            tracing::debug!(
                command = %result.command,
                status = ?result.status,
                stderr = %result.stderr.trim(),
                "command exited unsuccessfully"
            );
        }

        Ok(result)
    }
}

/// Shell-escape a single token.
///
/// Safe tokens are returned unchanged; anything else is wrapped in single
/// quotes with embedded single quotes spelled `'\''`.
pub fn shell_escape(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }

    let needs_escape = s.chars().any(|c| {
        !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | ',' | '+' | '@' | '%'))
    });

    if !needs_escape {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len() + 2);
    result.push('\'');
    for c in s.chars() {
        if c == '\'' {
            result.push_str("'\\''");
        } else {
            result.push(c);
        }
    }
    result.push('\'');
    result
}
