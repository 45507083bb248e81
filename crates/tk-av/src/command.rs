//! External tool invocation.
//!
//! [`ToolCommand::execute`] runs a short-lived tool (a probe, a version check)
//! to completion under a timeout. Long runs that need streaming output use
//! [`ToolCommand::spawn`] and manage the child themselves.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};

/// Bound for short-lived tool runs.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Captured output of a successful run, decoded lossily as UTF-8.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    /// Warnings a tool may print even when it succeeds.
    pub stderr: String,
}

/// Program path, arguments, and time bound of one tool run.
///
/// # Example
///
/// ```no_run
/// use std::path::PathBuf;
/// use std::time::Duration;
/// use tk_av::ToolCommand;
///
/// # async fn example() -> tk_core::Result<()> {
/// let mut probe = ToolCommand::new(PathBuf::from("ffprobe"));
/// probe
///     .args(["-loglevel", "error", "-print_format", "json", "-show_format"])
///     .arg("https://cdn.example.com/upload.mkv")
///     .timeout(Duration::from_secs(30));
/// let format_json = probe.execute().await?.stdout;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time of [`ToolCommand::execute`].
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// File name of the program, for messages.
    pub fn program_name(&self) -> String {
        program_name(&self.program)
    }

    /// Start the process with piped stdout/stderr and a null stdin.
    ///
    /// The child is killed if its handle is dropped, so an abandoned run never
    /// outlives its owner.
    pub fn spawn(&self) -> std::io::Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// - Returns [`tk_core::Error::Tool`] if the process times out (message
    ///   includes the timeout duration); the process is killed.
    /// - Returns [`tk_core::Error::Tool`] if the process exits with a non-zero
    ///   status (message includes stderr).
    /// - Returns [`tk_core::Error::Tool`] if spawning the process fails.
    pub async fn execute(&self) -> tk_core::Result<ToolOutput> {
        let program_name = self.program_name();

        let child = self.spawn().map_err(|e| {
            tk_core::Error::tool(program_name.clone(), format!("failed to spawn: {e}"))
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        match result {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(tk_core::Error::tool(
                        program_name,
                        format!(
                            "exited with status {}: {}",
                            output.status,
                            tool_output.stderr.trim()
                        ),
                    ));
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(tk_core::Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            Err(_elapsed) => Err(tk_core::Error::tool(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}

pub(crate) fn program_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string_lossy().to_string())
}
