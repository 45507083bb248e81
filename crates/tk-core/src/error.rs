//! Failure taxonomy for the trackkeep pipeline.
//!
//! Each stage owns a small error enum ([`ProbeError`], [`SelectionError`],
//! [`ExecutionError`], [`ControllerError`]); all of them funnel into the
//! unified [`Error`] so a task owner can render exactly one human-readable
//! failure line via [`Error::user_message`].

use std::time::Duration;

const STOPPED_BY_USER: &str = "Stopped by user";

/// Failures while inspecting a media container.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The probing tool could not be started or exited non-zero.
    #[error("probe tool failed: {0}")]
    ToolFailed(String),

    /// The tool succeeded but its output is not the expected JSON shape.
    #[error("malformed probe output: {0}")]
    MalformedOutput(String),
}

/// Failures of the automatic selection path.
#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    /// No playable (non cover-art) video stream exists in the container.
    #[error("no playable video stream found")]
    NoVideoStream,
}

/// Failures while running the remux tool.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The remux tool exited with a non-zero status (`None` when killed by a signal).
    #[error("remux tool exited with {}: {diagnostics}", display_code(.code))]
    ToolExitNonZero {
        code: Option<i32>,
        /// Tail of the tool's diagnostic output.
        diagnostics: String,
    },

    /// The run was cancelled by the task owner.
    #[error("remux cancelled")]
    Cancelled,

    /// The run exceeded its time bound and was killed.
    #[error("remux timed out after {0:?}")]
    TimedOut(Duration),

    /// The remux tool could not be spawned.
    #[error("failed to spawn remux tool: {0}")]
    Spawn(String),
}

impl ExecutionError {
    /// The failure line delivered to the user for this run.
    pub fn user_message(&self) -> String {
        match self {
            ExecutionError::Cancelled => STOPPED_BY_USER.to_string(),
            other => format!("Processing failed: {other}"),
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "a signal".to_string(),
    }
}

/// Terminal failures of an interactive selection session.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// No user activity within the selection window.
    #[error("no selection made within {0:?}")]
    Timeout(Duration),

    /// The user pressed cancel.
    #[error("selection cancelled by user")]
    CancelledByUser,

    /// A session is already awaiting input for this task.
    #[error("a selection session is already active for task {0}")]
    AlreadyActive(String),

    /// The input source went away before the session resolved.
    #[error("input listener closed before a selection was confirmed")]
    ListenerClosed,
}

/// Unified error type covering all failure modes in trackkeep.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// An external tool (ffmpeg, ffprobe) is missing or returned an error.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// Input or configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Whether this failure came from a user or owner stopping the task.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            Error::Execution(ExecutionError::Cancelled)
                | Error::Controller(ControllerError::CancelledByUser)
                | Error::Controller(ControllerError::Timeout(_))
                | Error::Controller(ControllerError::ListenerClosed)
        )
    }

    /// The single line shown to the user for a failed task.
    pub fn user_message(&self) -> String {
        match self {
            Error::Controller(ControllerError::Timeout(window)) => format!(
                "{STOPPED_BY_USER}: no selection within {}s",
                window.as_secs()
            ),
            e if e.is_cancellation() => STOPPED_BY_USER.to_string(),
            Error::Probe(e) => format!("Could not read media info: {e}"),
            Error::Selection(e) => format!("Nothing to process: {e}"),
            Error::Execution(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
