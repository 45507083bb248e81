//! # tk-av
//!
//! External tool plumbing for the trackkeep pipeline.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache paths to ffmpeg
//!   and ffprobe.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running external processes.
//! - **Probing** ([`FfprobeProber`]) -- implements [`tk_probe::Prober`] by
//!   shelling out to ffprobe.
//! - **Remux plans** ([`PlanBuilder`], [`TranscodePlan`]) -- turn a selection
//!   decision into a stream-copy ffmpeg invocation.
//! - **Execution** ([`TranscodeExecutor`]) -- run a plan as a cancellable,
//!   time-bounded child process with live progress.

pub mod command;
pub mod executor;
pub mod plan;
pub mod probe;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use executor::{ExecutionContext, TranscodeExecutor};
pub use plan::{output_path_for, PlanBuilder, StreamMapping, TranscodePlan};
pub use probe::FfprobeProber;
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
