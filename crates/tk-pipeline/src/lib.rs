//! # tk-pipeline
//!
//! Orchestration of one file through the trackkeep stages.
//!
//! This crate provides:
//!
//! - **[`Pipeline`]** -- probe, select (automatic, manual, or extract),
//!   plan, and remux a single source, reporting each failure exactly once.
//! - **[`TaskStatusRegistry`]** -- the shared task id to live progress map
//!   that status presenters read from.
//! - **[`report`]** -- the human-readable completion summary.

pub mod pipeline;
pub mod registry;
pub mod report;

pub use pipeline::{Pipeline, ProcessOutcome, Task};
pub use registry::TaskStatusRegistry;
