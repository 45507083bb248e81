//! tk-core: shared types, ids, errors, configuration, and progress state.
//!
//! This crate is the foundational dependency for all other tk-* crates,
//! providing the failure taxonomy, typed task identifiers, media-domain
//! enums, application configuration, the live [`ProgressState`] of a remux
//! run, and the collaborator traits through which results leave the core.

pub mod config;
pub mod error;
pub mod ids;
pub mod media;
pub mod progress;
pub mod report;

// Re-export the most commonly used items at the crate root.
pub use error::{ControllerError, Error, ExecutionError, ProbeError, Result, SelectionError};
pub use ids::*;
pub use media::*;
pub use progress::{ProgressSnapshot, ProgressState};
pub use report::{FailureNotifier, StatusRegistry};
