//! The [`Prober`] trait defining the interface for media inspection.

use async_trait::async_trait;
use tk_core::ProbeError;

use crate::types::{FormatInfo, MediaInfo};

/// A media prober capable of extracting stream metadata from a local path
/// or a URL.
///
/// Implementations must be safe to share across tasks (`Send + Sync`).
#[async_trait]
pub trait Prober: Send + Sync {
    /// Human-readable name identifying this prober implementation.
    fn name(&self) -> &'static str;

    /// Full format and stream listing of `target`.
    async fn probe(&self, target: &str) -> Result<MediaInfo, ProbeError>;

    /// Container duration and size only; cheaper for remote sources.
    ///
    /// The default runs a full probe and discards the streams.
    async fn probe_format(&self, target: &str) -> Result<FormatInfo, ProbeError> {
        Ok(self.probe(target).await?.format)
    }
}
