//! Remux plans: a selection decision turned into an ffmpeg stream-copy
//! invocation.
//!
//! A plan maps exactly the kept streams, in ascending index order, and
//! always carries the same timestamp policy: negative timestamps shifted to
//! zero, presentation timestamps regenerated, and no interleave delay. None
//! of that is configurable.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tk_core::{Container, Error, Result};
use tk_probe::MediaInfo;
use tk_select::SelectionDecision;

/// One `-map` entry of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreamMapping {
    pub source_index: u32,
    /// Always `true`: the plan never re-encodes.
    pub copy_codec: bool,
}

/// A complete remux operation. Only [`PlanBuilder`] constructs one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscodePlan {
    source: PathBuf,
    output: PathBuf,
    container: Container,
    mappings: Vec<StreamMapping>,
    duration_secs: f64,
    source_size: Option<u64>,
}

impl TranscodePlan {
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn container(&self) -> Container {
        self.container
    }

    pub fn mappings(&self) -> &[StreamMapping] {
        &self.mappings
    }

    /// Source duration used to turn progress timestamps into a fraction.
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Container size reported by the probe, used when the source cannot be
    /// stat'ed (e.g. a URL).
    pub fn source_size(&self) -> Option<u64> {
        self.source_size
    }

    /// ffmpeg arguments for this plan, program name excluded.
    ///
    /// Machine-readable progress goes to stdout; stderr only carries errors.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "-hide_banner",
            "-nostdin",
            "-loglevel",
            "error",
            "-y",
            "-fflags",
            "+genpts",
            "-i",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(self.source.to_string_lossy().into_owned());

        for mapping in &self.mappings {
            args.push("-map".into());
            args.push(format!("0:{}", mapping.source_index));
        }
        if self.mappings.iter().all(|m| m.copy_codec) {
            args.extend(["-c".to_string(), "copy".to_string()]);
        }

        args.extend(
            [
                "-avoid_negative_ts",
                "make_zero",
                "-max_interleave_delta",
                "0",
                "-f",
                self.container.muxer(),
                "-progress",
                "pipe:1",
                "-nostats",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.push(self.output.to_string_lossy().into_owned());
        args
    }
}

/// Builds [`TranscodePlan`]s for one probed container.
#[derive(Debug, Clone, Copy)]
pub struct PlanBuilder<'a> {
    media: &'a MediaInfo,
    container: Container,
}

impl<'a> PlanBuilder<'a> {
    pub fn new(media: &'a MediaInfo) -> Self {
        Self {
            media,
            container: Container::default(),
        }
    }

    /// Plan a stream copy of the kept streams of `decision`.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when nothing is kept, when a kept index is not a
    /// stream of the probed container, or when `output` equals `source`.
    pub fn build(
        &self,
        decision: &SelectionDecision,
        source: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Result<TranscodePlan> {
        let source = source.into();
        let output = output.into();

        if decision.kept().is_empty() {
            return Err(Error::Validation("no streams selected to keep".into()));
        }
        if let Some(unknown) = decision
            .kept()
            .iter()
            .find(|i| self.media.stream(**i).is_none())
        {
            return Err(Error::Validation(format!(
                "stream {unknown} is not present in the source"
            )));
        }
        if source == output {
            return Err(Error::Validation(format!(
                "output would overwrite source {}",
                source.display()
            )));
        }

        // BTreeSet iteration is ascending, i.e. container order.
        let mappings = decision
            .kept()
            .iter()
            .map(|&source_index| StreamMapping {
                source_index,
                copy_codec: true,
            })
            .collect();

        Ok(TranscodePlan {
            source,
            output,
            container: self.container,
            mappings,
            duration_secs: self.media.effective_duration(),
            source_size: self.media.format.size_bytes,
        })
    }
}

/// `<dir>/<stem>.<suffix>.<ext>` next to `source`; an empty suffix is omitted.
pub fn output_path_for(source: &Path, suffix: &str, container: Container) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let suffix = suffix.trim();
    let name = if suffix.is_empty() {
        format!("{stem}.{}", container.extension())
    } else {
        format!("{stem}.{suffix}.{}", container.extension())
    };
    source.with_file_name(name)
}
