//! FFprobe-based [`tk_probe::Prober`] implementation.
//!
//! Shells out to `ffprobe -hide_banner -loglevel error -print_format json
//! -show_format -show_streams` and maps the JSON output through
//! [`tk_probe::parse_ffprobe_json`].

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tk_core::ProbeError;
use tk_probe::{FormatInfo, MediaInfo, Prober};

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Probes should finish in seconds even for remote sources.
const PROBE_TIMEOUT: Duration = Duration::from_secs(120);

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    /// Path to the ffprobe binary.
    ffprobe_path: PathBuf,
    timeout: Duration,
}

impl FfprobeProber {
    /// Create a new prober using the given ffprobe path.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self {
            ffprobe_path,
            timeout: PROBE_TIMEOUT,
        }
    }

    /// Create a prober from the registry's ffprobe.
    pub fn from_registry(tools: &ToolRegistry) -> tk_core::Result<Self> {
        Ok(Self::new(tools.require("ffprobe")?.path.clone()))
    }

    /// Builder: override the per-probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self, sections: &[&str], target: &str) -> Result<String, ProbeError> {
        let mut cmd = ToolCommand::new(self.ffprobe_path.clone());
        cmd.timeout(self.timeout);
        cmd.args(["-hide_banner", "-loglevel", "error", "-print_format", "json"]);
        cmd.args(sections.iter().copied());
        cmd.arg(target);

        tracing::debug!(target_path = target, "running ffprobe");
        let output = cmd
            .execute()
            .await
            .map_err(|e| ProbeError::ToolFailed(e.to_string()))?;
        Ok(output.stdout)
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, target: &str) -> Result<MediaInfo, ProbeError> {
        let stdout = self.run(&["-show_format", "-show_streams"], target).await?;
        let info = tk_probe::parse_ffprobe_json(&stdout)?;
        tracing::debug!(
            target_path = target,
            streams = info.streams.len(),
            duration = ?info.format.duration_secs,
            "probe complete"
        );
        Ok(info)
    }

    async fn probe_format(&self, target: &str) -> Result<FormatInfo, ProbeError> {
        let stdout = self.run(&["-show_format"], target).await?;
        tk_probe::parse_ffprobe_format_json(&stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tk_core::CodecType;

    fn fake_ffprobe(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("ffprobe");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn probe_parses_tool_output() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_ffprobe(
            dir.path(),
            r#"cat <<'JSON'
{"streams": [
  {"index": 0, "codec_type": "video", "codec_name": "h264"},
  {"index": 1, "codec_type": "audio", "codec_name": "aac", "tags": {"language": "tel"}}
], "format": {"duration": "10.0", "size": "1000"}}
JSON"#,
        );

        let info = FfprobeProber::new(tool).probe("movie.mkv").await.unwrap();
        assert_eq!(info.streams.len(), 2);
        assert_eq!(info.streams[1].codec_type, CodecType::Audio);
        assert_eq!(info.streams[1].language, "tel");
        assert_eq!(info.format.size_bytes, Some(1000));
    }

    #[tokio::test]
    async fn non_zero_exit_is_tool_failed() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_ffprobe(dir.path(), "echo 'movie.mkv: No such file' >&2\nexit 1");

        let err = FfprobeProber::new(tool).probe("movie.mkv").await.unwrap_err();
        match err {
            ProbeError::ToolFailed(msg) => assert!(msg.contains("No such file"), "{msg}"),
            other => panic!("expected ToolFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_output_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let tool = fake_ffprobe(dir.path(), "echo 'this is not json'");

        let err = FfprobeProber::new(tool).probe("movie.mkv").await.unwrap_err();
        assert!(matches!(err, ProbeError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn probe_format_requests_format_only() {
        let dir = tempfile::tempdir().unwrap();
        // Fails unless invoked without -show_streams.
        let tool = fake_ffprobe(
            dir.path(),
            r#"for a in "$@"; do [ "$a" = "-show_streams" ] && exit 9; done
echo '{"format": {"duration": "61.5", "size": "2048"}}'"#,
        );

        let fmt = FfprobeProber::new(tool)
            .probe_format("https://example.com/a.mkv")
            .await
            .unwrap();
        assert_eq!(fmt.duration_secs, Some(61.5));
        assert_eq!(fmt.size_bytes, Some(2048));
    }

    #[tokio::test]
    async fn missing_binary_is_tool_failed() {
        let err = FfprobeProber::new(PathBuf::from("/nonexistent/ffprobe"))
            .probe("movie.mkv")
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::ToolFailed(_)));
    }
}
