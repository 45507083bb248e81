//! Shared harness for integration tests.
//!
//! [`FakeTools`] writes stand-in `ffprobe` and `ffmpeg` shell scripts into a
//! temp directory, plus a JSON config pointing at them, so the whole pipeline
//! runs without real media tools.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Probe output of a typical multi-language release.
///
/// Stream 3 carries no language tag; its title names the language.
pub const MOVIE_JSON: &str = r#"{
  "streams": [
    {"index": 0, "codec_type": "video", "codec_name": "h264", "profile": "High",
     "level": 41, "width": 1920, "height": 1080, "r_frame_rate": "24000/1001",
     "disposition": {"default": 1}},
    {"index": 1, "codec_type": "audio", "codec_name": "aac", "channel_layout": "stereo",
     "bit_rate": "128000", "tags": {"language": "hin"}},
    {"index": 2, "codec_type": "audio", "codec_name": "eac3", "channel_layout": "5.1(side)",
     "bit_rate": "640000", "tags": {"language": "en", "title": "English DD+"}},
    {"index": 3, "codec_type": "audio", "codec_name": "aac", "channel_layout": "stereo",
     "tags": {"title": "Telugu [Original]"}},
    {"index": 4, "codec_type": "subtitle", "codec_name": "subrip",
     "disposition": {"default": 1}, "tags": {"language": "eng"}},
    {"index": 5, "codec_type": "video", "codec_name": "mjpeg", "width": 600, "height": 600,
     "disposition": {"attached_pic": 1}, "tags": {"title": "cover"}}
  ],
  "format": {"duration": "10.000000", "size": "1000"}
}"#;

/// Remux stand-in: emits two progress blocks and writes its last argument.
pub const FFMPEG_OK: &str = r#"if [ "$1" = "-version" ]; then echo "ffmpeg version 7.0-fake"; exit 0; fi
for last; do :; done
echo "out_time_us=5000000"
echo "progress=continue"
echo "out_time_us=10000000"
echo "progress=end"
printf 'remuxed' > "$last"
"#;

/// Remux stand-in that writes partial output and then fails.
pub const FFMPEG_FAIL: &str = r#"if [ "$1" = "-version" ]; then echo "ffmpeg version 7.0-fake"; exit 0; fi
for last; do :; done
printf 'partial' > "$last"
echo "Invalid data found when processing input" >&2
exit 1
"#;

pub struct FakeTools {
    pub dir: TempDir,
    pub ffprobe: PathBuf,
    pub ffmpeg: PathBuf,
    pub config: PathBuf,
}

impl FakeTools {
    /// Tools that succeed, probing as [`MOVIE_JSON`].
    pub fn new() -> Self {
        Self::with(MOVIE_JSON, FFMPEG_OK)
    }

    pub fn with(probe_json: &str, ffmpeg_body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("probe.json");
        std::fs::write(&json_path, probe_json).unwrap();

        let ffprobe = write_script(
            dir.path(),
            "ffprobe",
            &format!(
                "if [ \"$1\" = \"-version\" ]; then echo \"ffprobe version 7.0-fake\"; exit 0; fi\ncat '{}'\n",
                json_path.display()
            ),
        );
        let ffmpeg = write_script(dir.path(), "ffmpeg", ffmpeg_body);

        let config = dir.path().join("trackkeep.json");
        std::fs::write(
            &config,
            serde_json::json!({
                "tools": {
                    "ffmpeg_path": ffmpeg,
                    "ffprobe_path": ffprobe,
                }
            })
            .to_string(),
        )
        .unwrap();

        Self {
            dir,
            ffprobe,
            ffmpeg,
            config,
        }
    }

    /// A source file inside the temp directory.
    pub fn source(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, vec![0u8; 1000]).unwrap();
        path
    }
}

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
