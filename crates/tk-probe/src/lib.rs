//! # tk-probe
//!
//! Typed model of a probed media container.
//!
//! The model is deliberately close to what `ffprobe -show_format
//! -show_streams` reports: one [`StreamDescriptor`] per container stream,
//! in container order, keyed by the stream's own index. Parsing the probe
//! tool's JSON lives here ([`parse_ffprobe_json`]); spawning the tool lives
//! in `tk-av`.
//!
//! ## Quick start
//!
//! ```
//! use tk_probe::parse_ffprobe_json;
//!
//! let json = r#"{"format": {"duration": "12.5"}, "streams": [
//!     {"index": 0, "codec_type": "video", "codec_name": "h264"}
//! ]}"#;
//! let info = parse_ffprobe_json(json).unwrap();
//! assert_eq!(info.streams.len(), 1);
//! assert_eq!(info.effective_duration(), 12.5);
//! ```

pub mod ffprobe_json;
pub mod prober;
pub mod types;

pub use ffprobe_json::{parse_ffprobe_format_json, parse_ffprobe_json};
pub use prober::Prober;
pub use types::{meta, Disposition, FormatInfo, MediaInfo, StreamDescriptor};
