//! Mapping of `ffprobe -print_format json -show_format -show_streams` output
//! into [`MediaInfo`].
//!
//! Only a missing or unparseable document is fatal. Missing per-stream
//! fields degrade to defaults: an absent language becomes `und`, an absent
//! duration stays `None` and is read through
//! [`FormatInfo::effective_duration`].

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use tk_core::{CodecType, LanguageCode, ProbeError};

use crate::types::{meta, Disposition, FormatInfo, MediaInfo, StreamDescriptor};

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormatOnly {
    format: FfprobeFormat,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    profile: Option<String>,
    level: Option<i64>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    channel_layout: Option<String>,
    bit_rate: Option<String>,
    #[serde(default)]
    disposition: FfprobeDisposition,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeDisposition {
    #[serde(default)]
    default: u8,
    #[serde(default)]
    forced: u8,
    #[serde(default)]
    attached_pic: u8,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse the full format+streams document.
///
/// # Errors
///
/// [`ProbeError::MalformedOutput`] when the text is not JSON, lacks the
/// `streams` array, has a stream without an `index`, or repeats an index.
pub fn parse_ffprobe_json(json: &str) -> Result<MediaInfo, ProbeError> {
    if json.trim().is_empty() {
        return Err(ProbeError::MalformedOutput("empty probe output".into()));
    }

    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| ProbeError::MalformedOutput(format!("ffprobe JSON parse error: {e}")))?;

    let mut seen = HashSet::with_capacity(output.streams.len());
    let mut streams = Vec::with_capacity(output.streams.len());
    for stream in output.streams {
        if !seen.insert(stream.index) {
            return Err(ProbeError::MalformedOutput(format!(
                "duplicate stream index {}",
                stream.index
            )));
        }
        streams.push(map_stream(stream));
    }

    Ok(MediaInfo {
        format: map_format(output.format),
        streams,
    })
}

/// Parse a `-show_format`-only document.
pub fn parse_ffprobe_format_json(json: &str) -> Result<FormatInfo, ProbeError> {
    let output: FfprobeFormatOnly = serde_json::from_str(json)
        .map_err(|e| ProbeError::MalformedOutput(format!("ffprobe JSON parse error: {e}")))?;
    Ok(map_format(output.format))
}

fn map_format(format: FfprobeFormat) -> FormatInfo {
    FormatInfo {
        duration_secs: format.duration.and_then(|s| s.trim().parse::<f64>().ok()),
        size_bytes: format.size.and_then(|s| s.trim().parse::<u64>().ok()),
    }
}

fn map_stream(stream: FfprobeStream) -> StreamDescriptor {
    let codec_type = CodecType::from_probe(stream.codec_type.as_deref().unwrap_or(""));
    let disposition = Disposition {
        default: stream.disposition.default == 1,
        forced: stream.disposition.forced == 1,
        attached_pic: stream.disposition.attached_pic == 1,
    };

    // Matroska tags arrive as `language`, MP4 muxers sometimes upper-case them.
    let tags: BTreeMap<String, String> = stream
        .tags
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .collect();

    let language = tags
        .get("language")
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(LanguageCode::new)
        .unwrap_or_default();

    let mut metadata = BTreeMap::new();
    for key in [meta::TITLE, meta::COMMENT] {
        if let Some(v) = tags.get(key) {
            metadata.insert(key.to_string(), v.clone());
        }
    }
    let display = [
        (meta::PROFILE, stream.profile),
        (meta::LEVEL, stream.level.map(|l| l.to_string())),
        (meta::WIDTH, stream.width.map(|w| w.to_string())),
        (meta::HEIGHT, stream.height.map(|h| h.to_string())),
        (meta::FRAME_RATE, stream.r_frame_rate),
        (meta::CHANNEL_LAYOUT, stream.channel_layout),
        (meta::BIT_RATE, stream.bit_rate),
    ];
    for (key, value) in display {
        if let Some(v) = value {
            metadata.insert(key.to_string(), v);
        }
    }

    StreamDescriptor {
        index: stream.index,
        codec_type,
        codec_name: stream.codec_name.unwrap_or_default(),
        language,
        is_attached_picture: codec_type == CodecType::Video && disposition.attached_pic,
        disposition,
        metadata,
    }
}
