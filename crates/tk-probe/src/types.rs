//! Core types for media probe results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tk_core::{CodecType, LanguageCode};

/// Keys of [`StreamDescriptor::metadata`] filled by the ffprobe parser.
pub mod meta {
    pub const TITLE: &str = "title";
    pub const COMMENT: &str = "comment";
    pub const PROFILE: &str = "profile";
    pub const LEVEL: &str = "level";
    pub const FRAME_RATE: &str = "r_frame_rate";
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const CHANNEL_LAYOUT: &str = "channel_layout";
    pub const BIT_RATE: &str = "bit_rate";
}

/// Complete probe result for one container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    pub format: FormatInfo,
    /// Streams in container order.
    pub streams: Vec<StreamDescriptor>,
}

/// Container-level properties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatInfo {
    /// Duration in seconds, if the container reports one.
    pub duration_secs: Option<f64>,
    /// Container size in bytes, if reported.
    pub size_bytes: Option<u64>,
}

impl FormatInfo {
    /// Duration usable as a divisor: absent, non-finite, or non-positive
    /// values become 1.0.
    pub fn effective_duration(&self) -> f64 {
        match self.duration_secs {
            Some(d) if d.is_finite() && d > 0.0 => d,
            _ => 1.0,
        }
    }
}

/// Role flags of a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disposition {
    pub default: bool,
    pub forced: bool,
    pub attached_pic: bool,
}

/// One elementary stream of a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Container stream index. Unique within a [`MediaInfo`] and never renumbered.
    pub index: u32,
    pub codec_type: CodecType,
    pub codec_name: String,
    /// Language tag exactly as stored in the container, or `und`.
    ///
    /// Canonicalisation (two-letter codes, native-script titles) happens in
    /// the selection layer, which also has the title/comment text at hand.
    pub language: LanguageCode,
    /// A video-typed stream that is embedded cover art.
    pub is_attached_picture: bool,
    pub disposition: Disposition,
    /// Display-only tags; see [`meta`] for the keys.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl StreamDescriptor {
    /// Minimal descriptor with no tags, useful for building fixtures.
    pub fn new(index: u32, codec_type: CodecType, codec_name: impl Into<String>) -> Self {
        Self {
            index,
            codec_type,
            codec_name: codec_name.into(),
            language: LanguageCode::undetermined(),
            is_attached_picture: false,
            disposition: Disposition::default(),
            metadata: BTreeMap::new(),
        }
    }

    /// Builder-style setter for the raw language tag.
    pub fn with_language(mut self, tag: impl Into<String>) -> Self {
        self.language = LanguageCode::new(tag);
        self
    }

    /// Builder-style setter for a metadata entry.
    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Mark as embedded cover art.
    pub fn as_attached_picture(mut self) -> Self {
        self.is_attached_picture = true;
        self.disposition.attached_pic = true;
        self
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.meta(meta::TITLE)
    }

    /// Title and comment joined by a space, lower-cased; the text searched
    /// for native-script language names.
    pub fn auxiliary_text(&self) -> String {
        let title = self.meta(meta::TITLE).unwrap_or_default();
        let comment = self.meta(meta::COMMENT).unwrap_or_default();
        format!("{title} {comment}").to_lowercase()
    }

    /// Playable video, i.e. video that is not cover art.
    pub fn is_main_video(&self) -> bool {
        self.codec_type == CodecType::Video && !self.is_attached_picture
    }
}

impl MediaInfo {
    /// See [`FormatInfo::effective_duration`].
    pub fn effective_duration(&self) -> f64 {
        self.format.effective_duration()
    }

    /// All stream indices in container order.
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.streams.iter().map(|s| s.index)
    }

    pub fn stream(&self, index: u32) -> Option<&StreamDescriptor> {
        self.streams.iter().find(|s| s.index == index)
    }

    /// Streams of one kind, attached pictures included for video.
    pub fn streams_of(&self, kind: CodecType) -> impl Iterator<Item = &StreamDescriptor> + '_ {
        self.streams.iter().filter(move |s| s.codec_type == kind)
    }

    /// First playable video stream.
    pub fn main_video(&self) -> Option<&StreamDescriptor> {
        self.streams.iter().find(|s| s.is_main_video())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_duration_defaults() {
        let mut fmt = FormatInfo::default();
        assert_eq!(fmt.effective_duration(), 1.0);
        fmt.duration_secs = Some(0.0);
        assert_eq!(fmt.effective_duration(), 1.0);
        fmt.duration_secs = Some(-3.0);
        assert_eq!(fmt.effective_duration(), 1.0);
        fmt.duration_secs = Some(42.5);
        assert_eq!(fmt.effective_duration(), 42.5);
    }

    #[test]
    fn auxiliary_text_joins_title_and_comment() {
        let s = StreamDescriptor::new(1, CodecType::Audio, "aac")
            .with_meta(meta::TITLE, "Telugu DD5.1")
            .with_meta(meta::COMMENT, "Original");
        assert_eq!(s.auxiliary_text(), "telugu dd5.1 original");

        let bare = StreamDescriptor::new(2, CodecType::Audio, "aac");
        assert_eq!(bare.auxiliary_text(), " ");
    }

    #[test]
    fn main_video_skips_cover_art() {
        let info = MediaInfo {
            format: FormatInfo::default(),
            streams: vec![
                StreamDescriptor::new(0, CodecType::Video, "mjpeg").as_attached_picture(),
                StreamDescriptor::new(1, CodecType::Video, "h264"),
                StreamDescriptor::new(2, CodecType::Audio, "aac"),
            ],
        };
        assert_eq!(info.main_video().map(|s| s.index), Some(1));
        assert_eq!(info.streams_of(CodecType::Video).count(), 2);
        assert_eq!(info.indices().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(info.stream(3).is_none());
    }

    #[test]
    fn default_language_is_und() {
        let s = StreamDescriptor::new(0, CodecType::Audio, "aac");
        assert!(s.language.is_undetermined());
        let s = s.with_language("hin");
        assert_eq!(s.language, "hin");
    }
}
