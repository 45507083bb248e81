//! Media-domain types: stream kinds, the remux target container, and
//! canonical language tags.
//!
//! All enums serialize in lowercase (via `serde(rename_all = "lowercase")`) and
//! implement `Display` manually for consistent string representation.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// CodecType
// ---------------------------------------------------------------------------

/// Kind of elementary stream inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecType {
    Video,
    Audio,
    Subtitle,
    /// Anything else (data, attachment, unknown).
    Data,
}

impl CodecType {
    /// Map ffprobe's `codec_type` string. Unknown kinds become [`CodecType::Data`].
    pub fn from_probe(codec_type: &str) -> Self {
        match codec_type {
            "video" => Self::Video,
            "audio" => Self::Audio,
            "subtitle" => Self::Subtitle,
            _ => Self::Data,
        }
    }
}

impl fmt::Display for CodecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Subtitle => write!(f, "subtitle"),
            Self::Data => write!(f, "data"),
        }
    }
}

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// Output container of a remux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    #[default]
    Matroska,
}

impl Container {
    /// Name passed to the muxer's `-f` flag.
    pub fn muxer(&self) -> &'static str {
        match self {
            Self::Matroska => "matroska",
        }
    }

    /// File extension for outputs in this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Matroska => "mkv",
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.muxer())
    }
}

// ---------------------------------------------------------------------------
// LanguageCode
// ---------------------------------------------------------------------------

/// Canonical three-letter language tag, or `und` when undetermined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    /// The undetermined language.
    pub const UNDETERMINED: &'static str = "und";

    /// Wrap an already canonical tag. Callers normalising raw input should go
    /// through the language resolver instead.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The `und` tag.
    pub fn undetermined() -> Self {
        Self(Self::UNDETERMINED.to_string())
    }

    pub fn is_undetermined(&self) -> bool {
        self.0 == Self::UNDETERMINED
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LanguageCode {
    fn default() -> Self {
        Self::undetermined()
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for LanguageCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_type_from_probe() {
        assert_eq!(CodecType::from_probe("video"), CodecType::Video);
        assert_eq!(CodecType::from_probe("audio"), CodecType::Audio);
        assert_eq!(CodecType::from_probe("subtitle"), CodecType::Subtitle);
        assert_eq!(CodecType::from_probe("attachment"), CodecType::Data);
        assert_eq!(CodecType::from_probe(""), CodecType::Data);
    }

    #[test]
    fn codec_type_serde() {
        let json = serde_json::to_string(&CodecType::Subtitle).unwrap();
        assert_eq!(json, r#""subtitle""#);
        let back: CodecType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, CodecType::Subtitle);
    }

    #[test]
    fn container_names() {
        assert_eq!(Container::default(), Container::Matroska);
        assert_eq!(Container::Matroska.to_string(), "matroska");
        assert_eq!(Container::Matroska.extension(), "mkv");
    }

    #[test]
    fn language_code_defaults_to_und() {
        let lang = LanguageCode::default();
        assert!(lang.is_undetermined());
        assert_eq!(lang, "und");
        assert!(!LanguageCode::new("tel").is_undetermined());
    }
}
