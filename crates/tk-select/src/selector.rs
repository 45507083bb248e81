//! Automatic stream classification.

use std::collections::BTreeSet;

use tk_core::{CodecType, LanguageCode};
use tk_probe::MediaInfo;

use crate::decision::SelectionDecision;
use crate::language::resolve_stream;

/// Applies the priority-language rule to a probed container.
///
/// - Playable video, subtitles, and data streams are always kept.
/// - Cover art goes to `art`.
/// - Audio: the first preferred language matched by any audio stream is the
///   selected language; its streams are kept and every other audio stream is
///   removed. When no preference matches, all audio is kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamSelector;

impl StreamSelector {
    pub fn select(media: &MediaInfo, preferred: &[LanguageCode]) -> SelectionDecision {
        let mut kept = BTreeSet::new();
        let mut removed = BTreeSet::new();
        let mut art = BTreeSet::new();
        let mut audio: Vec<(u32, LanguageCode)> = Vec::new();

        for stream in &media.streams {
            match stream.codec_type {
                CodecType::Video if stream.is_attached_picture => {
                    art.insert(stream.index);
                }
                CodecType::Audio => audio.push((stream.index, resolve_stream(stream))),
                CodecType::Video | CodecType::Subtitle | CodecType::Data => {
                    kept.insert(stream.index);
                }
            }
        }

        let selected = preferred
            .iter()
            .find(|lang| audio.iter().any(|(_, l)| l == *lang));

        match selected {
            Some(lang) => {
                tracing::debug!(language = %lang, "selected audio language");
                for (index, l) in audio {
                    if &l == lang {
                        kept.insert(index);
                    } else {
                        removed.insert(index);
                    }
                }
            }
            None => {
                tracing::debug!(
                    audio_streams = audio.len(),
                    "no preferred language present; keeping all audio"
                );
                kept.extend(audio.into_iter().map(|(index, _)| index));
            }
        }

        SelectionDecision::from_disjoint(kept, removed, art)
    }
}
