//! Language tag canonicalisation.
//!
//! Containers in the wild carry ISO 639-1 codes, ISO 639-2 codes of either
//! flavour, region-suffixed tags (`en-US`), or nothing at all with the
//! language spelled out in the track title. [`resolve`] maps all of these to
//! one canonical ISO 639-2/B code so that preference matching is a plain
//! equality test.

use tk_core::config::{default_preferred_languages, SelectionConfig};
use tk_core::LanguageCode;
use tk_probe::StreamDescriptor;

/// ISO 639-1 to ISO 639-2/B.
const TWO_LETTER: [(&str, &str); 20] = [
    ("en", "eng"),
    ("hi", "hin"),
    ("te", "tel"),
    ("ta", "tam"),
    ("ml", "mal"),
    ("kn", "kan"),
    ("bn", "ben"),
    ("mr", "mar"),
    ("gu", "guj"),
    ("pa", "pan"),
    ("ur", "urd"),
    ("ja", "jpn"),
    ("ko", "kor"),
    ("zh", "chi"),
    ("es", "spa"),
    ("fr", "fre"),
    ("de", "ger"),
    ("ru", "rus"),
    ("ar", "ara"),
    ("it", "ita"),
];

/// ISO 639-2/T codes whose /B form differs, for the languages above.
const TERMINOLOGIC: [(&str, &str); 3] = [("zho", "chi"), ("fra", "fre"), ("deu", "ger")];

/// ISO 639-2 codes that name no particular language: multiple, none,
/// uncoded, and the `qaa`..`qtz` local-use range.
const NON_LANGUAGE: [&str; 4] = ["mul", "zxx", "mis", "und"];

fn is_non_language(code: &str) -> bool {
    NON_LANGUAGE.contains(&code) || ("qaa"..="qtz").contains(&code)
}

/// Language names searched for in title/comment text. Checked in this order;
/// the first entry found anywhere in the text wins.
const NAMED: &[(&str, &str)] = &[
    ("తెలుగు", "tel"),
    ("हिन्दी", "hin"),
    ("हिंदी", "hin"),
    ("தமிழ்", "tam"),
    ("മലയാളം", "mal"),
    ("ಕನ್ನಡ", "kan"),
    ("اردو", "urd"),
    ("বাংলা", "ben"),
    ("telugu", "tel"),
    ("hindi", "hin"),
    ("tamil", "tam"),
    ("malayalam", "mal"),
    ("kannada", "kan"),
    ("urdu", "urd"),
    ("bengali", "ben"),
];

/// Canonical language of a stream given its raw tag and free text.
///
/// `auxiliary_text` is only consulted when the tag alone is undetermined. It
/// is case-folded here, so callers may pass it as found.
pub fn resolve(raw_tag: &str, auxiliary_text: &str) -> LanguageCode {
    if let Some(code) = from_tag(raw_tag) {
        return LanguageCode::new(code);
    }

    let text = auxiliary_text.to_lowercase();
    NAMED
        .iter()
        .find(|(name, _)| text.contains(name))
        .map(|(_, code)| LanguageCode::new(*code))
        .unwrap_or_default()
}

/// [`resolve`] applied to a probed stream's tag, title, and comment.
pub fn resolve_stream(stream: &StreamDescriptor) -> LanguageCode {
    resolve(stream.language.as_str(), &stream.auxiliary_text())
}

/// Parse an ordered, comma-separated preference list.
///
/// Entries are canonicalised like stream tags; entries that resolve to `und`
/// are dropped, and later duplicates are ignored.
pub fn parse_language_list(raw: &str) -> Vec<LanguageCode> {
    canonical_preferences(raw.split(','))
}

/// Canonicalise already split preference entries.
pub fn canonical_preferences<I, S>(entries: I) -> Vec<LanguageCode>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<LanguageCode> = Vec::new();
    for entry in entries {
        let Some(code) = from_tag(entry.as_ref()) else {
            continue;
        };
        let code = LanguageCode::new(code);
        if !out.contains(&code) {
            out.push(code);
        }
    }
    out
}

/// Preference order from configuration, canonicalised.
///
/// An empty list, or one with no recognised entry, falls back to the default
/// order rather than leaving every audio stream kept.
pub fn configured_preferences(selection: &SelectionConfig) -> Vec<LanguageCode> {
    let preferred = canonical_preferences(&selection.preferred_languages);
    if !preferred.is_empty() {
        return preferred;
    }
    tracing::warn!(
        configured = ?selection.preferred_languages,
        "no recognised preferred language; using the default order"
    );
    canonical_preferences(default_preferred_languages())
}

fn from_tag(raw_tag: &str) -> Option<String> {
    let tag = raw_tag.trim().to_lowercase();
    let primary = tag.split(['-', '_']).next().unwrap_or_default();

    match primary.len() {
        2 => TWO_LETTER
            .iter()
            .find(|(two, _)| *two == primary)
            .map(|(_, three)| three.to_string()),
        3 if primary.chars().all(|c| c.is_ascii_alphabetic()) && !is_non_language(primary) => {
            let canonical = TERMINOLOGIC
                .iter()
                .find(|(t, _)| *t == primary)
                .map_or(primary, |(_, b)| *b);
            Some(canonical.to_string())
        }
        _ => None,
    }
}
