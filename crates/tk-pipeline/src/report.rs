//! Human-readable completion summary.

use std::time::Duration;

use tk_core::CodecType;
use tk_probe::{meta, MediaInfo, StreamDescriptor};
use tk_select::{resolve_stream, SelectionDecision};

/// Kept, removed, and art streams of a finished task plus the final counts.
///
/// Removed video and data streams are not listed; the art section only
/// appears when the source had cover art.
pub fn summarize(media: &MediaInfo, decision: &SelectionDecision) -> String {
    let mut lines = Vec::new();

    let kept: Vec<&StreamDescriptor> = media
        .streams
        .iter()
        .filter(|s| decision.is_kept(s.index))
        .collect();
    if !kept.is_empty() {
        lines.push("Streams Kept:".to_string());
        for kind in [CodecType::Video, CodecType::Audio, CodecType::Subtitle] {
            for stream in kept.iter().filter(|s| s.codec_type == kind) {
                lines.push(format!("  {}", format_stream(stream)));
            }
        }
    }

    let removed: Vec<&StreamDescriptor> = media
        .streams
        .iter()
        .filter(|s| decision.removed().contains(&s.index))
        .filter(|s| matches!(s.codec_type, CodecType::Audio | CodecType::Subtitle))
        .collect();
    if !removed.is_empty() {
        lines.push("Streams Removed:".to_string());
        for stream in removed {
            lines.push(format!("  {}", format_stream(stream)));
        }
    }

    let art: Vec<&StreamDescriptor> = media
        .streams
        .iter()
        .filter(|s| decision.art().contains(&s.index))
        .collect();
    if !art.is_empty() {
        lines.push("Album Art (Metadata Only):".to_string());
        for stream in art {
            lines.push(format!("  {}", format_art(stream)));
        }
    }

    let v = decision.kept_of_kind(media, CodecType::Video);
    let a = decision.kept_of_kind(media, CodecType::Audio);
    let s = decision.kept_of_kind(media, CodecType::Subtitle);
    lines.push(format!("Final: {} streams ({v}v, {a}a, {s}s)", v + a + s));

    lines.join("\n")
}

/// Full completion message: header, size/time/date line, then [`summarize`].
pub fn completion_message(
    output_name: &str,
    output_bytes: u64,
    elapsed: Duration,
    media: &MediaInfo,
    decision: &SelectionDecision,
) -> String {
    let date = chrono::Local::now().format("%d %b %Y");
    format!(
        "Processing Complete\n{output_name}\n{} | {} | {date}\n{}",
        readable_size(output_bytes),
        readable_duration(elapsed),
        summarize(media, decision)
    )
}

fn format_stream(stream: &StreamDescriptor) -> String {
    match stream.codec_type {
        CodecType::Video => format_video(stream),
        CodecType::Subtitle => format_subtitle(stream),
        _ => format_audio(stream),
    }
}

/// `h264 High@4.1, 1920x1080, 23.976 fps`
fn format_video(stream: &StreamDescriptor) -> String {
    let mut codec = codec_name(stream).to_string();
    match (stream.meta(meta::PROFILE), stream.meta(meta::LEVEL)) {
        (Some(profile), Some(level)) => {
            codec.push_str(&format!(" {profile}@{}", dotted_level(level)));
        }
        (Some(profile), None) => codec.push_str(&format!(" {profile}")),
        _ => {}
    }
    let fps = stream
        .meta(meta::FRAME_RATE)
        .and_then(parse_frame_rate)
        .map(|f| format!("{f:.3}"))
        .unwrap_or_else(|| "N/A".to_string());
    format!("{codec}, {}, {fps} fps", resolution(stream))
}

/// `1. aac HIN, 5.1, 384 kbps`
fn format_audio(stream: &StreamDescriptor) -> String {
    let layout = stream.meta(meta::CHANNEL_LAYOUT).unwrap_or("N/A");
    let bitrate = stream
        .meta(meta::BIT_RATE)
        .and_then(|b| b.parse::<u64>().ok())
        .map(|b| format!("{} kbps", b / 1000))
        .unwrap_or_else(|| "N/A".to_string());
    format!(
        "{}. {} {}, {layout}, {bitrate}",
        stream.index,
        codec_name(stream),
        language_label(stream)
    )
}

/// `3. subrip ENG, Default`
fn format_subtitle(stream: &StreamDescriptor) -> String {
    let mut line = format!(
        "{}. {} {}",
        stream.index,
        codec_name(stream),
        language_label(stream)
    );
    if stream.disposition.default {
        line.push_str(", Default");
    }
    line
}

/// `Art: MJPEG, 600x600, cover`
fn format_art(stream: &StreamDescriptor) -> String {
    format!(
        "Art: {}, {}, {}",
        codec_name(stream).to_uppercase(),
        resolution(stream),
        stream.title().unwrap_or_default()
    )
}

fn codec_name(stream: &StreamDescriptor) -> &str {
    if stream.codec_name.is_empty() {
        "N/A"
    } else {
        &stream.codec_name
    }
}

fn language_label(stream: &StreamDescriptor) -> String {
    resolve_stream(stream).as_str().to_uppercase()
}

fn resolution(stream: &StreamDescriptor) -> String {
    format!(
        "{}x{}",
        stream.meta(meta::WIDTH).unwrap_or("0"),
        stream.meta(meta::HEIGHT).unwrap_or("0")
    )
}

/// ffprobe reports H.264/HEVC levels as an integer, e.g. `41` for 4.1.
fn dotted_level(level: &str) -> String {
    let mut chars = level.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(major), Some(minor), None) if level.chars().all(|c| c.is_ascii_digit()) => {
            format!("{major}.{minor}")
        }
        _ => level.to_string(),
    }
}

fn parse_frame_rate(rate: &str) -> Option<f64> {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().ok()?;
            let den: f64 = den.parse().ok()?;
            (den != 0.0).then(|| num / den)
        }
        None => rate.parse().ok(),
    }
}

/// Binary units with two decimals: `1.50 GiB`.
pub fn readable_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// `1h2m3s`, dropping leading zero units.
pub fn readable_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m{s}s"),
        _ => format!("{h}h{m}m{s}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tk_probe::FormatInfo;

    fn media() -> MediaInfo {
        let mut sub = StreamDescriptor::new(4, CodecType::Subtitle, "subrip").with_language("eng");
        sub.disposition.default = true;
        MediaInfo {
            format: FormatInfo::default(),
            streams: vec![
                StreamDescriptor::new(0, CodecType::Video, "h264")
                    .with_meta(meta::PROFILE, "High")
                    .with_meta(meta::LEVEL, "41")
                    .with_meta(meta::WIDTH, "1920")
                    .with_meta(meta::HEIGHT, "1080")
                    .with_meta(meta::FRAME_RATE, "24000/1001"),
                StreamDescriptor::new(1, CodecType::Audio, "aac")
                    .with_language("hin")
                    .with_meta(meta::CHANNEL_LAYOUT, "5.1")
                    .with_meta(meta::BIT_RATE, "384000"),
                StreamDescriptor::new(2, CodecType::Audio, "ac3").with_language("eng"),
                StreamDescriptor::new(3, CodecType::Audio, "aac"),
                sub,
                StreamDescriptor::new(5, CodecType::Video, "mjpeg")
                    .as_attached_picture()
                    .with_meta(meta::WIDTH, "600")
                    .with_meta(meta::HEIGHT, "600")
                    .with_meta(meta::TITLE, "cover"),
            ],
        }
    }

    #[test]
    fn summary_sections() {
        let decision = SelectionDecision::from_sets([0, 1, 4], [2, 3], [5]).unwrap();
        let text = summarize(&media(), &decision);
        let expected = "\
Streams Kept:
  h264 High@4.1, 1920x1080, 23.976 fps
  1. aac HIN, 5.1, 384 kbps
  4. subrip ENG, Default
Streams Removed:
  2. ac3 ENG, N/A, N/A
  3. aac UND, N/A, N/A
Album Art (Metadata Only):
  Art: MJPEG, 600x600, cover
Final: 3 streams (1v, 1a, 1s)";
        assert_eq!(text, expected);
    }

    #[test]
    fn summary_without_removed_or_art() {
        let m = MediaInfo {
            format: FormatInfo::default(),
            streams: vec![StreamDescriptor::new(0, CodecType::Video, "hevc")],
        };
        let decision = SelectionDecision::from_sets([0], [], []).unwrap();
        let text = summarize(&m, &decision);
        assert!(!text.contains("Removed"));
        assert!(!text.contains("Album Art"));
        assert!(text.contains("hevc, 0x0, N/A fps"));
        assert!(text.ends_with("Final: 1 streams (1v, 0a, 0s)"));
    }

    #[test]
    fn completion_message_header() {
        let decision = SelectionDecision::from_sets([0, 1, 4], [2, 3], [5]).unwrap();
        let msg = completion_message(
            "movie.processed.mkv",
            1536 * 1024 * 1024,
            Duration::from_secs(75),
            &media(),
            &decision,
        );
        let mut lines = msg.lines();
        assert_eq!(lines.next(), Some("Processing Complete"));
        assert_eq!(lines.next(), Some("movie.processed.mkv"));
        assert!(lines.next().unwrap().starts_with("1.50 GiB | 1m15s | "));
    }

    #[test]
    fn level_and_frame_rate_formatting() {
        assert_eq!(dotted_level("41"), "4.1");
        assert_eq!(dotted_level("150"), "150");
        assert_eq!(dotted_level("-99"), "-99");
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("29.97"), Some(29.97));
    }

    #[test]
    fn readable_helpers() {
        assert_eq!(readable_size(512), "512 B");
        assert_eq!(readable_size(2048), "2.00 KiB");
        assert_eq!(readable_duration(Duration::from_secs(9)), "9s");
        assert_eq!(readable_duration(Duration::from_secs(3723)), "1h2m3s");
    }
}
