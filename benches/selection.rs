//! Benchmarks for probe parsing, track selection, and plan building
//!
//! Uses a synthetic release with many dubbed audio and subtitle tracks, the
//! worst case seen for multi-language uploads.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tk_av::PlanBuilder;
use tk_core::LanguageCode;
use tk_probe::parse_ffprobe_json;
use tk_select::{parse_language_list, resolve, StreamSelector};

const LANGUAGES: [&str; 8] = ["eng", "hin", "tam", "mal", "kan", "jpn", "spa", "tel"];

/// ffprobe output with one video, `audio` audio and `subs` subtitle streams.
fn release_json(audio: u32, subs: u32) -> String {
    let mut streams = vec![serde_json::json!({
        "index": 0, "codec_type": "video", "codec_name": "hevc",
        "width": 3840, "height": 2160, "r_frame_rate": "24000/1001",
    })];
    for i in 0..audio {
        let lang = LANGUAGES[i as usize % LANGUAGES.len()];
        streams.push(serde_json::json!({
            "index": 1 + i, "codec_type": "audio", "codec_name": "eac3",
            "channel_layout": "5.1(side)", "bit_rate": "640000",
            "tags": {"language": lang, "title": format!("{lang} dub {i}")},
        }));
    }
    for i in 0..subs {
        streams.push(serde_json::json!({
            "index": 1 + audio + i, "codec_type": "subtitle", "codec_name": "subrip",
            "tags": {"language": LANGUAGES[i as usize % LANGUAGES.len()]},
        }));
    }
    serde_json::json!({
        "streams": streams,
        "format": {"duration": "7200.000000", "size": "15000000000"},
    })
    .to_string()
}

fn bench_probe_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("probe_parsing");

    for (name, audio, subs) in [("simple", 2, 2), ("dubbed", 40, 60)] {
        let json = release_json(audio, subs);
        group.throughput(Throughput::Bytes(json.len() as u64));
        group.bench_with_input(BenchmarkId::new("ffprobe", name), &json, |b, json| {
            b.iter(|| parse_ffprobe_json(black_box(json)).unwrap());
        });
    }

    group.finish();
}

fn bench_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("selection");
    let media = parse_ffprobe_json(&release_json(40, 60)).unwrap();

    // Matches on the last preference, so every earlier one is scanned first.
    let late_match = parse_language_list("fre,ger,tel");
    group.bench_function("select/late_match", |b| {
        b.iter(|| StreamSelector::select(black_box(&media), black_box(&late_match)));
    });

    let no_match = vec![LanguageCode::new("fin")];
    group.bench_function("select/no_match", |b| {
        b.iter(|| StreamSelector::select(black_box(&media), black_box(&no_match)));
    });

    group.bench_function("resolve/title_only", |b| {
        b.iter(|| resolve(black_box("und"), black_box("Malayalam [Original Audio]")));
    });

    group.finish();
}

fn bench_plan(c: &mut Criterion) {
    let media = parse_ffprobe_json(&release_json(40, 60)).unwrap();
    let decision = StreamSelector::select(&media, &parse_language_list("tel"));

    c.bench_function("plan/build_and_args", |b| {
        b.iter(|| {
            let plan = PlanBuilder::new(black_box(&media))
                .build(&decision, "/in/movie.mkv", "/in/movie.processed.mkv")
                .unwrap();
            plan.to_args()
        });
    });
}

criterion_group!(benches, bench_probe_parsing, bench_selection, bench_plan);
criterion_main!(benches);
