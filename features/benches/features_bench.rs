use criterion::{black_box, criterion_group, criterion_main, Criterion};
use voxgender_features::{extract_from_audio, DecodedAudio, FeatureSelection, ANALYSIS_RATE};

fn make_tone(freq_hz: f64, secs: f64) -> DecodedAudio {
    let n = (secs * ANALYSIS_RATE as f64) as usize;
    let samples = (0..n)
        .map(|i| {
            let t = i as f64 / ANALYSIS_RATE as f64;
            (freq_hz * 2.0 * std::f64::consts::PI * t).sin() as f32
        })
        .collect();
    DecodedAudio {
        samples,
        sample_rate: ANALYSIS_RATE,
    }
}

fn bench_mel_3s(c: &mut Criterion) {
    let audio = make_tone(220.0, 3.0);
    let selection = FeatureSelection::mel_only();

    c.bench_function("features_mel_3s", |b| {
        b.iter(|| {
            let _ = black_box(extract_from_audio(black_box(&audio), &selection));
        });
    });
}

fn bench_all_3s(c: &mut Criterion) {
    let audio = make_tone(220.0, 3.0);
    let selection = FeatureSelection::all();

    c.bench_function("features_all_3s", |b| {
        b.iter(|| {
            let _ = black_box(extract_from_audio(black_box(&audio), &selection));
        });
    });
}

criterion_group!(benches, bench_mel_3s, bench_all_3s);
criterion_main!(benches);
