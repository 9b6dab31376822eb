use std::hint::black_box;
use std::path::PathBuf;

use criterion::{criterion_group, criterion_main, Criterion};
use ezscore::{
    preprocess, ChannelTrace, MultitaperAnalyzer, PipelineConfig, RawRecording, SpectralConfig,
};

/// One hour of two-channel 256 Hz EEG-like noise.
fn synthetic_hour() -> RawRecording {
    let sfreq = 256.0;
    let n = 3600 * 256;
    let trace = |phase: f32| {
        let mut state = 0x2545_f491_u32 ^ phase.to_bits();
        let samples = (0..n)
            .map(|i| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                let noise = (state >> 8) as f32 / (1u32 << 24) as f32 - 0.5;
                let t = i as f32 / sfreq as f32;
                30.0 * (2.0 * std::f32::consts::PI * 1.5 * t + phase).sin() + 10.0 * noise
            })
            .collect();
        ChannelTrace { samples, sfreq, label: "EEG".into(), source: PathBuf::from("bench.edf") }
    };
    RawRecording::from_traces(trace(0.0), trace(1.0), 0).unwrap()
}

fn bench_preprocess(c: &mut Criterion) {
    let raw = synthetic_hour();
    let cfg = PipelineConfig::default();
    c.bench_function("preprocess 1 h [2×921600 @ 256 Hz → 64 Hz]", |b| {
        b.iter(|| {
            let (cleaned, epochs) = preprocess(black_box(&raw), &cfg).unwrap();
            black_box((cleaned.n_times(), epochs.len()))
        })
    });
}

fn bench_multitaper(c: &mut Criterion) {
    let raw = synthetic_hour();
    let (cleaned, _) = preprocess(&raw, &PipelineConfig::default()).unwrap();
    let mt = MultitaperAnalyzer::new(&SpectralConfig::default(), cleaned.sfreq()).unwrap();
    c.bench_function("multitaper 1 h [NW=3, K=5, 4 s / 1 s]", |b| {
        b.iter(|| {
            let spec = mt.analyze(black_box(&cleaned)).unwrap();
            black_box(spec.times().len())
        })
    });
}

fn bench_tapers(c: &mut Criterion) {
    c.bench_function("dpss N=256 NW=3 K=5", |b| {
        b.iter(|| black_box(ezscore::spectral::dpss(black_box(256), 3.0, 5).unwrap()))
    });
}

criterion_group!(benches, bench_preprocess, bench_multitaper, bench_tapers);
criterion_main!(benches);
