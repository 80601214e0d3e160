//! Per-frame cost of the analysis core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use resonance::audio::{detect_pitch_autocorrelation, PitchEstimator, YinPitchDetector};
use resonance::{AnalysisConfig, FrameAnalyzer, SpectrumAnalyzer};

const SAMPLE_RATE: f32 = 44100.0;

fn tone(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / SAMPLE_RATE).sin() * 0.5)
        .collect()
}

fn bench_yin(c: &mut Criterion) {
    let mut group = c.benchmark_group("yin");
    for size in [1024usize, 2048, 4096] {
        let samples = tone(size);
        let mut detector = YinPitchDetector::default();
        group.bench_with_input(BenchmarkId::from_parameter(size), &samples, |b, samples| {
            b.iter(|| detector.estimate(black_box(samples), black_box(SAMPLE_RATE)));
        });
    }
    group.finish();
}

fn bench_autocorrelation(c: &mut Criterion) {
    let samples = tone(2048);
    c.bench_function("autocorrelation_2048", |b| {
        b.iter(|| {
            detect_pitch_autocorrelation(black_box(&samples), black_box(SAMPLE_RATE), 60.0, 1500.0)
        });
    });
}

fn bench_frame(c: &mut Criterion) {
    let fft_size = 2048;
    let samples = tone(fft_size);
    let spectrum = SpectrumAnalyzer::new(fft_size)
        .unwrap()
        .byte_spectrum(&samples);
    let mut analyzer = FrameAnalyzer::new(SAMPLE_RATE, fft_size, AnalysisConfig::default()).unwrap();

    c.bench_function("analyze_frame_2048", |b| {
        b.iter(|| analyzer.analyze(black_box(&samples), black_box(&spectrum)));
    });
}

criterion_group!(benches, bench_yin, bench_autocorrelation, bench_frame);
criterion_main!(benches);
