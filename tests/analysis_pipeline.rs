//! End-to-end tests for the per-frame analysis pipeline

use resonance::audio::spectrum::bin_to_frequency;
use resonance::audio::{Instrument, NoteName};
use resonance::{AnalysisConfig, FrameAnalyzer, SpectrumAnalyzer};

const SAMPLE_RATE: f32 = 44100.0;
const FFT_SIZE: usize = 2048;

fn sine(freq: f32, len: usize, amplitude: f32) -> Vec<f32> {
    (0..len)
        .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE).sin())
        .collect()
}

/// Spectrum whose bottom 10% of bins sits at `level` and is silent elsewhere.
fn bass_spectrum(level: u8) -> Vec<u8> {
    let mut spectrum = vec![0u8; FFT_SIZE / 2];
    let bass_bins = FFT_SIZE / 2 / 10;
    spectrum[..bass_bins].fill(level);
    spectrum
}

#[test]
fn test_a440_sine_maps_to_a4() {
    let mut analyzer = FrameAnalyzer::new(SAMPLE_RATE, FFT_SIZE, AnalysisConfig::default()).unwrap();
    let mut spectra = SpectrumAnalyzer::new(FFT_SIZE).unwrap().with_smoothing(0.0);

    let window = sine(440.0, FFT_SIZE, 0.05);
    let spectrum = spectra.byte_spectrum(&window);
    let frame = analyzer.analyze(&window, &spectrum);

    let pitch = frame.pitch.expect("pure tone should have a pitch");
    assert!((pitch - 440.0).abs() / 440.0 < 0.01, "pitch {pitch}");

    let note = frame.note.expect("pitch should map to a note");
    assert_eq!(note.note, NoteName::A);
    assert_eq!(note.octave, 4);
    assert!(note.cents.abs() <= 10, "cents {}", note.cents);

    let bin_width = bin_to_frequency(1, SAMPLE_RATE, FFT_SIZE);
    let dominant = frame.dominant_frequency.expect("tone should dominate the spectrum");
    assert!((dominant - 440.0).abs() <= 2.0 * bin_width, "dominant {dominant}");

    // Energy sits in the low-mid band (250-500 Hz).
    assert!(frame.bands.low_mid > frame.bands.brilliance);
    assert!(frame.spectral_centroid > 0.0);
}

#[test]
fn test_silence_reports_no_data() {
    let mut analyzer = FrameAnalyzer::new(SAMPLE_RATE, FFT_SIZE, AnalysisConfig::default()).unwrap();
    let mut spectra = SpectrumAnalyzer::new(FFT_SIZE).unwrap();

    let window = vec![0.0f32; FFT_SIZE];
    let spectrum = spectra.byte_spectrum(&window);
    let frame = analyzer.analyze(&window, &spectrum);

    assert_eq!(frame.pitch, None);
    assert_eq!(frame.note, None);
    assert_eq!(frame.dominant_frequency, None);
    assert!(frame.peaks.is_empty());
    assert!(!frame.beat.is_beat);
    assert_eq!(frame.spectral_centroid, 0.0);
    assert!(frame.instruments.iter().all(|(_, level)| level == 0.0));
}

#[test]
fn test_pitch_does_not_go_stale() {
    let mut analyzer = FrameAnalyzer::new(SAMPLE_RATE, FFT_SIZE, AnalysisConfig::default()).unwrap();
    let spectrum = vec![0u8; FFT_SIZE / 2];

    let tone = analyzer.analyze(&sine(330.0, FFT_SIZE, 0.5), &spectrum);
    assert!(tone.pitch.is_some());

    let silence = analyzer.analyze(&vec![0.0; FFT_SIZE], &spectrum);
    assert_eq!(silence.pitch, None);
    assert_eq!(silence.note, None);
}

#[test]
fn test_bass_spike_triggers_beat() {
    let mut analyzer = FrameAnalyzer::new(SAMPLE_RATE, FFT_SIZE, AnalysisConfig::default()).unwrap();
    let window = vec![0.0f32; FFT_SIZE];

    for _ in 0..10 {
        let frame = analyzer.analyze(&window, &bass_spectrum(20));
        assert!(!frame.beat.is_beat);
    }
    let frame = analyzer.analyze(&window, &bass_spectrum(80));
    assert!(frame.beat.is_beat);
    assert!(frame.beat.energy > frame.beat.average_energy * 1.3);
}

#[test]
fn test_energy_at_average_is_not_beat() {
    let mut analyzer = FrameAnalyzer::new(SAMPLE_RATE, FFT_SIZE, AnalysisConfig::default()).unwrap();
    let window = vec![0.0f32; FFT_SIZE];

    for _ in 0..10 {
        let frame = analyzer.analyze(&window, &bass_spectrum(90));
        assert!((frame.beat.energy - frame.beat.average_energy).abs() < 1e-3);
        assert!(!frame.beat.is_beat);
    }
}

#[test]
fn test_reset_after_seek() {
    let mut analyzer = FrameAnalyzer::new(SAMPLE_RATE, FFT_SIZE, AnalysisConfig::default()).unwrap();
    let window = vec![0.0f32; FFT_SIZE];

    // A loud previous track leaves a high average behind.
    for _ in 0..20 {
        analyzer.analyze(&window, &bass_spectrum(250));
    }
    analyzer.reset();

    let frame = analyzer.analyze(&window, &bass_spectrum(60));
    assert_eq!(frame.beat.average_energy, frame.beat.energy);
}

#[test]
fn test_sessions_are_independent() {
    let mut first = FrameAnalyzer::new(SAMPLE_RATE, FFT_SIZE, AnalysisConfig::default()).unwrap();
    let mut second = FrameAnalyzer::new(SAMPLE_RATE, FFT_SIZE, AnalysisConfig::default()).unwrap();
    let window = vec![0.0f32; FFT_SIZE];

    for _ in 0..10 {
        first.analyze(&window, &bass_spectrum(20));
    }
    // A fresh session has no history, so its first frame is its own average.
    let frame = second.analyze(&window, &bass_spectrum(80));
    assert_eq!(frame.beat.average_energy, frame.beat.energy);
    assert!(!frame.beat.is_beat);

    assert!(first.analyze(&window, &bass_spectrum(80)).beat.is_beat);
}

#[test]
fn test_instruments_follow_band_energy() {
    let mut analyzer = FrameAnalyzer::new(SAMPLE_RATE, FFT_SIZE, AnalysisConfig::default()).unwrap();
    let window = vec![0.0f32; FFT_SIZE];

    // Fill everything from 4 kHz up.
    let mut spectrum = vec![0u8; FFT_SIZE / 2];
    let start = resonance::audio::spectrum::frequency_to_bin(4000.0, SAMPLE_RATE, FFT_SIZE);
    spectrum[start..].fill(180);

    let frame = analyzer.analyze(&window, &spectrum);
    assert!((frame.instruments.get(Instrument::HiHat) - 1.0).abs() < 1e-6);
    assert_eq!(frame.instruments.get(Instrument::Kick), 0.0);
    assert_eq!(
        frame.instruments.strongest().map(|(instrument, _)| instrument),
        Some(Instrument::HiHat)
    );
}

#[test]
fn test_streaming_tone_through_spectrum_analyzer() {
    let mut analyzer = FrameAnalyzer::new(SAMPLE_RATE, FFT_SIZE, AnalysisConfig::default()).unwrap();
    let mut spectra = SpectrumAnalyzer::new(FFT_SIZE).unwrap();

    let signal = sine(220.0, FFT_SIZE * 8, 0.3);
    let hop = (SAMPLE_RATE / 60.0) as usize;
    let mut pos = 0;
    let mut detected = 0;
    while pos + FFT_SIZE <= signal.len() {
        let window = &signal[pos..pos + FFT_SIZE];
        let spectrum = spectra.byte_spectrum(window);
        let frame = analyzer.analyze(window, &spectrum);
        if let Some(note) = frame.note {
            assert_eq!((note.note, note.octave), (NoteName::A, 3));
            detected += 1;
        }
        pos += hop;
    }
    assert!(detected > 0);
    assert_eq!(analyzer.frames_rejected(), 0);
}

#[test]
fn test_frame_serializes_to_json() {
    let mut analyzer = FrameAnalyzer::new(SAMPLE_RATE, FFT_SIZE, AnalysisConfig::default()).unwrap();
    let frame = analyzer.analyze(&sine(440.0, FFT_SIZE, 0.5), &bass_spectrum(120));

    let json = serde_json::to_value(&frame).unwrap();
    assert_eq!(json["note"]["note"], "A");
    assert_eq!(json["note"]["octave"], 4);
    assert!(json["bands"]["sub_bass"].is_number());
    assert!(json["instruments"]["kick"].is_number());
    assert!(json["beat"]["is_beat"].is_boolean());
}
