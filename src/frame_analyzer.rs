use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Instant;

use resonance::audio::FrequencyBand;
use resonance::{AnalysisConfig, AnalysisFrame, FrameAnalyzer, SpectrumAnalyzer};

/// Per-frame budget at 60 Hz.
const FRAME_BUDGET_MS: f32 = 1000.0 / 60.0;

#[derive(Parser)]
#[command(name = "frame-analyzer")]
#[command(about = "Run the real-time analysis core over a WAV file or test tone and report per-frame results")]
struct Args {
    /// WAV file to analyze (mixed down to mono)
    #[arg(required_unless_present_any = ["tone", "write_default_config"])]
    input: Option<String>,

    /// Analyze a synthetic sine at this frequency (Hz) instead of a file
    #[arg(long, conflicts_with = "input")]
    tone: Option<f32>,

    /// Length of the synthetic tone in seconds
    #[arg(long, default_value = "2.0")]
    duration: f32,

    /// Sample rate of the synthetic tone
    #[arg(long, default_value = "44100")]
    sample_rate: u32,

    /// Transform size (power of two); also the time-domain window length
    #[arg(long, default_value = "2048")]
    fft_size: usize,

    /// Analysis ticks per second
    #[arg(long, default_value = "60")]
    frame_rate: f32,

    /// JSON analysis configuration; missing fields use defaults
    #[arg(long)]
    config: Option<String>,

    /// Write the default configuration to this path and exit
    #[arg(long)]
    write_default_config: Option<String>,

    /// Output JSON report path
    #[arg(long, short, default_value = "frame_analysis.json")]
    output: String,

    /// Include every frame in the report (large)
    #[arg(long)]
    frame_by_frame: bool,
}

#[derive(Debug, Serialize)]
struct FeatureStats {
    min: f32,
    max: f32,
    mean: f32,
    median: f32,
    std_dev: f32,
    samples: usize,
}

#[derive(Debug, Serialize)]
struct SourceInfo {
    source: String,
    duration_seconds: f32,
    sample_rate: f32,
    total_samples: usize,
    fft_size: usize,
    frame_rate: f32,
    hop_size: usize,
}

#[derive(Debug, Serialize)]
struct TimingStats {
    mean_frame_ms: f32,
    worst_frame_ms: f32,
    frames_over_budget: usize,
    budget_ms: f32,
}

#[derive(Debug, Serialize)]
struct Summary {
    frames_analyzed: usize,
    frames_with_pitch: usize,
    beat_count: usize,
    beat_timestamps: Vec<f32>,
    note_histogram: BTreeMap<String, usize>,
    band_stats: BTreeMap<String, FeatureStats>,
    feature_stats: BTreeMap<String, FeatureStats>,
    timing: TimingStats,
}

#[derive(Debug, Serialize)]
struct TimedFrame {
    timestamp: f32,
    #[serde(flatten)]
    frame: AnalysisFrame,
}

#[derive(Debug, Serialize)]
struct Report {
    source: SourceInfo,
    config: AnalysisConfig,
    summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<Vec<TimedFrame>>,
}

/// Collects per-frame values for the summary.
#[derive(Default)]
struct SummaryCollector {
    features: HashMap<&'static str, Vec<f32>>,
    frames_analyzed: usize,
    frames_with_pitch: usize,
    beat_timestamps: Vec<f32>,
    note_histogram: BTreeMap<String, usize>,
    frame_times_ms: Vec<f32>,
}

impl SummaryCollector {
    fn add_frame(&mut self, frame: &AnalysisFrame, timestamp: f32, elapsed_ms: f32) {
        self.frames_analyzed += 1;
        self.frame_times_ms.push(elapsed_ms);

        for (band, energy) in frame.bands.iter() {
            self.add_sample(band.name(), energy);
        }
        self.add_sample("spectral_centroid", frame.spectral_centroid);
        self.add_sample("volume", frame.volume);
        self.add_sample("beat_energy", frame.beat.energy);
        if let Some(pitch) = frame.pitch {
            self.frames_with_pitch += 1;
            self.add_sample("pitch", pitch);
        }
        if let Some(note) = frame.note {
            *self
                .note_histogram
                .entry(format!("{}{}", note.note, note.octave))
                .or_insert(0) += 1;
        }
        if frame.beat.is_beat {
            self.beat_timestamps.push(timestamp);
        }
    }

    fn add_sample(&mut self, feature: &'static str, value: f32) {
        self.features.entry(feature).or_default().push(value);
    }

    fn finish(mut self) -> Summary {
        let mut band_stats = BTreeMap::new();
        for band in FrequencyBand::ALL {
            if let Some(values) = self.features.remove(band.name()) {
                band_stats.insert(band.name().to_string(), calculate_stats(&values));
            }
        }
        let feature_stats = self
            .features
            .iter()
            .map(|(name, values)| (name.to_string(), calculate_stats(values)))
            .collect();

        let frames_over_budget = self
            .frame_times_ms
            .iter()
            .filter(|&&ms| ms > FRAME_BUDGET_MS)
            .count();
        let timing = TimingStats {
            mean_frame_ms: mean(&self.frame_times_ms),
            worst_frame_ms: self.frame_times_ms.iter().fold(0.0f32, |a, &b| a.max(b)),
            frames_over_budget,
            budget_ms: FRAME_BUDGET_MS,
        };

        Summary {
            frames_analyzed: self.frames_analyzed,
            frames_with_pitch: self.frames_with_pitch,
            beat_count: self.beat_timestamps.len(),
            beat_timestamps: self.beat_timestamps,
            note_histogram: self.note_histogram,
            band_stats,
            feature_stats,
            timing,
        }
    }
}

fn mean(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f32>() / data.len() as f32
}

fn calculate_stats(data: &[f32]) -> FeatureStats {
    if data.is_empty() {
        return FeatureStats {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            median: 0.0,
            std_dev: 0.0,
            samples: 0,
        };
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mean = mean(data);
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / data.len() as f32;

    FeatureStats {
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        mean,
        median: sorted[sorted.len() / 2],
        std_dev: variance.sqrt(),
        samples: data.len(),
    }
}

/// Load a WAV file as mono f32 samples.
fn load_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, f32)> {
    let path = path.as_ref();
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let mono = if channels == 1 {
        samples
    } else {
        samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok((mono, spec.sample_rate as f32))
}

fn synthesize_tone(freq: f32, sample_rate: f32, duration: f32) -> Vec<f32> {
    let len = (sample_rate * duration.max(0.0)) as usize;
    (0..len)
        .map(|i| 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if let Some(path) = &args.write_default_config {
        AnalysisConfig::default().save(path)?;
        info!("Default configuration written to {}", path);
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("failed to load configuration from {path}"))?,
        None => AnalysisConfig::default(),
    };

    if args.frame_rate.is_nan() || args.frame_rate <= 0.0 {
        bail!("--frame-rate must be positive, got {}", args.frame_rate);
    }

    let (samples, sample_rate, source) = match (&args.input, args.tone) {
        (_, Some(freq)) => {
            let sample_rate = args.sample_rate as f32;
            (
                synthesize_tone(freq, sample_rate, args.duration),
                sample_rate,
                format!("tone:{freq}Hz"),
            )
        }
        (Some(path), None) => {
            let (samples, sample_rate) = load_wav(path)?;
            (samples, sample_rate, path.clone())
        }
        (None, None) => bail!("either an input file or --tone is required"),
    };

    let fft_size = args.fft_size;
    let mut analyzer = FrameAnalyzer::new(sample_rate, fft_size, config.clone())?;
    let mut spectra = SpectrumAnalyzer::new(fft_size)?;
    let mut spectrum = vec![0u8; spectra.bin_count()];

    let hop_size = ((sample_rate / args.frame_rate) as usize).max(1);
    let total_samples = samples.len();
    let duration_seconds = total_samples as f32 / sample_rate;

    info!("Source: {} ({:.2}s at {} Hz)", source, duration_seconds, sample_rate);
    info!(
        "Transform size {}, hop {} samples ({:.1} frames/s)",
        fft_size, hop_size, args.frame_rate
    );
    if total_samples < fft_size {
        warn!("Source is shorter than one window; nothing to analyze");
    }

    let mut collector = SummaryCollector::default();
    let mut frames = args.frame_by_frame.then(Vec::new);
    let mut sample_pos = 0;

    while sample_pos + fft_size <= total_samples {
        let window = &samples[sample_pos..sample_pos + fft_size];
        let timestamp = sample_pos as f32 / sample_rate;

        spectra.process(window, &mut spectrum)?;

        let started = Instant::now();
        let frame = analyzer.analyze(window, &spectrum);
        let elapsed_ms = started.elapsed().as_secs_f32() * 1000.0;

        collector.add_frame(&frame, timestamp, elapsed_ms);
        if let Some(frames) = frames.as_mut() {
            frames.push(TimedFrame { timestamp, frame });
        }

        sample_pos += hop_size;
        if collector.frames_analyzed % 1000 == 0 {
            info!(
                "Analyzed {} frames ({:.1}s of {:.1}s)",
                collector.frames_analyzed, timestamp, duration_seconds
            );
        }
    }

    let summary = collector.finish();
    if summary.timing.frames_over_budget > 0 {
        warn!(
            "{} frames exceeded the {:.1} ms budget (worst {:.2} ms)",
            summary.timing.frames_over_budget, FRAME_BUDGET_MS, summary.timing.worst_frame_ms
        );
    }

    let report = Report {
        source: SourceInfo {
            source,
            duration_seconds,
            sample_rate,
            total_samples,
            fft_size,
            frame_rate: args.frame_rate,
            hop_size,
        },
        config,
        summary,
        frames,
    };

    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("failed to write {}", args.output))?;

    info!("Analysis complete");
    info!("  Frames: {}", report.summary.frames_analyzed);
    info!("  Frames with pitch: {}", report.summary.frames_with_pitch);
    info!("  Beats: {}", report.summary.beat_count);
    if let Some((note, count)) = report.summary.note_histogram.iter().max_by_key(|(_, c)| **c) {
        info!("  Most common note: {} ({} frames)", note, count);
    }
    info!(
        "  Mean frame time: {:.3} ms (worst {:.3} ms)",
        report.summary.timing.mean_frame_ms, report.summary.timing.worst_frame_ms
    );
    info!("Report written to {}", args.output);

    Ok(())
}
