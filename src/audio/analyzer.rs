use serde::Serialize;

use super::beat_detector::{BeatDetector, BeatState};
use super::instrument::{InstrumentEstimator, InstrumentLevels};
use super::note::{frequency_to_note, NoteInfo};
use super::pitch::{build_estimator, PitchEstimator};
use super::spectrum::{
    band_energies, dominant_frequency_above, frequency_peaks, spectral_centroid, BandEnergies,
    FrequencyPeak, PeakSearch,
};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;

/// Everything the core knows about one frame.
///
/// Absent detections are `None`; an idle frame is never filled with values
/// carried over from an earlier frame.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisFrame {
    /// Fundamental from the time-domain window (Hz).
    pub pitch: Option<f32>,
    /// Note nearest to `pitch`.
    pub note: Option<NoteInfo>,
    /// Loudest spectral bin inside the peak search range (Hz).
    pub dominant_frequency: Option<f32>,
    pub peaks: Vec<FrequencyPeak>,
    pub bands: BandEnergies,
    /// Magnitude-weighted mean frequency (Hz), 0 for silence.
    pub spectral_centroid: f32,
    pub beat: BeatState,
    pub instruments: InstrumentLevels,
    /// RMS of the time-domain window.
    pub volume: f32,
}

impl AnalysisFrame {
    /// The "no data" frame shown while stopped or after a rejected frame.
    pub fn idle() -> Self {
        Self::default()
    }
}

/// Per-session analysis pipeline.
///
/// Owns the only cross-frame state (the beat history) plus reusable pitch
/// scratch space. Create one per playback session, feed it frames in order,
/// and call [`reset`](Self::reset) on seek or track change.
///
/// ```
/// use resonance::{AnalysisConfig, FrameAnalyzer};
///
/// let mut analyzer = FrameAnalyzer::new(44100.0, 2048, AnalysisConfig::default())?;
/// let samples = vec![0.0f32; 2048];
/// let spectrum = vec![0u8; 1024];
///
/// let frame = analyzer.analyze(&samples, &spectrum);
/// assert_eq!(frame.pitch, None);
/// assert!(!frame.beat.is_beat);
/// # Ok::<(), resonance::AnalysisError>(())
/// ```
pub struct FrameAnalyzer {
    sample_rate: f32,
    fft_size: usize,
    config: AnalysisConfig,
    peak_search: PeakSearch,
    pitch_estimator: Box<dyn PitchEstimator + Send>,
    beat_detector: BeatDetector,
    instruments: InstrumentEstimator,
    frames_analyzed: u64,
    frames_rejected: u64,
}

impl FrameAnalyzer {
    pub fn new(
        sample_rate: f32,
        fft_size: usize,
        config: AnalysisConfig,
    ) -> Result<Self, AnalysisError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(AnalysisError::InvalidSampleRate(sample_rate));
        }
        if fft_size < 4 || !fft_size.is_power_of_two() {
            return Err(AnalysisError::InvalidTransformSize(fft_size));
        }
        config.validate()?;

        let pitch_estimator = build_estimator(&config.pitch);
        log::debug!(
            "Frame analyzer: {} Hz, {} point transform, pitch via {}",
            sample_rate,
            fft_size,
            pitch_estimator.name()
        );

        let peak_search = PeakSearch {
            count: config.spectrum.peak_count,
            min_frequency: config.spectrum.min_frequency,
            max_frequency: config.spectrum.max_frequency,
            threshold: config.spectrum.peak_threshold,
        };

        Ok(Self {
            sample_rate,
            fft_size,
            peak_search,
            pitch_estimator,
            beat_detector: BeatDetector::new(&config.beat),
            instruments: InstrumentEstimator::new(&config.instrument),
            config,
            frames_analyzed: 0,
            frames_rejected: 0,
        })
    }

    /// Analyze one frame, degrading to [`AnalysisFrame::idle`] on bad input.
    ///
    /// Mismatched buffers are a caller bug; they are logged and skipped so the
    /// next frame is still analyzed.
    pub fn analyze(&mut self, samples: &[f32], spectrum: &[u8]) -> AnalysisFrame {
        match self.try_analyze(samples, spectrum) {
            Ok(frame) => frame,
            Err(err) => {
                self.frames_rejected += 1;
                // First occurrence, then every 600th (~10 s at 60 Hz).
                if self.frames_rejected % 600 == 1 {
                    log::warn!(
                        "Skipping frame ({} rejected so far): {}",
                        self.frames_rejected,
                        err
                    );
                }
                self.idle_frame()
            }
        }
    }

    /// Analyze one frame, reporting buffer/session mismatches as errors.
    pub fn try_analyze(
        &mut self,
        samples: &[f32],
        spectrum: &[u8],
    ) -> Result<AnalysisFrame, AnalysisError> {
        if samples.len() != self.fft_size {
            return Err(AnalysisError::WindowLength {
                expected: self.fft_size,
                got: samples.len(),
            });
        }
        if spectrum.len() != self.fft_size / 2 {
            return Err(AnalysisError::SpectrumLength {
                expected: self.fft_size / 2,
                got: spectrum.len(),
            });
        }

        let (sample_rate, fft_size) = (self.sample_rate, self.fft_size);

        let pitch = self.pitch_estimator.estimate(samples, sample_rate);
        let note = pitch.and_then(frequency_to_note);

        let spectrum_config = &self.config.spectrum;
        let dominant_frequency = dominant_frequency_above(
            spectrum,
            sample_rate,
            fft_size,
            spectrum_config.min_frequency,
            spectrum_config.max_frequency,
            spectrum_config.dominant_threshold,
        );
        let peaks = frequency_peaks(spectrum, sample_rate, fft_size, &self.peak_search);
        let bands = band_energies(spectrum, sample_rate, fft_size);
        let centroid = spectral_centroid(spectrum, sample_rate, fft_size);
        let beat = self.beat_detector.detect_beat(spectrum);
        let instruments = self.instruments.estimate(Some(&bands));
        let volume = rms(samples);

        self.frames_analyzed += 1;
        log::trace!(
            "frame {}: pitch {:?}, note {:?}, centroid {:.0} Hz, beat {}",
            self.frames_analyzed,
            pitch,
            note.map(|n| n.to_string()),
            centroid,
            beat.is_beat
        );

        Ok(AnalysisFrame {
            pitch,
            note,
            dominant_frequency,
            peaks,
            bands,
            spectral_centroid: centroid,
            beat,
            instruments,
            volume,
        })
    }

    /// Frame to show while no spectrum is available (stopped or paused).
    pub fn idle_frame(&self) -> AnalysisFrame {
        AnalysisFrame {
            instruments: self.instruments.estimate(None),
            ..AnalysisFrame::idle()
        }
    }

    /// Clear the beat history. Call after a seek or when a new source loads.
    pub fn reset(&mut self) {
        log::debug!(
            "Resetting beat history after {} frames",
            self.frames_analyzed
        );
        self.beat_detector.reset();
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn frames_analyzed(&self) -> u64 {
        self.frames_analyzed
    }

    pub fn frames_rejected(&self) -> u64 {
        self.frames_rejected
    }
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|x| x * x).sum::<f32>() / samples.len() as f32).sqrt()
}
