//! # Pitch Detection
//!
//! Time-domain fundamental frequency estimation over a single analysis window.
//!
//! Two methods are provided behind the [`PitchEstimator`] trait:
//! - [`YinPitchDetector`]: the YIN cumulative-mean-normalized difference method
//!   with parabolic refinement. Precise, and the default.
//! - [`AutocorrelationPitchDetector`]: normalized autocorrelation over a
//!   bounded lag range. Coarser (integer lags only) but tolerant of noise.
//!
//! Both return `None` rather than a sentinel frequency when no periodicity is
//! found, so silence never reports a pitch.

use crate::config::{PitchConfig, PitchMethod};

/// Below this normalized correlation the autocorrelation method gives up.
const MIN_CORRELATION: f32 = 0.01;

/// Common interface for pitch detection methods.
///
/// Implementations may keep scratch buffers between calls but must not carry
/// any result from one window into the next.
pub trait PitchEstimator {
    /// Estimate the fundamental of `samples` in Hz.
    fn estimate(&mut self, samples: &[f32], sample_rate: f32) -> Option<f32>;

    /// Short identifier used in logs.
    fn name(&self) -> &'static str;
}

/// Build the estimator selected by `config.method`.
pub fn build_estimator(config: &PitchConfig) -> Box<dyn PitchEstimator + Send> {
    let yin = YinPitchDetector::new(config.yin_threshold);
    let autocorrelation =
        AutocorrelationPitchDetector::new(config.min_frequency, config.max_frequency);

    match config.method {
        PitchMethod::Yin => Box::new(yin),
        PitchMethod::Autocorrelation => Box::new(autocorrelation),
        PitchMethod::YinWithFallback => Box::new(FallbackPitchDetector::new(
            Box::new(yin),
            Box::new(autocorrelation),
        )),
    }
}

/// YIN pitch detector.
///
/// The difference function is O(N²) in the window length and dominates the
/// per-frame cost. The detector keeps its working buffer between calls so
/// that steady-state analysis does not allocate.
pub struct YinPitchDetector {
    threshold: f32,
    buffer: Vec<f32>,
}

impl YinPitchDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            buffer: Vec::new(),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl Default for YinPitchDetector {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl PitchEstimator for YinPitchDetector {
    fn estimate(&mut self, samples: &[f32], sample_rate: f32) -> Option<f32> {
        let half = samples.len() / 2;
        // Need tau = 2 plus one neighbour on each side.
        if half < 4 || sample_rate.is_nan() || sample_rate <= 0.0 {
            return None;
        }

        self.buffer.clear();
        self.buffer.resize(half, 0.0);
        let yin = &mut self.buffer[..];

        // --- Difference function ---
        for tau in 1..half {
            let mut diff = 0.0;
            for i in 0..half {
                let delta = samples[i] - samples[i + tau];
                diff += delta * delta;
            }
            yin[tau] = diff;
        }

        // --- Cumulative mean normalized difference ---
        yin[0] = 1.0;
        let mut running_sum = 0.0;
        for tau in 1..half {
            running_sum += yin[tau];
            if running_sum > 0.0 {
                yin[tau] *= tau as f32 / running_sum;
            } else {
                yin[tau] = 1.0;
            }
        }

        // --- Absolute threshold, then slide down to the local minimum ---
        let mut period = None;
        let mut tau = 2;
        while tau < half {
            if yin[tau] < self.threshold {
                while tau + 1 < half && yin[tau + 1] < yin[tau] {
                    tau += 1;
                }
                period = Some(tau);
                break;
            }
            tau += 1;
        }
        let period = period?;

        let refined = parabolic_interpolation(yin, period);
        let frequency = sample_rate / refined;
        (frequency.is_finite() && frequency > 0.0).then_some(frequency)
    }

    fn name(&self) -> &'static str {
        "yin"
    }
}

/// Refine an integer lag to a fractional one from its neighbours.
///
/// At the edges of the buffer only one neighbour exists; the lower of the two
/// available points is taken instead of fitting a parabola.
fn parabolic_interpolation(yin: &[f32], tau: usize) -> f32 {
    let x0 = if tau < 1 { tau } else { tau - 1 };
    let x2 = if tau + 1 < yin.len() { tau + 1 } else { tau };

    if x0 == tau {
        return if yin[tau] <= yin[x2] { tau as f32 } else { x2 as f32 };
    }
    if x2 == tau {
        return if yin[tau] <= yin[x0] { tau as f32 } else { x0 as f32 };
    }

    let s0 = yin[x0];
    let s1 = yin[tau];
    let s2 = yin[x2];
    let denominator = 2.0 * (2.0 * s1 - s2 - s0);
    if denominator.abs() < f32::EPSILON {
        return tau as f32;
    }
    tau as f32 + (s2 - s0) / denominator
}

/// One-off YIN estimate. Allocates a scratch buffer per call; long-running
/// callers should hold a [`YinPitchDetector`] instead.
pub fn detect_pitch_yin(samples: &[f32], sample_rate: f32, threshold: f32) -> Option<f32> {
    YinPitchDetector::new(threshold).estimate(samples, sample_rate)
}

/// Autocorrelation pitch detector over `[min_frequency, max_frequency]`.
#[derive(Debug, Clone)]
pub struct AutocorrelationPitchDetector {
    min_frequency: f32,
    max_frequency: f32,
}

impl AutocorrelationPitchDetector {
    pub fn new(min_frequency: f32, max_frequency: f32) -> Self {
        Self {
            min_frequency,
            max_frequency,
        }
    }
}

impl PitchEstimator for AutocorrelationPitchDetector {
    fn estimate(&mut self, samples: &[f32], sample_rate: f32) -> Option<f32> {
        detect_pitch_autocorrelation(samples, sample_rate, self.min_frequency, self.max_frequency)
    }

    fn name(&self) -> &'static str {
        "autocorrelation"
    }
}

/// Best-correlating lag in `[sample_rate / max_freq, sample_rate / min_freq]`,
/// converted to Hz.
pub fn detect_pitch_autocorrelation(
    samples: &[f32],
    sample_rate: f32,
    min_freq: f32,
    max_freq: f32,
) -> Option<f32> {
    if [sample_rate, min_freq, max_freq]
        .iter()
        .any(|v| v.is_nan() || *v <= 0.0)
    {
        return None;
    }
    let n = samples.len();
    let min_lag = ((sample_rate / max_freq) as usize).max(1);
    let max_lag = ((sample_rate / min_freq) as usize).min(n.saturating_sub(1));
    if min_lag > max_lag {
        return None;
    }

    let mut best: Option<(usize, f32)> = None;
    for lag in min_lag..=max_lag {
        let sum: f32 = samples[..n - lag]
            .iter()
            .zip(&samples[lag..])
            .map(|(a, b)| a * b)
            .sum();
        let correlation = sum / (n - lag) as f32;

        if best.map_or(true, |(_, c)| correlation > c) {
            best = Some((lag, correlation));
        }
    }

    match best {
        Some((lag, correlation)) if correlation >= MIN_CORRELATION => {
            Some(sample_rate / lag as f32)
        }
        _ => None,
    }
}

/// Runs `primary`, and `fallback` only when the primary finds nothing.
pub struct FallbackPitchDetector {
    primary: Box<dyn PitchEstimator + Send>,
    fallback: Box<dyn PitchEstimator + Send>,
}

impl FallbackPitchDetector {
    pub fn new(
        primary: Box<dyn PitchEstimator + Send>,
        fallback: Box<dyn PitchEstimator + Send>,
    ) -> Self {
        Self { primary, fallback }
    }
}

impl PitchEstimator for FallbackPitchDetector {
    fn estimate(&mut self, samples: &[f32], sample_rate: f32) -> Option<f32> {
        self.primary.estimate(samples, sample_rate).or_else(|| {
            log::trace!(
                "{} found no pitch, trying {}",
                self.primary.name(),
                self.fallback.name()
            );
            self.fallback.estimate(samples, sample_rate)
        })
    }

    fn name(&self) -> &'static str {
        "yin+autocorrelation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_yin_detects_a440() {
        let signal = sine(440.0, 44100.0, 2048, 0.8);
        let pitch = detect_pitch_yin(&signal, 44100.0, 0.1).unwrap();
        assert!((pitch - 440.0).abs() < 4.4, "got {pitch}");
    }

    #[test]
    fn test_yin_across_range() {
        let mut detector = YinPitchDetector::default();
        for &freq in &[110.0, 196.0, 261.63, 523.25, 880.0] {
            let signal = sine(freq, 44100.0, 2048, 0.5);
            let pitch = detector.estimate(&signal, 44100.0).unwrap();
            assert!((pitch - freq).abs() / freq < 0.01, "{freq} Hz detected as {pitch}");
        }
    }

    #[test]
    fn test_silence_yields_no_pitch() {
        let mut detector = YinPitchDetector::default();
        for len in [0, 1, 7, 64, 1024, 2048, 4096] {
            let silence = vec![0.0f32; len];
            assert_eq!(detector.estimate(&silence, 44100.0), None, "len {len}");
            assert_eq!(
                detect_pitch_autocorrelation(&silence, 44100.0, 60.0, 1500.0),
                None,
                "len {len}"
            );
        }
    }

    #[test]
    fn test_yin_rejects_non_finite_input() {
        let mut signal = sine(440.0, 44100.0, 1024, 0.5);
        signal[10] = f32::NAN;
        assert_eq!(detect_pitch_yin(&signal, 44100.0, 0.1), None);
    }

    #[test]
    fn test_yin_reuses_buffer() {
        let mut detector = YinPitchDetector::default();
        let signal = sine(330.0, 48000.0, 2048, 0.5);
        let first = detector.estimate(&signal, 48000.0);
        let capacity = detector.buffer.capacity();
        let second = detector.estimate(&signal, 48000.0);
        assert_eq!(first, second);
        assert_eq!(detector.buffer.capacity(), capacity);
    }

    #[test]
    fn test_parabolic_interpolation_edges() {
        let yin = [0.5, 0.2, 0.3];
        assert_eq!(parabolic_interpolation(&yin, 0), 1.0);
        let yin = [0.5, 0.3, 0.2];
        assert_eq!(parabolic_interpolation(&yin, 2), 2.0);
        // Symmetric neighbours leave the lag where it is.
        let yin = [0.4, 0.1, 0.4];
        assert!((parabolic_interpolation(&yin, 1) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_autocorrelation_detects_a440() {
        let signal = sine(440.0, 44100.0, 2048, 0.8);
        // Keep the lag range within one period so octave lags are excluded.
        let pitch = detect_pitch_autocorrelation(&signal, 44100.0, 300.0, 4000.0).unwrap();
        // Integer lags only: 100 or 101 samples either side of the true 100.23.
        assert!((pitch - 440.0).abs() / 440.0 < 0.015, "got {pitch}");
    }

    #[test]
    fn test_autocorrelation_rejects_weak_signal() {
        let signal = sine(440.0, 44100.0, 2048, 0.05);
        // Peak correlation is ~amplitude²/2 = 0.00125, under the floor.
        assert_eq!(detect_pitch_autocorrelation(&signal, 44100.0, 300.0, 4000.0), None);
    }

    #[test]
    fn test_autocorrelation_empty_lag_range() {
        let signal = sine(440.0, 44100.0, 16, 0.8);
        assert_eq!(detect_pitch_autocorrelation(&signal, 44100.0, 60.0, 100.0), None);
    }

    #[test]
    fn test_fallback_uses_secondary_when_primary_fails() {
        // A threshold no real signal can reach forces YIN to give up.
        let mut detector = FallbackPitchDetector::new(
            Box::new(YinPitchDetector::new(1e-9)),
            Box::new(AutocorrelationPitchDetector::new(300.0, 4000.0)),
        );
        let signal = sine(440.0, 44100.0, 2048, 0.8);
        let pitch = detector.estimate(&signal, 44100.0).unwrap();
        assert!((pitch - 440.0).abs() / 440.0 < 0.015);
        assert_eq!(detector.estimate(&vec![0.0; 2048], 44100.0), None);
    }

    #[test]
    fn test_build_estimator_follows_config() {
        let mut config = PitchConfig::default();
        assert_eq!(build_estimator(&config).name(), "yin");
        config.method = PitchMethod::Autocorrelation;
        assert_eq!(build_estimator(&config).name(), "autocorrelation");
        config.method = PitchMethod::YinWithFallback;
        assert_eq!(build_estimator(&config).name(), "yin+autocorrelation");
    }
}
