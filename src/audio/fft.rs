use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::error::AnalysisError;

/// Produces byte-quantized magnitude spectra from time-domain windows.
///
/// This mirrors what a playback transport's analyser node hands the core:
/// Hann window, forward FFT, magnitudes scaled by `1/n`, exponential smoothing
/// across frames, then decibels mapped linearly onto `0..=255` between
/// `min_decibels` and `max_decibels`. The analysis core only consumes the
/// resulting bytes; tools and tests use this to feed it from raw samples.
pub struct SpectrumAnalyzer {
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
}

impl SpectrumAnalyzer {
    pub const DEFAULT_SMOOTHING: f32 = 0.8;
    pub const DEFAULT_MIN_DECIBELS: f32 = -100.0;
    pub const DEFAULT_MAX_DECIBELS: f32 = -30.0;

    pub fn new(fft_size: usize) -> Result<Self, AnalysisError> {
        if fft_size < 4 || !fft_size.is_power_of_two() {
            return Err(AnalysisError::InvalidTransformSize(fft_size));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Ok(Self {
            fft_size,
            fft,
            window: Self::hann_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
            smoothing: Self::DEFAULT_SMOOTHING,
            min_decibels: Self::DEFAULT_MIN_DECIBELS,
            max_decibels: Self::DEFAULT_MAX_DECIBELS,
        })
    }

    /// Time constant in `[0, 1)`; 0 disables smoothing.
    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = smoothing.clamp(0.0, 0.999);
        self
    }

    pub fn with_decibel_range(mut self, min_decibels: f32, max_decibels: f32) -> Self {
        if min_decibels < max_decibels {
            self.min_decibels = min_decibels;
            self.max_decibels = max_decibels;
        }
        self
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins written by [`process`](Self::process).
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    fn hann_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect()
    }

    /// Fill `out` (length `fft_size / 2`) from `samples`.
    ///
    /// Shorter inputs are zero-padded, longer ones truncated to the transform size.
    pub fn process(&mut self, samples: &[f32], out: &mut [u8]) -> Result<(), AnalysisError> {
        if out.len() != self.bin_count() {
            return Err(AnalysisError::SpectrumLength {
                expected: self.bin_count(),
                got: out.len(),
            });
        }

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f32;
        let range = self.max_decibels - self.min_decibels;
        for ((bin, smoothed), byte) in self
            .buffer
            .iter()
            .zip(self.smoothed.iter_mut())
            .zip(out.iter_mut())
        {
            let magnitude = bin.norm() * scale;
            *smoothed = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;

            let decibels = 20.0 * smoothed.log10();
            let scaled = 255.0 * (decibels - self.min_decibels) / range;
            // -inf dB (exact silence) and NaN both fall to 0 here.
            *byte = if scaled.is_finite() {
                scaled.clamp(0.0, 255.0) as u8
            } else if scaled > 0.0 {
                255
            } else {
                0
            };
        }

        Ok(())
    }

    /// Convenience wrapper around [`process`](Self::process) that allocates the output.
    pub fn byte_spectrum(&mut self, samples: &[f32]) -> Vec<u8> {
        let mut out = vec![0u8; self.bin_count()];
        // Output length is always bin_count, so this cannot fail.
        let _ = self.process(samples, &mut out);
        out
    }

    /// Forget smoothing memory, e.g. after a seek.
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|s| *s = 0.0);
    }
}
