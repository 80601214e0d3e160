//! Error types for the analysis core

use thiserror::Error;

/// Errors surfaced by session setup and by [`FrameAnalyzer::try_analyze`].
///
/// The per-frame path ([`FrameAnalyzer::analyze`]) never returns these; it logs
/// them and degrades to an idle frame instead.
///
/// [`FrameAnalyzer::try_analyze`]: crate::audio::FrameAnalyzer::try_analyze
/// [`FrameAnalyzer::analyze`]: crate::audio::FrameAnalyzer::analyze
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A tunable is out of range (non-positive, non-finite, inverted range).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Sample rate must be a positive, finite number of Hz.
    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(f32),

    /// Transform size must be a power of two of at least 4 samples.
    #[error("invalid transform size: {0} (expected a power of two >= 4)")]
    InvalidTransformSize(usize),

    /// The time-domain window does not match the session's transform size.
    #[error("time-domain window has {got} samples, expected {expected}")]
    WindowLength { expected: usize, got: usize },

    /// The magnitude spectrum does not match half the session's transform size.
    #[error("spectrum has {got} bins, expected {expected}")]
    SpectrumLength { expected: usize, got: usize },

    /// Reading or writing a configuration file failed.
    #[error("configuration I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file is not valid JSON for [`AnalysisConfig`](crate::AnalysisConfig).
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}
