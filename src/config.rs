use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AnalysisError;

/// Which time-domain method produces the per-frame pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PitchMethod {
    /// YIN with parabolic refinement.
    Yin,
    /// Normalized autocorrelation over the configured frequency range.
    Autocorrelation,
    /// YIN first; autocorrelation only when YIN finds nothing.
    YinWithFallback,
}

/// Pitch detection tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    pub method: PitchMethod,
    /// Absolute threshold on the cumulative mean normalized difference.
    pub yin_threshold: f32,
    /// Lowest frequency the autocorrelation search considers (Hz).
    pub min_frequency: f32,
    /// Highest frequency the autocorrelation search considers (Hz).
    pub max_frequency: f32,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            method: PitchMethod::Yin,
            yin_threshold: 0.1,
            min_frequency: 60.0,
            max_frequency: 1500.0,
        }
    }
}

/// Spectral peak picking tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    pub min_frequency: f32,
    pub max_frequency: f32,
    /// Byte magnitude the dominant bin must reach to count as a pitch.
    pub dominant_threshold: u8,
    pub peak_count: usize,
    /// Byte magnitude a local maximum must exceed to count as a peak.
    pub peak_threshold: u8,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            min_frequency: 80.0,
            max_frequency: 4000.0,
            dominant_threshold: 100,
            peak_count: 5,
            peak_threshold: 100,
        }
    }
}

/// Beat detection tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatConfig {
    /// Rolling window length in frames.
    pub history_size: usize,
    /// How far above the rolling average the current energy must be.
    pub sensitivity: f32,
    /// Absolute energy floor; quieter frames never count as beats.
    pub energy_floor: f32,
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            history_size: 43,
            sensitivity: 1.3,
            energy_floor: 50.0,
        }
    }
}

/// Instrument estimation tunables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Band energy that maps to a level of 1.0. Empirical.
    pub level_ceiling: f32,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self { level_ceiling: 180.0 }
    }
}

/// Complete set of analysis tunables for one session.
///
/// Defaults reproduce the calibrated behaviour; any subset of fields can be
/// overridden from JSON and the rest fall back to their defaults:
///
/// ```
/// use resonance::AnalysisConfig;
///
/// let config: AnalysisConfig =
///     serde_json::from_str(r#"{ "beat": { "sensitivity": 1.5 } }"#).unwrap();
/// assert_eq!(config.beat.sensitivity, 1.5);
/// assert_eq!(config.beat.history_size, 43);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub pitch: PitchConfig,
    pub spectrum: SpectrumConfig,
    pub beat: BeatConfig,
    pub instrument: InstrumentConfig,
}

impl AnalysisConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AnalysisError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), AnalysisError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject tunables that would make the analysis meaningless.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        positive("pitch.yin_threshold", self.pitch.yin_threshold)?;
        frequency_range(
            "pitch",
            self.pitch.min_frequency,
            self.pitch.max_frequency,
        )?;
        frequency_range(
            "spectrum",
            self.spectrum.min_frequency,
            self.spectrum.max_frequency,
        )?;
        if self.beat.history_size == 0 {
            return Err(AnalysisError::InvalidConfig(
                "beat.history_size must be at least 1".to_string(),
            ));
        }
        positive("beat.sensitivity", self.beat.sensitivity)?;
        if !self.beat.energy_floor.is_finite() || self.beat.energy_floor < 0.0 {
            return Err(AnalysisError::InvalidConfig(format!(
                "beat.energy_floor must be finite and >= 0, got {}",
                self.beat.energy_floor
            )));
        }
        positive("instrument.level_ceiling", self.instrument.level_ceiling)?;
        Ok(())
    }
}

fn positive(name: &str, value: f32) -> Result<(), AnalysisError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidConfig(format!(
            "{name} must be finite and > 0, got {value}"
        )))
    }
}

fn frequency_range(name: &str, min: f32, max: f32) -> Result<(), AnalysisError> {
    positive(&format!("{name}.min_frequency"), min)?;
    positive(&format!("{name}.max_frequency"), max)?;
    if min >= max {
        return Err(AnalysisError::InvalidConfig(format!(
            "{name} frequency range is empty: {min} Hz >= {max} Hz"
        )));
    }
    Ok(())
}
