use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::BeatConfig;

/// Fraction of the spectrum (from the bottom) treated as the bass region.
const BASS_FRACTION: f32 = 0.1;

/// Beat flag plus the energies that produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatState {
    pub is_beat: bool,
    pub energy: f32,
    pub average_energy: f32,
}

/// Energy-history beat detector.
///
/// Keeps the last `history_size` bass energies and flags a beat when the
/// current energy clears both the rolling average (scaled by `sensitivity`)
/// and an absolute floor. The history is order-sensitive: feed frames in
/// playback order and call [`reset`](Self::reset) after a seek or track change.
pub struct BeatDetector {
    history: VecDeque<f32>,
    history_size: usize,
    sensitivity: f32,
    energy_floor: f32,
}

impl BeatDetector {
    pub fn new(config: &BeatConfig) -> Self {
        let history_size = config.history_size.max(1);
        Self {
            history: VecDeque::with_capacity(history_size),
            history_size,
            sensitivity: config.sensitivity,
            energy_floor: config.energy_floor,
        }
    }

    pub fn detect_beat(&mut self, spectrum: &[u8]) -> BeatState {
        let bass_range = (spectrum.len() as f32 * BASS_FRACTION) as usize;
        if bass_range == 0 {
            // Nothing to measure; leave the history alone.
            return BeatState {
                is_beat: false,
                energy: 0.0,
                average_energy: self.average_energy(),
            };
        }

        let energy = Self::rms(&spectrum[..bass_range]);

        self.history.push_back(energy);
        if self.history.len() > self.history_size {
            self.history.pop_front();
        }

        let average_energy = self.average_energy();
        let is_beat = energy > average_energy * self.sensitivity && energy > self.energy_floor;

        if is_beat {
            log::trace!("beat: energy {:.1} vs average {:.1}", energy, average_energy);
        }

        BeatState {
            is_beat,
            energy,
            average_energy,
        }
    }

    /// Forget all energy history.
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn average_energy(&self) -> f32 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().sum::<f32>() / self.history.len() as f32
    }

    fn rms(bins: &[u8]) -> f32 {
        let sum_sq: f32 = bins.iter().map(|&b| (b as f32) * (b as f32)).sum();
        (sum_sq / bins.len() as f32).sqrt()
    }
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new(&BeatConfig::default())
    }
}
