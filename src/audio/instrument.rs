//! Coarse "which instruments are sounding" estimate from band energies.
//!
//! Each instrument tag is a fixed set of one to three bands where that kind of
//! source concentrates its energy. A tag's level is the mean of its bands'
//! energies divided by an empirical ceiling and clamped to 1. This is a visual
//! cue, not source separation: overlapping tags light up together.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::spectrum::{BandEnergies, FrequencyBand};
use crate::config::InstrumentConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    Kick,
    Bass,
    Snare,
    Guitar,
    Piano,
    Vocal,
    Synth,
    HiHat,
    Cymbal,
}

impl Instrument {
    pub const COUNT: usize = 9;

    pub const ALL: [Instrument; Self::COUNT] = [
        Instrument::Kick,
        Instrument::Bass,
        Instrument::Snare,
        Instrument::Guitar,
        Instrument::Piano,
        Instrument::Vocal,
        Instrument::Synth,
        Instrument::HiHat,
        Instrument::Cymbal,
    ];

    pub fn bands(self) -> &'static [FrequencyBand] {
        use FrequencyBand::*;
        match self {
            Instrument::Kick => &[SubBass, Bass],
            Instrument::Bass => &[Bass, LowMid],
            Instrument::Snare => &[LowMid, Mid, HighMid],
            Instrument::Guitar => &[LowMid, Mid],
            Instrument::Piano => &[LowMid, Mid, HighMid],
            Instrument::Vocal => &[Mid, HighMid],
            Instrument::Synth => &[Mid, HighMid, Presence],
            Instrument::HiHat => &[Presence, Brilliance],
            Instrument::Cymbal => &[HighMid, Presence, Brilliance],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Instrument::Kick => "kick",
            Instrument::Bass => "bass",
            Instrument::Snare => "snare",
            Instrument::Guitar => "guitar",
            Instrument::Piano => "piano",
            Instrument::Vocal => "vocal",
            Instrument::Synth => "synth",
            Instrument::HiHat => "hihat",
            Instrument::Cymbal => "cymbal",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Per-instrument levels in `[0, 1]`. Serializes as a `{ "kick": 0.4, ... }` map.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InstrumentLevels {
    levels: [f32; Instrument::COUNT],
}

impl InstrumentLevels {
    pub fn get(&self, instrument: Instrument) -> f32 {
        self.levels[instrument.slot()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Instrument, f32)> + '_ {
        Instrument::ALL
            .iter()
            .map(move |&instrument| (instrument, self.get(instrument)))
    }

    /// The loudest instrument, if any is above zero.
    pub fn strongest(&self) -> Option<(Instrument, f32)> {
        self.iter()
            .filter(|&(_, level)| level > 0.0)
            .fold(None, |best, candidate| match best {
                Some((_, level)) if level >= candidate.1 => best,
                _ => Some(candidate),
            })
    }
}

impl Serialize for InstrumentLevels {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Instrument::COUNT))?;
        for (instrument, level) in self.iter() {
            map.serialize_entry(instrument.name(), &level)?;
        }
        map.end()
    }
}

pub struct InstrumentEstimator {
    level_ceiling: f32,
}

impl InstrumentEstimator {
    pub fn new(config: &InstrumentConfig) -> Self {
        Self {
            level_ceiling: config.level_ceiling,
        }
    }

    /// Levels for the current frame. `None` (nothing playing) yields all zeros.
    pub fn estimate(&self, bands: Option<&BandEnergies>) -> InstrumentLevels {
        let mut levels = InstrumentLevels::default();
        let Some(bands) = bands else {
            return levels;
        };

        for instrument in Instrument::ALL {
            let tag_bands = instrument.bands();
            let mean = tag_bands.iter().map(|&band| bands.get(band)).sum::<f32>()
                / tag_bands.len() as f32;
            levels.levels[instrument.slot()] = (mean / self.level_ceiling).clamp(0.0, 1.0);
        }
        levels
    }
}

impl Default for InstrumentEstimator {
    fn default() -> Self {
        Self::new(&InstrumentConfig::default())
    }
}
