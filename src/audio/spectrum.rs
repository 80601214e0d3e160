//! Pure feature extraction over a byte-quantized magnitude spectrum.
//!
//! Every function here takes the spectrum together with the sample rate and
//! the transform size that produced it, so bin indices can be mapped to Hz.
//! None of them allocate beyond their return value and none of them fail:
//! empty or silent spectra degrade to `None` / zero.

use serde::{Deserialize, Serialize};

/// Peaks and the dominant bin below this magnitude are treated as noise.
pub const DEFAULT_AMPLITUDE_THRESHOLD: u8 = 100;

/// Fixed catalog of named frequency bands, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyBand {
    SubBass,
    Bass,
    LowMid,
    Mid,
    HighMid,
    Presence,
    Brilliance,
}

impl FrequencyBand {
    pub const ALL: [FrequencyBand; 7] = [
        FrequencyBand::SubBass,
        FrequencyBand::Bass,
        FrequencyBand::LowMid,
        FrequencyBand::Mid,
        FrequencyBand::HighMid,
        FrequencyBand::Presence,
        FrequencyBand::Brilliance,
    ];

    /// `(min, max)` edges in Hz. The band covers `[min, max)`.
    pub const fn range(self) -> (f32, f32) {
        match self {
            FrequencyBand::SubBass => (20.0, 60.0),
            FrequencyBand::Bass => (60.0, 250.0),
            FrequencyBand::LowMid => (250.0, 500.0),
            FrequencyBand::Mid => (500.0, 2000.0),
            FrequencyBand::HighMid => (2000.0, 4000.0),
            FrequencyBand::Presence => (4000.0, 6000.0),
            FrequencyBand::Brilliance => (6000.0, 20000.0),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            FrequencyBand::SubBass => "subBass",
            FrequencyBand::Bass => "bass",
            FrequencyBand::LowMid => "lowMid",
            FrequencyBand::Mid => "mid",
            FrequencyBand::HighMid => "highMid",
            FrequencyBand::Presence => "presence",
            FrequencyBand::Brilliance => "brilliance",
        }
    }
}

/// Average magnitude per band for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandEnergies {
    pub sub_bass: f32,
    pub bass: f32,
    pub low_mid: f32,
    pub mid: f32,
    pub high_mid: f32,
    pub presence: f32,
    pub brilliance: f32,
}

impl BandEnergies {
    pub fn get(&self, band: FrequencyBand) -> f32 {
        match band {
            FrequencyBand::SubBass => self.sub_bass,
            FrequencyBand::Bass => self.bass,
            FrequencyBand::LowMid => self.low_mid,
            FrequencyBand::Mid => self.mid,
            FrequencyBand::HighMid => self.high_mid,
            FrequencyBand::Presence => self.presence,
            FrequencyBand::Brilliance => self.brilliance,
        }
    }

    fn set(&mut self, band: FrequencyBand, energy: f32) {
        let slot = match band {
            FrequencyBand::SubBass => &mut self.sub_bass,
            FrequencyBand::Bass => &mut self.bass,
            FrequencyBand::LowMid => &mut self.low_mid,
            FrequencyBand::Mid => &mut self.mid,
            FrequencyBand::HighMid => &mut self.high_mid,
            FrequencyBand::Presence => &mut self.presence,
            FrequencyBand::Brilliance => &mut self.brilliance,
        };
        *slot = energy;
    }

    /// Bands in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (FrequencyBand, f32)> + '_ {
        FrequencyBand::ALL.iter().map(move |&band| (band, self.get(band)))
    }
}

/// A local maximum in the spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyPeak {
    pub frequency: f32,
    pub amplitude: u8,
}

/// Search window and limits for [`frequency_peaks`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakSearch {
    pub count: usize,
    pub min_frequency: f32,
    pub max_frequency: f32,
    pub threshold: u8,
}

impl Default for PeakSearch {
    fn default() -> Self {
        Self {
            count: 5,
            min_frequency: 80.0,
            max_frequency: 4000.0,
            threshold: DEFAULT_AMPLITUDE_THRESHOLD,
        }
    }
}

pub fn bin_to_frequency(bin: usize, sample_rate: f32, fft_size: usize) -> f32 {
    bin as f32 * sample_rate / fft_size as f32
}

/// Nearest bin for `freq`. Negative and non-finite inputs saturate to bin 0.
pub fn frequency_to_bin(freq: f32, sample_rate: f32, fft_size: usize) -> usize {
    // `as` saturates: NaN and negatives land on 0.
    (freq * fft_size as f32 / sample_rate).round() as usize
}

/// Bin range `[bin(min), bin(max))` clipped to the spectrum.
fn bin_range(
    len: usize,
    sample_rate: f32,
    fft_size: usize,
    min_freq: f32,
    max_freq: f32,
) -> std::ops::Range<usize> {
    let start = frequency_to_bin(min_freq, sample_rate, fft_size).min(len);
    let end = frequency_to_bin(max_freq, sample_rate, fft_size).min(len);
    start..end.max(start)
}

/// Frequency of the loudest bin in `[min_freq, max_freq)`.
///
/// Returns `None` when the range is empty or its loudest bin is below
/// [`DEFAULT_AMPLITUDE_THRESHOLD`]. Equal maxima resolve to the lowest bin.
pub fn dominant_frequency(
    spectrum: &[u8],
    sample_rate: f32,
    fft_size: usize,
    min_freq: f32,
    max_freq: f32,
) -> Option<f32> {
    dominant_frequency_above(
        spectrum,
        sample_rate,
        fft_size,
        min_freq,
        max_freq,
        DEFAULT_AMPLITUDE_THRESHOLD,
    )
}

/// [`dominant_frequency`] with an explicit noise threshold.
pub fn dominant_frequency_above(
    spectrum: &[u8],
    sample_rate: f32,
    fft_size: usize,
    min_freq: f32,
    max_freq: f32,
    threshold: u8,
) -> Option<f32> {
    let range = bin_range(spectrum.len(), sample_rate, fft_size, min_freq, max_freq);
    let offset = range.start;

    let mut best: Option<(usize, u8)> = None;
    for (i, &magnitude) in spectrum[range].iter().enumerate() {
        match best {
            Some((_, max)) if magnitude <= max => {}
            _ => best = Some((offset + i, magnitude)),
        }
    }

    match best {
        Some((bin, magnitude)) if magnitude >= threshold => {
            Some(bin_to_frequency(bin, sample_rate, fft_size))
        }
        _ => None,
    }
}

/// Up to `search.count` local maxima, loudest first.
///
/// A bin qualifies when it is strictly inside the scan range, louder than
/// both neighbours and louder than `search.threshold`. The sort is stable, so
/// peaks of equal amplitude come out in ascending frequency order.
pub fn frequency_peaks(
    spectrum: &[u8],
    sample_rate: f32,
    fft_size: usize,
    search: &PeakSearch,
) -> Vec<FrequencyPeak> {
    let range = bin_range(
        spectrum.len(),
        sample_rate,
        fft_size,
        search.min_frequency,
        search.max_frequency,
    );
    if range.len() < 3 {
        return Vec::new();
    }

    let mut peaks: Vec<FrequencyPeak> = (range.start + 1..range.end - 1)
        .filter(|&i| {
            let magnitude = spectrum[i];
            magnitude > spectrum[i - 1] && magnitude > spectrum[i + 1] && magnitude > search.threshold
        })
        .map(|i| FrequencyPeak {
            frequency: bin_to_frequency(i, sample_rate, fft_size),
            amplitude: spectrum[i],
        })
        .collect();

    peaks.sort_by(|a, b| b.amplitude.cmp(&a.amplitude));
    peaks.truncate(search.count);
    peaks
}

/// Magnitude-weighted mean frequency over the whole spectrum; 0 for silence.
pub fn spectral_centroid(spectrum: &[u8], sample_rate: f32, fft_size: usize) -> f32 {
    let mut weighted_sum = 0.0f64;
    let mut magnitude_sum = 0.0f64;

    for (i, &magnitude) in spectrum.iter().enumerate() {
        let frequency = bin_to_frequency(i, sample_rate, fft_size) as f64;
        weighted_sum += frequency * magnitude as f64;
        magnitude_sum += magnitude as f64;
    }

    if magnitude_sum > 0.0 {
        (weighted_sum / magnitude_sum) as f32
    } else {
        0.0
    }
}

/// Mean magnitude of each band's bins. Bands with no bins report 0.
pub fn band_energies(spectrum: &[u8], sample_rate: f32, fft_size: usize) -> BandEnergies {
    let mut energies = BandEnergies::default();
    for band in FrequencyBand::ALL {
        let (min, max) = band.range();
        let range = bin_range(spectrum.len(), sample_rate, fft_size, min, max);
        energies.set(band, average_range(&spectrum[range]));
    }
    energies
}

fn average_range(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u32 = bins.iter().map(|&b| b as u32).sum();
    sum as f32 / bins.len() as f32
}
