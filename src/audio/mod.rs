pub mod analyzer;
pub mod beat_detector;
pub mod fft;
pub mod instrument;
pub mod note;
pub mod pitch;
pub mod spectrum;

pub use analyzer::{AnalysisFrame, FrameAnalyzer};
pub use beat_detector::{BeatDetector, BeatState};
pub use fft::SpectrumAnalyzer;
pub use instrument::{Instrument, InstrumentEstimator, InstrumentLevels};
pub use note::{frequency_to_note, note_to_frequency, NoteInfo, NoteName};
pub use pitch::{
    detect_pitch_autocorrelation, detect_pitch_yin, AutocorrelationPitchDetector,
    FallbackPitchDetector, PitchEstimator, YinPitchDetector,
};
pub use spectrum::{BandEnergies, FrequencyBand, FrequencyPeak, PeakSearch};
