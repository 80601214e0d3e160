//! # Resonance
//!
//! Real-time analysis core for a music visualizer. Each frame it turns a
//! time-domain window and its byte-quantized magnitude spectrum into a pitch,
//! the nearest note, seven band energies, spectral peaks and centroid, coarse
//! instrument levels and a beat flag.
//!
//! Decoding, playback and drawing live elsewhere; the core only sees the two
//! buffers per frame plus the session's sample rate and transform size.
//!
//! ```
//! use resonance::audio::NoteName;
//! use resonance::{AnalysisConfig, FrameAnalyzer, SpectrumAnalyzer};
//!
//! let sample_rate = 44100.0;
//! let fft_size = 2048;
//! let mut spectra = SpectrumAnalyzer::new(fft_size)?;
//! let mut analyzer = FrameAnalyzer::new(sample_rate, fft_size, AnalysisConfig::default())?;
//!
//! let window: Vec<f32> = (0..fft_size)
//!     .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate).sin())
//!     .collect();
//! let spectrum = spectra.byte_spectrum(&window);
//!
//! let frame = analyzer.analyze(&window, &spectrum);
//! let note = frame.note.expect("a steady tone has a note");
//! assert_eq!((note.note, note.octave), (NoteName::A, 4));
//! # Ok::<(), resonance::AnalysisError>(())
//! ```

pub mod audio;
pub mod config;
pub mod error;

pub use audio::{AnalysisFrame, FrameAnalyzer, SpectrumAnalyzer};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
