//! # Note Mapping
//!
//! Conversion between frequencies and equal-tempered note names, using
//! A4 = 440 Hz as the reference.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reference pitch for A4.
pub const A4_FREQUENCY: f32 = 440.0;

/// Semitone index of A within an octave starting at C.
const A_INDEX: i32 = 9;

/// Pitch class, named with sharps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NoteName {
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
}

impl NoteName {
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::CSharp,
        NoteName::D,
        NoteName::DSharp,
        NoteName::E,
        NoteName::F,
        NoteName::FSharp,
        NoteName::G,
        NoteName::GSharp,
        NoteName::A,
        NoteName::ASharp,
        NoteName::B,
    ];

    /// Semitones above C (0..12).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::A => "A",
            NoteName::ASharp => "A#",
            NoteName::B => "B",
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a note name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseNoteError(String);

impl fmt::Display for ParseNoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised note name: {:?}", self.0)
    }
}

impl std::error::Error for ParseNoteError {}

impl FromStr for NoteName {
    type Err = ParseNoteError;

    /// Accepts sharps (`C#`) and flats (`Db`, `Cb`, `Fb`); enharmonics map to
    /// the sharp spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let letter = chars.next().ok_or_else(|| ParseNoteError(s.to_string()))?;
        let natural: i32 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(ParseNoteError(s.to_string())),
        };
        let accidental = match chars.as_str() {
            "" => 0,
            "#" | "♯" => 1,
            "b" | "♭" => -1,
            _ => return Err(ParseNoteError(s.to_string())),
        };
        Ok(Self::from_index((natural + accidental).rem_euclid(12) as usize))
    }
}

/// Nearest equal-tempered note for a frequency, with the deviation from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteInfo {
    pub note: NoteName,
    pub octave: i32,
    /// Deviation from the note's centre, roughly -50..=50.
    pub cents: i32,
}

impl NoteInfo {
    /// MIDI note number (A4 = 69).
    pub fn midi_number(&self) -> i32 {
        (self.octave + 1) * 12 + self.note.index() as i32
    }

    /// Centre frequency of the note, ignoring `cents`.
    pub fn frequency(&self) -> f32 {
        note_to_frequency(self.note, self.octave)
    }
}

impl fmt::Display for NoteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {:+}¢", self.note, self.octave, self.cents)
    }
}

/// Nearest note to `freq`. `None` for non-positive or non-finite input.
pub fn frequency_to_note(freq: f32) -> Option<NoteInfo> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }

    let semitones = 12.0 * (freq / A4_FREQUENCY).log2();
    let rounded = semitones.round();
    let cents = ((semitones - rounded) * 100.0).round() as i32;

    let from_c = rounded as i32 + A_INDEX;
    Some(NoteInfo {
        note: NoteName::from_index(from_c.rem_euclid(12) as usize),
        octave: from_c.div_euclid(12) + 4,
        cents,
    })
}

/// Equal-tempered frequency of `note` in `octave`.
pub fn note_to_frequency(note: NoteName, octave: i32) -> f32 {
    let offset = note.index() as i32 - A_INDEX + (octave - 4) * 12;
    A4_FREQUENCY * 2.0_f32.powf(offset as f32 / 12.0)
}
