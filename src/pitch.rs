// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Pitches in standard notation and their frequencies.

use std::fmt;
use std::str::FromStr;

use snafu::Snafu;

use crate::util::from_semitones;

/// Octave of pitches that don't name one.
pub const DEFAULT_OCTAVE: i32 = 4;

/// Highest octave accepted when parsing, well above the audible range.
pub const MAX_OCTAVE: i32 = 10;

/// Spelling of the twelve semitones of an octave, starting at A.
const CHROMATIC: [(NoteName, Accidental); 12] = [
    (NoteName::A, Accidental::Natural),
    (NoteName::B, Accidental::Flat(1)),
    (NoteName::B, Accidental::Natural),
    (NoteName::C, Accidental::Natural),
    (NoteName::C, Accidental::Sharp(1)),
    (NoteName::D, Accidental::Natural),
    (NoteName::E, Accidental::Flat(1)),
    (NoteName::E, Accidental::Natural),
    (NoteName::F, Accidental::Natural),
    (NoteName::F, Accidental::Sharp(1)),
    (NoteName::G, Accidental::Natural),
    (NoteName::G, Accidental::Sharp(1)),
];

/// The name of a note in standard notation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NoteName {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

impl NoteName {
    pub fn from_char(letter: char) -> Option<NoteName> {
        match letter {
            'A' => Some(NoteName::A),
            'B' => Some(NoteName::B),
            'C' => Some(NoteName::C),
            'D' => Some(NoteName::D),
            'E' => Some(NoteName::E),
            'F' => Some(NoteName::F),
            'G' => Some(NoteName::G),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            NoteName::A => 'A',
            NoteName::B => 'B',
            NoteName::C => 'C',
            NoteName::D => 'D',
            NoteName::E => 'E',
            NoteName::F => 'F',
            NoteName::G => 'G',
        }
    }

    /// Semitones above the A that starts the note name cycle.
    fn semitones_above_a(self) -> i32 {
        match self {
            NoteName::A => 0,
            NoteName::B => 2,
            NoteName::C => 3,
            NoteName::D => 5,
            NoteName::E => 7,
            NoteName::F => 8,
            NoteName::G => 10,
        }
    }

    /// Octave numbers change at C, so C to G belong to the octave of the A above them.
    fn is_below_a(self) -> bool {
        !matches!(self, NoteName::A | NoteName::B)
    }
}

/// Sharps or flats applied to a note. A note has either kind, never both.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Accidental {
    Natural,
    Sharp(u32),
    Flat(u32),
}

impl Accidental {
    /// Offset in semitones.
    pub fn semitones(self) -> i32 {
        match self {
            Accidental::Natural => 0,
            Accidental::Sharp(n) => n as i32,
            Accidental::Flat(n) => -(n as i32),
        }
    }
}

/// A note name with accidentals and octave in scientific pitch notation, e.g. `C#5`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub name: NoteName,
    pub accidental: Accidental,
    pub octave: i32,
}

impl Pitch {
    pub fn new(name: NoteName, accidental: Accidental, octave: i32) -> Self {
        Self {
            name,
            accidental,
            octave,
        }
    }

    /// Signed distance from A4 in semitones.
    ///
    /// ```
    /// use sigsynth::pitch::Pitch;
    ///
    /// let halfsteps = |p: &str| p.parse::<Pitch>().unwrap().halfsteps();
    /// assert_eq!(halfsteps("A4"), 0);
    /// assert_eq!(halfsteps("C5"), 3);
    /// assert_eq!(halfsteps("C4"), -9);
    /// assert_eq!(halfsteps("Bb3"), -11);
    /// assert_eq!(halfsteps("G##4"), 0);
    /// ```
    pub fn halfsteps(self) -> i32 {
        let octave_start = if self.name.is_below_a() { 12 } else { 0 };
        self.name.semitones_above_a() + self.accidental.semitones() + 12 * (self.octave - 4)
            - octave_start
    }

    /// Frequency in concert tuning.
    pub fn frequency(self) -> f64 {
        Tuning::default().frequency(self)
    }

    /// Move the pitch by some semitones, spelling the result with at most one
    /// accidental, as in `A Bb B C C# D Eb E F F# G G#`.
    ///
    /// ```
    /// use sigsynth::pitch::Pitch;
    ///
    /// let up = |p: &str, n| p.parse::<Pitch>().unwrap().transpose(n).to_string();
    /// assert_eq!(up("A4", 3), "C5");
    /// assert_eq!(up("G4", 2), "A4");
    /// assert_eq!(up("C4", -1), "B3");
    /// assert_eq!(up("Db4", 0), "C#4");
    /// ```
    pub fn transpose(self, halfsteps: i32) -> Pitch {
        let target = self.halfsteps() + halfsteps;
        let (name, accidental) = CHROMATIC[target.rem_euclid(12) as usize];
        let mut octave = DEFAULT_OCTAVE + target.div_euclid(12);
        if name.is_below_a() {
            octave += 1;
        }
        Pitch::new(name, accidental, octave)
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name.letter())?;
        let (symbol, count) = match self.accidental {
            Accidental::Natural => ("", 0),
            Accidental::Sharp(n) => ("#", n),
            Accidental::Flat(n) => ("b", n),
        };
        for _ in 0..count {
            f.write_str(symbol)?;
        }
        write!(f, "{}", self.octave)
    }
}

/// Errors when parsing a pitch.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParsePitchError {
    #[snafu(display("Empty pitch"))]
    Empty,
    #[snafu(display("{:?} is not a note name", letter))]
    InvalidName { letter: char },
    #[snafu(display("Invalid octave {:?}", text))]
    InvalidOctave { text: String },
}

/// Parses `<letter><accidentals><octave>` where the letter is an uppercase `A` to `G`,
/// accidentals are a run of either `#` or `b`, and the octave is optional.
///
/// ```
/// use sigsynth::pitch::*;
///
/// assert_eq!("C#5".parse(), Ok(Pitch::new(NoteName::C, Accidental::Sharp(1), 5)));
/// assert_eq!("Ebb".parse(), Ok(Pitch::new(NoteName::E, Accidental::Flat(2), 4)));
/// assert!("H4".parse::<Pitch>().is_err());
/// assert!("C#b4".parse::<Pitch>().is_err());
/// ```
impl FromStr for Pitch {
    type Err = ParsePitchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let letter = chars.next().ok_or(ParsePitchError::Empty)?;
        let name = NoteName::from_char(letter).ok_or(ParsePitchError::InvalidName { letter })?;

        let rest = chars.as_str();
        let sharps = rest.len() - rest.trim_start_matches('#').len();
        let flats = rest.len() - rest.trim_start_matches('b').len();
        let accidental = match (sharps, flats) {
            (0, 0) => Accidental::Natural,
            (n, 0) => Accidental::Sharp(n as u32),
            (_, n) => Accidental::Flat(n as u32),
        };

        let octave_text = &rest[sharps + flats..];
        let octave = if octave_text.is_empty() {
            DEFAULT_OCTAVE
        } else if octave_text.bytes().all(|b| b.is_ascii_digit()) {
            match octave_text.parse::<i32>() {
                Ok(octave) if octave <= MAX_OCTAVE => octave,
                _ => {
                    return Err(ParsePitchError::InvalidOctave {
                        text: octave_text.to_string(),
                    })
                }
            }
        } else {
            return Err(ParsePitchError::InvalidOctave {
                text: octave_text.to_string(),
            });
        };
        Ok(Pitch::new(name, accidental, octave))
    }
}

/// Assigns frequencies to pitches, with twelve equal semitones per octave.
///
/// # Examples
///
/// ```
/// use sigsynth::pitch::*;
///
/// let tuning = Tuning::default();
/// assert_eq!(tuning.frequency("A3".parse().unwrap()), 220.0);
/// assert_eq!(tuning.frequency("A5".parse().unwrap()), 880.0);
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tuning {
    /// Frequency of A4.
    pub reference_frequency: f64,
}

impl Tuning {
    pub fn frequency(&self, pitch: Pitch) -> f64 {
        self.reference_frequency * from_semitones(pitch.halfsteps() as f64)
    }
}

/// Concert tuning, where A4 is 440 Hz.
impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            reference_frequency: 440.0,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use float_cmp::approx_eq;

    fn frequency(pitch: &str) -> f64 {
        pitch.parse::<Pitch>().unwrap().frequency()
    }

    #[test]
    fn frequencies() {
        assert_eq!(frequency("A4"), 440.0);
        assert_eq!(frequency("A"), 440.0);
        assert!(approx_eq!(f64, frequency("B4"), 493.883, epsilon = 1e-3));
        assert!(approx_eq!(f64, frequency("C5"), 523.251, epsilon = 1e-3));
        assert!(approx_eq!(f64, frequency("C4"), 261.626, epsilon = 1e-3));
        assert!(approx_eq!(f64, frequency("G#4"), frequency("Ab4"), epsilon = 1e-9));
        assert!(approx_eq!(f64, frequency("B#3"), frequency("C4"), epsilon = 1e-9));
    }

    #[test]
    fn parse_errors() {
        assert_eq!("".parse::<Pitch>(), Err(ParsePitchError::Empty));
        assert_eq!(
            "a4".parse::<Pitch>(),
            Err(ParsePitchError::InvalidName { letter: 'a' })
        );
        assert_eq!(
            "C4x".parse::<Pitch>(),
            Err(ParsePitchError::InvalidOctave {
                text: "4x".to_string()
            })
        );
        assert!("C-1".parse::<Pitch>().is_err());
        assert_eq!(
            "A11".parse::<Pitch>(),
            Err(ParsePitchError::InvalidOctave {
                text: "11".to_string()
            })
        );
        assert!("A200000000".parse::<Pitch>().is_err());
        assert!("A99999999999999999999".parse::<Pitch>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for text in &["A4", "C#5", "Bbb2", "G0", "F##10"] {
            assert_eq!(&text.parse::<Pitch>().unwrap().to_string(), text);
        }
    }

    #[test]
    fn transpose_carries_octaves() {
        let a4: Pitch = "A4".parse().unwrap();
        assert_eq!(a4.transpose(12).to_string(), "A5");
        assert_eq!(a4.transpose(-13).to_string(), "G#3");
        assert_eq!(a4.transpose(1).to_string(), "Bb4");
        assert_eq!(a4.transpose(-9).to_string(), "C4");
        for n in -30..30 {
            assert_eq!(a4.transpose(n).halfsteps(), n);
        }
    }
}
