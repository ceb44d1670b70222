// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! A compact text notation for melodies.
//!
//! A piano roll is a whitespace separated list of tokens:
//!
//! - `A4`, `C#5/8`, `Bb/2.`: a note, with optional octave (default 4),
//!   optional duration `/N` meaning `1/N` bar, and optional dots.
//! - `;`, `;/8`: a rest with the same duration syntax.
//! - `/N`: change the duration of notes that don't specify one (initially `1/4`).
//!
//! Each dot extends a note by a fraction of the previous extension:
//! `.` by a half, `:` by a quarter and `!` by an eighth.
//! So `/4.` lasts `1/4 + 1/8` and `/4..` lasts `1/4 + 1/8 + 1/16`.
//! Tokens that don't follow this syntax are skipped.

use log::debug;
use snafu::Snafu;

use crate::pitch::Pitch;
use crate::rational::Rational;
use crate::sequencer::Event;

/// Duration of notes before the first `/N` token.
pub fn default_duration() -> Rational {
    Rational::nth(4)
}

/// A note or rest with its duration in bars.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Note {
    /// The pitch, or `None` for a rest.
    pub pitch: Option<Pitch>,
    pub duration: Rational,
}

impl Note {
    pub fn frequency(&self) -> Option<f64> {
        self.pitch.map(Pitch::frequency)
    }

    pub fn is_rest(&self) -> bool {
        self.pitch.is_none()
    }

    /// Convert to an event at the given tempo in bars per minute.
    pub fn to_event(&self, tempo: f64) -> Event {
        Event {
            value: self.frequency(),
            duration: self.duration.as_f64() * 60.0 / tempo,
        }
    }
}

/// The meaning of a single token.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Token {
    /// Sets the duration of notes without explicit duration.
    DefaultDuration(Rational),
    Note(Note),
}

/// The multiplier a dot applies to the unit of the previous extension.
fn dot_factor(dot: char) -> Option<i64> {
    match dot {
        '.' => Some(2),
        ':' => Some(4),
        '!' => Some(8),
        _ => None,
    }
}

/// Extend `duration` by the given dots. Returns `None` on overflow.
///
/// ```
/// use sigsynth::pianoroll::apply_dots;
/// use sigsynth::rational::Rational;
///
/// assert_eq!(apply_dots(Rational::nth(4), "."), Some(Rational::new(3, 8)));
/// assert_eq!(apply_dots(Rational::nth(4), ".."), Some(Rational::new(7, 16)));
/// assert_eq!(apply_dots(Rational::nth(2), ":"), Some(Rational::new(5, 8)));
/// assert_eq!(apply_dots(Rational::nth(4), ""), Some(Rational::nth(4)));
/// ```
pub fn apply_dots(duration: Rational, dots: &str) -> Option<Rational> {
    let mut unit = duration.denominator();
    let mut total = duration;
    for dot in dots.chars() {
        unit = unit.checked_mul(dot_factor(dot)?)?;
        total = total.checked_add(Rational::nth(unit))?;
    }
    Some(total)
}

/// Parse `/N` into `1/N`. `N` must be a positive integer.
fn parse_size(size: &str) -> Option<Rational> {
    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: i64 = size.parse().ok()?;
    if n == 0 {
        None
    } else {
        Some(Rational::nth(n))
    }
}

/// A rest is `;`, optionally followed by an octave that is ignored.
fn is_rest(pitch: &str) -> bool {
    pitch
        .strip_prefix(';')
        .map_or(false, |octave| octave.bytes().all(|b| b.is_ascii_digit()))
}

/// Interpret a single token, using `default` as duration of notes that don't specify one.
/// Returns `None` for malformed tokens.
///
/// ```
/// use sigsynth::pianoroll::*;
/// use sigsynth::rational::Rational;
///
/// let quarter = Rational::nth(4);
/// assert_eq!(parse_token("/8", quarter), Some(Token::DefaultDuration(Rational::nth(8))));
/// assert_eq!(
///     parse_token(";/2", quarter),
///     Some(Token::Note(Note { pitch: None, duration: Rational::nth(2) }))
/// );
/// assert_eq!(parse_token("/0", quarter), None);
/// assert_eq!(parse_token("X4", quarter), None);
/// ```
pub fn parse_token(token: &str, default: Rational) -> Option<Token> {
    let body = token.trim_end_matches(|c: char| dot_factor(c).is_some());
    let dots = &token[body.len()..];

    let (pitch, size) = match body.find('/') {
        Some(pos) => (&body[..pos], Some(parse_size(&body[pos + 1..])?)),
        None => (body, None),
    };

    // dots only extend notes, a dotted default is plain `/N`
    if pitch.is_empty() {
        return Some(Token::DefaultDuration(size?));
    }

    let pitch = if is_rest(pitch) {
        None
    } else {
        Some(pitch.parse::<Pitch>().ok()?)
    };
    let duration = apply_dots(size.unwrap_or(default), dots)?;
    Some(Token::Note(Note { pitch, duration }))
}

/// Lazily parses the notes of a piano roll, with durations in bars.
#[derive(Debug, Clone)]
pub struct Notes {
    text: String,
    position: usize,
    default: Rational,
}

impl Notes {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: 0,
            default: default_duration(),
        }
    }

    /// Byte range of the next whitespace separated token.
    fn next_token(&mut self) -> Option<(usize, usize)> {
        let rest = &self.text[self.position..];
        let start = self.position + (rest.len() - rest.trim_start().len());
        let length = self.text[start..]
            .find(char::is_whitespace)
            .unwrap_or(self.text.len() - start);
        self.position = start + length;
        if length == 0 {
            None
        } else {
            Some((start, start + length))
        }
    }
}

impl Iterator for Notes {
    type Item = Note;

    fn next(&mut self) -> Option<Note> {
        loop {
            let (start, end) = self.next_token()?;
            let token = &self.text[start..end];
            match parse_token(token, self.default) {
                Some(Token::Note(note)) => return Some(note),
                Some(Token::DefaultDuration(duration)) => self.default = duration,
                None => debug!("skipping malformed token {:?}", token),
            }
        }
    }
}

/// A piano roll played at a given tempo, producing events for a sequencer.
///
/// The tempo is measured in bars per minute, so a bar lasts `60 / tempo` seconds
/// regardless of the time signature, and `/N` is the `N`th part of a bar.
///
/// ```
/// use sigsynth::pianoroll::PianoRoll;
///
/// let events: Vec<_> = PianoRoll::new(60.0, "A4/4.").collect();
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].value, Some(440.0));
/// assert_eq!(events[0].duration, 0.375);
/// ```
#[derive(Debug, Clone)]
pub struct PianoRoll {
    tempo: f64,
    notes: Notes,
}

impl PianoRoll {
    pub fn new(tempo: f64, text: impl Into<String>) -> Self {
        Self {
            tempo,
            notes: Notes::new(text),
        }
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// The remaining notes, with durations in bars.
    pub fn notes(&self) -> Notes {
        self.notes.clone()
    }

    /// Total duration of the remaining events in seconds.
    pub fn total_duration(&self) -> f64 {
        self.clone().map(|event| event.duration).sum()
    }
}

impl Iterator for PianoRoll {
    type Item = Event;

    fn next(&mut self) -> Option<Event> {
        self.notes.next().map(|note| note.to_event(self.tempo))
    }
}

/// Errors when writing durations in dotted notation.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum NotationError {
    #[snafu(display("Duration {} needs dots finer than an eighth of the previous one", duration))]
    TooShort { duration: Rational },
    #[snafu(display("Duration {} can not be written as a dotted note", duration))]
    NotDotted { duration: Rational },
}

/// Write a duration as `N` followed by dots, the inverse of how tokens are parsed.
///
/// ```
/// use sigsynth::pianoroll::dotted_notation;
/// use sigsynth::rational::Rational;
///
/// assert_eq!(dotted_notation(Rational::new(1, 4)).unwrap(), "4");
/// assert_eq!(dotted_notation(Rational::new(3, 8)).unwrap(), "4.");
/// assert_eq!(dotted_notation(Rational::new(7, 16)).unwrap(), "4..");
/// assert_eq!(dotted_notation(Rational::new(5, 16)).unwrap(), "4:");
/// assert!(dotted_notation(Rational::new(2, 3)).is_err());
/// ```
pub fn dotted_notation(duration: Rational) -> Result<String, NotationError> {
    let mut base = duration;
    let mut dots = Vec::new();
    while base.numerator() > 1 && base.numerator() % 2 == 1 {
        let extension = Rational::nth(base.denominator());
        base -= extension;
        let factor = extension.denominator() / base.denominator();
        let dot = match factor {
            2 => '.',
            4 => ':',
            8 => '!',
            _ => return Err(NotationError::TooShort { duration }),
        };
        dots.push(dot);
    }
    if base.numerator() != 1 {
        return Err(NotationError::NotDotted { duration });
    }
    // dots were collected from the shortest extension to the longest
    let dots: String = dots.into_iter().rev().collect();
    Ok(format!("{}{}", base.denominator(), dots))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pitch::{Accidental, NoteName};
    use float_cmp::approx_eq;

    fn bars(text: &str) -> Vec<(Option<String>, Rational)> {
        Notes::new(text)
            .map(|note| (note.pitch.map(|p| p.to_string()), note.duration))
            .collect()
    }

    #[test]
    fn melody_at_tempo() {
        let events: Vec<Event> = PianoRoll::new(60.0, "A4 B4/8 ;/8 C5").collect();
        let expected = [
            (Some(440.0), 0.25),
            (Some(493.88), 0.125),
            (None, 0.125),
            (Some(523.25), 0.25),
        ];
        assert_eq!(events.len(), expected.len());
        for (event, (frequency, duration)) in events.iter().zip(expected.iter()) {
            match (event.value, frequency) {
                (Some(a), Some(b)) => assert!(approx_eq!(f64, a, *b, epsilon = 0.01)),
                (a, b) => assert_eq!(a, *b),
            }
            assert_eq!(event.duration, *duration);
        }
    }

    #[test]
    fn default_duration_changes() {
        assert_eq!(
            bars("A /2 B C/8 ;"),
            vec![
                (Some("A4".to_string()), Rational::nth(4)),
                (Some("B4".to_string()), Rational::nth(2)),
                (Some("C4".to_string()), Rational::nth(8)),
                (None, Rational::nth(2)),
            ]
        );
    }

    #[test]
    fn dots() {
        assert_eq!(
            bars("A4/4. A4/4: A4/4! A4/2.. A4. /8. B"),
            vec![
                (Some("A4".to_string()), Rational::new(3, 8)),
                (Some("A4".to_string()), Rational::new(5, 16)),
                (Some("A4".to_string()), Rational::new(9, 32)),
                (Some("A4".to_string()), Rational::new(7, 8)),
                (Some("A4".to_string()), Rational::new(3, 8)),
                (Some("B4".to_string()), Rational::nth(8)),
            ]
        );
        assert_eq!(
            parse_token("/8.", Rational::nth(4)),
            Some(Token::DefaultDuration(Rational::nth(8)))
        );
    }

    #[test]
    fn garbage_is_skipped() {
        assert_eq!(
            bars("A4 hello /0 C#/x ;x // Bb3/16 /"),
            vec![
                (Some("A4".to_string()), Rational::nth(4)),
                (Some("Bb3".to_string()), Rational::nth(16)),
            ]
        );
        // out of range octaves are skipped rather than overflowing
        let events: Vec<Event> = PianoRoll::new(60.0, "A200000000 A4 C99999999999").collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, Some(440.0));
        assert!(bars("").is_empty());
        assert!(bars("   \n\t ").is_empty());
    }

    #[test]
    fn rests_may_carry_octaves() {
        let token = parse_token(";4/8", Rational::nth(4));
        assert_eq!(
            token,
            Some(Token::Note(Note {
                pitch: None,
                duration: Rational::nth(8)
            }))
        );
    }

    #[test]
    fn accidentals() {
        match parse_token("F##3/2", Rational::nth(4)) {
            Some(Token::Note(note)) => {
                let pitch = note.pitch.unwrap();
                assert_eq!(pitch.name, NoteName::F);
                assert_eq!(pitch.accidental, Accidental::Sharp(2));
                assert_eq!(pitch.octave, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn total_duration() {
        let roll = PianoRoll::new(120.0, "/2 A B ; C/4.");
        assert_eq!(roll.total_duration(), 0.25 * 3.0 + 0.1875);
        assert_eq!(roll.notes().map(|n| n.duration).sum::<Rational>(), Rational::new(15, 8));
        // computing the total does not consume the roll
        assert_eq!(roll.count(), 4);
    }

    #[test]
    fn dotted_notation_round_trips() {
        for text in &["1", "4", "8.", "2:", "16!", "4..", "2.:"] {
            let duration = match parse_token(&format!("/{}", text), Rational::one()) {
                Some(Token::DefaultDuration(d)) => d,
                other => panic!("unexpected {:?}", other),
            };
            assert_eq!(&dotted_notation(duration).unwrap(), text);
        }
        assert_eq!(
            dotted_notation(Rational::new(17, 16)),
            Err(NotationError::TooShort {
                duration: Rational::new(17, 16)
            })
        );
    }
}
