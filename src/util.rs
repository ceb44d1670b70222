// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Unit conversions.

/// Compute a frequency factor measured in semitones (one octave consists of 12 semitones)
///
/// # Example
///
/// ```
/// # use sigsynth::util::*;
///
/// assert_eq!(from_semitones(12.0), 2.0);
/// assert_eq!(from_semitones(-24.0), 0.25);
/// ```
pub fn from_semitones(semitones: f64) -> f64 {
    2.0f64.powf(semitones / 12.0)
}

/// Compute an amplitude factor measured in decibels.
///
/// # Example
///
/// ```
/// # use sigsynth::util::*;
///
/// assert_eq!(from_decibels(0.0), 1.0);
/// assert!((from_decibels(-20.0) - 0.1).abs() < 1e-12);
/// ```
pub fn from_decibels(decibels: f64) -> f64 {
    10.0f64.powf(decibels / 20.0)
}
