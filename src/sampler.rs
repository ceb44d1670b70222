// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

use crate::signal::{IntoSig, Sig};

/// Pulls samples from a signal at a fixed rate, starting at `t = 0`.
///
/// Time is computed from the sample index rather than accumulated,
/// so long renders don't drift.
///
/// ```
/// use sigsynth::sampler::Sampler;
///
/// let samples: Vec<f64> = Sampler::new(0.5, 8000).with_duration(0.25).collect();
/// assert_eq!(samples.len(), 2000);
/// assert!(samples.iter().all(|&x| x == 0.5));
/// ```
pub struct Sampler {
    input: Sig,
    sample_rate: u32,
    index: u64,
    count: Option<u64>,
}

impl Sampler {
    /// An endless stream of samples.
    pub fn new(input: impl IntoSig, sample_rate: u32) -> Self {
        Self {
            input: input.into_sig(),
            sample_rate,
            index: 0,
            count: None,
        }
    }

    /// Stop after `duration` seconds, i.e. after `floor(duration * sample_rate)` samples.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.count = Some(sample_count(duration, self.sample_rate));
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Time of the next sample in seconds.
    pub fn time(&self) -> f64 {
        self.index as f64 / self.sample_rate as f64
    }
}

/// Number of whole samples in `duration` seconds.
///
/// ```
/// use sigsynth::sampler::sample_count;
///
/// assert_eq!(sample_count(1.0, 44100), 44100);
/// assert_eq!(sample_count(0.00001, 44100), 0);
/// assert_eq!(sample_count(-1.0, 44100), 0);
/// ```
pub fn sample_count(duration: f64, sample_rate: u32) -> u64 {
    (duration * sample_rate as f64).floor().max(0.0) as u64
}

impl Iterator for Sampler {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.count.map_or(false, |count| self.index >= count) {
            return None;
        }
        let value = self.input.sample(self.time());
        self.index += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.count {
            Some(count) => {
                let remaining = (count - self.index) as usize;
                (remaining, Some(remaining))
            }
            None => (usize::MAX, None),
        }
    }
}
