// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Signals that move from one value to another over a fixed time span,
//! e.g. for fading or sweeping parameters.

use crate::signal::{IntoSig, Sig, Signal};

/// How a ramp progresses between its end points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    Linear,
    /// Progress raised to the given power.
    Poly(f64),
    /// Slow start, fast finish.
    Exp,
    /// Fast start, slow finish.
    Log,
}

impl Curve {
    /// Map progress in `[0, 1]` onto `[0, 1]`.
    pub fn eval(self, x: f64) -> f64 {
        match self {
            Curve::Linear => x,
            Curve::Poly(power) => x.powf(power),
            Curve::Exp => (10f64.powf(x) - 1.0) / 9.0,
            Curve::Log => (x * 9.0 + 1.0).log10(),
        }
    }
}

/// Goes from `begin` to `end` during `[start, start + duration]` and holds
/// the respective end point before and after.
///
/// ```
/// use sigsynth::ramp::Ramp;
/// use sigsynth::signal::Signal;
///
/// let mut ramp = Ramp::linear(1.0, 2.0);
/// assert_eq!(ramp.sample(0.0), -1.0);
/// assert_eq!(ramp.sample(2.0), 0.0);
/// assert_eq!(ramp.sample(5.0), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp {
    start: f64,
    duration: f64,
    begin: f64,
    end: f64,
    curve: Curve,
}

impl Ramp {
    /// A ramp over the full bipolar range.
    pub fn new(start: f64, duration: f64, curve: Curve) -> Self {
        Self {
            start,
            duration,
            begin: -1.0,
            end: 1.0,
            curve,
        }
    }

    pub fn linear(start: f64, duration: f64) -> Self {
        Self::new(start, duration, Curve::Linear)
    }

    pub fn poly(start: f64, duration: f64, power: f64) -> Self {
        Self::new(start, duration, Curve::Poly(power))
    }

    pub fn exp(start: f64, duration: f64) -> Self {
        Self::new(start, duration, Curve::Exp)
    }

    pub fn log(start: f64, duration: f64) -> Self {
        Self::new(start, duration, Curve::Log)
    }

    /// Use different end points.
    pub fn between(mut self, begin: f64, end: f64) -> Self {
        self.begin = begin;
        self.end = end;
        self
    }
}

impl Signal for Ramp {
    fn sample(&mut self, t: f64) -> f64 {
        if t < self.start {
            self.begin
        } else if t >= self.start + self.duration {
            self.end
        } else {
            let progress = self.curve.eval((t - self.start) / self.duration);
            self.begin + progress * (self.end - self.begin)
        }
    }
}

/// Interpolates linearly between breakpoints.
///
/// Breakpoints are given as `(time, value)` pairs, both relative: times are
/// fractions of `duration` and values are fractions of the range from `low` to `high`.
/// The ramp starts at `(0, low)` and holds the last value after the final breakpoint.
///
/// ```
/// use sigsynth::ramp::SegmentedRamp;
/// use sigsynth::signal::Signal;
///
/// let mut ramp = SegmentedRamp::new(10.0, vec![(0.5, 1.0), (1.0, 0.5)]);
/// assert_eq!(ramp.sample(2.5), 0.5);
/// assert_eq!(ramp.sample(5.0), 1.0);
/// assert_eq!(ramp.sample(7.5), 0.75);
/// assert_eq!(ramp.sample(20.0), 0.5);
/// ```
pub struct SegmentedRamp {
    breakpoints: Vec<(f64, f64)>,
    /// Index of the breakpoint that ends the current segment.
    next: usize,
}

impl SegmentedRamp {
    pub fn new(duration: f64, breakpoints: impl IntoIterator<Item = (f64, f64)>) -> Self {
        Self::with_range(duration, breakpoints, 0.0, 1.0)
    }

    pub fn with_range(
        duration: f64,
        breakpoints: impl IntoIterator<Item = (f64, f64)>,
        low: f64,
        high: f64,
    ) -> Self {
        let breakpoints = std::iter::once((0.0, low))
            .chain(
                breakpoints
                    .into_iter()
                    .map(|(time, value)| (time * duration, low + value * (high - low))),
            )
            .collect();
        Self {
            breakpoints,
            next: 1,
        }
    }
}

impl Signal for SegmentedRamp {
    fn sample(&mut self, t: f64) -> f64 {
        while self.next < self.breakpoints.len() && self.breakpoints[self.next].0 <= t {
            self.next += 1;
        }
        let (t0, v0) = self.breakpoints[self.next - 1];
        match self.breakpoints.get(self.next) {
            Some(&(t1, v1)) if t >= t0 => v0 + (t - t0) / (t1 - t0) * (v1 - v0),
            _ => v0,
        }
    }
}

/// Maps a bipolar signal from `[-1, 1]` onto `[0, 1]`.
pub struct Unipolar {
    input: Sig,
}

impl Unipolar {
    pub fn new(input: impl IntoSig) -> Self {
        Self {
            input: input.into_sig(),
        }
    }
}

impl Signal for Unipolar {
    fn sample(&mut self, t: f64) -> f64 {
        (self.input.sample(t) + 1.0) / 2.0
    }
}
