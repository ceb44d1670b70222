// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Phase accumulating oscillators.

use std::f64::consts::PI;
use std::fmt;
use std::rc::Rc;

use crate::signal::{Frequency, IntoSig, Sig, Signal};

/// Number of entries in a wave table.
pub const TABLE_SIZE: usize = 1024;

/// Width of the fixed point phase accumulator.
const PHASE_BITS: u32 = 24;
const PHASE_MASK: i64 = (1 << PHASE_BITS) - 1;
/// Shift that keeps the top 10 bits of the phase, i.e. an index into the wave table.
const INDEX_SHIFT: u32 = PHASE_BITS - 10;

/// Position within one period of a wave, always in `[0, 1)`.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd)]
pub struct Phase(f64);

impl Phase {
    pub const ZERO: Phase = Phase(0.0);

    pub fn new(offset: f64) -> Phase {
        let wrapped = offset.rem_euclid(1.0);
        // tiny negative offsets round up to exactly one
        if wrapped < 1.0 {
            Phase(wrapped)
        } else {
            Phase::ZERO
        }
    }

    pub fn offset(self) -> f64 {
        self.0
    }

    pub fn step(self, amount: f64) -> Phase {
        Phase::new(self.0 + amount)
    }
}

/// The shapes of periodic waves.
///
/// # Examples
///
/// ```
/// use sigsynth::oscillator::*;
///
/// assert_eq!(Waveform::Saw.eval(Phase::ZERO), 1.0);
/// assert_eq!(Waveform::Square.eval(Phase::new(0.75)), -1.0);
/// assert_eq!(Waveform::Triangle.eval(Phase::new(0.25)), 1.0);
/// assert_eq!(Waveform::Triangle.eval(Phase::new(0.75)), -1.0);
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Cosine,
    Saw,
    Square,
    Triangle,
    /// Sawtooth built from the given number of harmonics.
    FourierSaw(u32),
    /// Square built from the given number of odd harmonics.
    FourierSquare(u32),
    /// Triangle built from the given number of odd harmonics.
    FourierTriangle(u32),
}

impl Waveform {
    pub fn eval(self, phase: Phase) -> f64 {
        let p = phase.offset();
        match self {
            Waveform::Sine => (2.0 * PI * p).sin(),
            Waveform::Cosine => (2.0 * PI * p).cos(),
            Waveform::Saw => saw_wave(p),
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 2.0 * saw_wave((p - 0.25).rem_euclid(1.0)).abs() - 1.0,
            Waveform::FourierSaw(harmonics) => {
                let sum: f64 = (1..=harmonics)
                    .map(|h| {
                        let h = h as f64;
                        (2.0 * PI * h * p).sin() / h
                    })
                    .sum();
                2.0 / PI * sum
            }
            Waveform::FourierSquare(harmonics) => {
                let sum: f64 = odd_harmonics(harmonics)
                    .map(|h| (2.0 * PI * h * p).sin() / h)
                    .sum();
                4.0 / PI * sum
            }
            Waveform::FourierTriangle(harmonics) => {
                let sum: f64 = odd_harmonics(harmonics)
                    .enumerate()
                    .map(|(k, h)| {
                        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                        sign * (2.0 * PI * h * p).sin() / (h * h)
                    })
                    .sum();
                8.0 / (PI * PI) * sum
            }
        }
    }

    /// Whether the wave is a sum of partials, which is too slow to evaluate per sample.
    pub fn is_band_limited(self) -> bool {
        matches!(
            self,
            Waveform::FourierSaw(_) | Waveform::FourierSquare(_) | Waveform::FourierTriangle(_)
        )
    }
}

fn saw_wave(p: f64) -> f64 {
    1.0 - 2.0 * p
}

/// The first `count` odd harmonics 1, 3, 5, ...
fn odd_harmonics(count: u32) -> impl Iterator<Item = f64> {
    (1..=count).map(|k| (2 * k - 1) as f64)
}

/// One period of a wave, sampled at `TABLE_SIZE` evenly spaced phases.
#[derive(Clone)]
pub struct WaveTable {
    samples: Box<[f64]>,
}

impl WaveTable {
    /// Tabulate an arbitrary wave shape.
    pub fn from_fn<F: FnMut(Phase) -> f64>(mut wave: F) -> Self {
        let samples = (0..TABLE_SIZE)
            .map(|i| wave(Phase::new(i as f64 / TABLE_SIZE as f64)))
            .collect();
        Self { samples }
    }

    pub fn from_waveform(waveform: Waveform) -> Self {
        Self::from_fn(|phase| waveform.eval(phase))
    }

    /// Look up the entry at or before `phase`.
    pub fn lookup(&self, phase: Phase) -> f64 {
        let index = (phase.offset() * TABLE_SIZE as f64) as usize;
        self.samples[index.min(TABLE_SIZE - 1)]
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }
}

impl fmt::Debug for WaveTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WaveTable({} samples)", self.samples.len())
    }
}

/// What an oscillator outputs for a given phase.
#[derive(Debug, Clone)]
pub enum Shape {
    Wave(Waveform),
    Table(Rc<WaveTable>),
}

impl Shape {
    fn eval(&self, phase: Phase) -> f64 {
        match self {
            Shape::Wave(waveform) => waveform.eval(phase),
            Shape::Table(table) => table.lookup(phase),
        }
    }

    fn into_table(self) -> Rc<WaveTable> {
        match self {
            Shape::Wave(waveform) => Rc::new(WaveTable::from_waveform(waveform)),
            Shape::Table(table) => table,
        }
    }
}

/// Band limited waves are precomputed into a table.
impl From<Waveform> for Shape {
    fn from(waveform: Waveform) -> Shape {
        if waveform.is_band_limited() {
            Shape::Table(Rc::new(WaveTable::from_waveform(waveform)))
        } else {
            Shape::Wave(waveform)
        }
    }
}

impl From<WaveTable> for Shape {
    fn from(table: WaveTable) -> Shape {
        Shape::Table(Rc::new(table))
    }
}

impl From<Rc<WaveTable>> for Shape {
    fn from(table: Rc<WaveTable>) -> Shape {
        Shape::Table(table)
    }
}

#[derive(Debug, Copy, Clone)]
enum Accumulator {
    Float(Phase),
    /// 24 bit phase, indexing the table with its top 10 bits.
    Fixed(i64),
}

/// An oscillator advancing its phase by the time that passed since the last
/// sample times the current frequency.
pub struct Oscillator {
    frequency: Sig,
    shape: Shape,
    accumulator: Accumulator,
    last_t: f64,
}

impl Oscillator {
    /// Create an oscillator with a floating point phase.
    /// The frequency input is routed through the frequency channel.
    pub fn new(shape: impl Into<Shape>, frequency: impl IntoSig) -> Self {
        Self {
            frequency: Frequency::channel(frequency),
            shape: shape.into(),
            accumulator: Accumulator::Float(Phase::ZERO),
            last_t: 0.0,
        }
    }

    /// Create an oscillator with a 24 bit fixed point phase that always reads
    /// its output from a wave table, tabulating the shape if necessary.
    pub fn fixed_point(shape: impl Into<Shape>, frequency: impl IntoSig) -> Self {
        Self {
            frequency: Frequency::channel(frequency),
            shape: Shape::Table(shape.into().into_table()),
            accumulator: Accumulator::Fixed(0),
            last_t: 0.0,
        }
    }

    /// Start at a different phase.
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.accumulator = match self.accumulator {
            Accumulator::Float(_) => Accumulator::Float(phase),
            Accumulator::Fixed(_) => {
                Accumulator::Fixed((phase.offset() * (1 << PHASE_BITS) as f64) as i64)
            }
        };
        self
    }

    pub fn phase(&self) -> Phase {
        match self.accumulator {
            Accumulator::Float(phase) => phase,
            Accumulator::Fixed(counter) => Phase::new(counter as f64 / (1 << PHASE_BITS) as f64),
        }
    }
}

impl Signal for Oscillator {
    fn sample(&mut self, t: f64) -> f64 {
        debug_assert!(
            t >= self.last_t,
            "oscillator sampled at {} after {}",
            t,
            self.last_t
        );
        let dt = t - self.last_t;
        self.last_t = t;
        let frequency = self.frequency.sample(t);

        match self.accumulator {
            Accumulator::Float(ref mut phase) => {
                *phase = phase.step(dt * frequency);
                self.shape.eval(*phase)
            }
            Accumulator::Fixed(ref mut counter) => {
                let increment = (dt * frequency * (1 << PHASE_BITS) as f64).floor() as i64;
                *counter = (*counter + increment) & PHASE_MASK;
                let index = (*counter >> INDEX_SHIFT) as usize;
                match &self.shape {
                    Shape::Table(table) => table.samples()[index],
                    Shape::Wave(waveform) => {
                        waveform.eval(Phase::new(index as f64 / TABLE_SIZE as f64))
                    }
                }
            }
        }
    }
}

pub fn sine(frequency: impl IntoSig) -> Sig {
    Sig::new(Oscillator::new(Waveform::Sine, frequency))
}

pub fn cosine(frequency: impl IntoSig) -> Sig {
    Sig::new(Oscillator::new(Waveform::Cosine, frequency))
}

pub fn saw(frequency: impl IntoSig) -> Sig {
    Sig::new(Oscillator::new(Waveform::Saw, frequency))
}

pub fn square(frequency: impl IntoSig) -> Sig {
    Sig::new(Oscillator::new(Waveform::Square, frequency))
}

pub fn triangle(frequency: impl IntoSig) -> Sig {
    Sig::new(Oscillator::new(Waveform::Triangle, frequency))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::signal::hz;
    use float_cmp::approx_eq;

    #[test]
    fn continuity_at_wraparound() {
        assert!(approx_eq!(f64, Waveform::Sine.eval(Phase::ZERO), 0.0));
        assert!(approx_eq!(f64, (2.0 * PI).sin(), 0.0, epsilon = 1e-12));
        assert_eq!(Waveform::Saw.eval(Phase::ZERO), 1.0);
        let almost_one = Phase::new(1.0 - 1e-9);
        assert!(approx_eq!(f64, Waveform::Saw.eval(almost_one), -1.0, epsilon = 1e-8));
        assert!(approx_eq!(f64, Waveform::Sine.eval(almost_one), 0.0, epsilon = 1e-8));
        assert_eq!(Waveform::Triangle.eval(Phase::ZERO), 0.0);
    }

    #[test]
    fn phase_wraps() {
        assert_eq!(Phase::new(1.25), Phase::new(0.25));
        assert_eq!(Phase::new(-0.25), Phase::new(0.75));
        assert_eq!(Phase::new(1.0), Phase::ZERO);
        assert!(Phase::new(-1e-20).offset() < 1.0);
    }

    #[test]
    fn fourier_series_approach_their_shapes() {
        let quarter = Phase::new(0.25);
        assert!(approx_eq!(
            f64,
            Waveform::FourierSaw(500).eval(quarter),
            Waveform::Saw.eval(quarter),
            epsilon = 1e-2
        ));
        assert!(approx_eq!(
            f64,
            Waveform::FourierSquare(500).eval(quarter),
            1.0,
            epsilon = 1e-2
        ));
        assert!(approx_eq!(
            f64,
            Waveform::FourierTriangle(50).eval(quarter),
            Waveform::Triangle.eval(quarter),
            epsilon = 1e-2
        ));
        // a single partial is a plain sine
        let p = Phase::new(0.1);
        assert!(approx_eq!(
            f64,
            Waveform::FourierSquare(1).eval(p),
            4.0 / PI * Waveform::Sine.eval(p)
        ));
    }

    #[test]
    fn periodicity() {
        let sample_rate = 44100.0;
        // 441 Hz has a period of exactly 100 samples
        let mut osc = Oscillator::new(Waveform::Sine, hz(441.0));
        for i in 1..=300 {
            osc.sample(i as f64 / sample_rate);
        }
        let p = osc.phase().offset();
        assert!(p.min(1.0 - p) < 1e-9, "phase {} did not return to zero", p);
    }

    #[test]
    fn bipolar_frequency_input() {
        // a constant 0.0 is read as 5500 Hz
        let mut osc = Oscillator::new(Waveform::Saw, 0.0);
        let value = osc.sample(1.0 / 22000.0);
        assert!(approx_eq!(f64, osc.phase().offset(), 0.25, epsilon = 1e-12));
        assert!(approx_eq!(f64, value, 0.5, epsilon = 1e-12));
    }

    #[test]
    fn fixed_point_matches_floating_point() {
        let sample_rate = 22050.0;
        let mut float = Oscillator::new(Waveform::Sine, 440.0);
        let mut fixed = Oscillator::fixed_point(Waveform::Sine, 440.0);
        for i in 1..1000 {
            let t = i as f64 / sample_rate;
            let a = float.sample(t);
            let b = fixed.sample(t);
            assert!((a - b).abs() < 0.01, "{} vs {} at sample {}", a, b, i);
        }
    }

    #[test]
    fn custom_tables() {
        let table = WaveTable::from_fn(|phase| if phase.offset() < 0.25 { 1.0 } else { 0.0 });
        assert_eq!(table.lookup(Phase::new(0.2)), 1.0);
        assert_eq!(table.lookup(Phase::new(0.3)), 0.0);

        let mut osc = Oscillator::new(table, 100.0).with_phase(Phase::new(0.5));
        assert_eq!(osc.sample(0.001), 0.0); // phase 0.6
        assert_eq!(osc.sample(0.006), 1.0); // phase 0.1
    }
}
