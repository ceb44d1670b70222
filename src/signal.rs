// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! The signal graph.
//!
//! A signal is a stateful function from elapsed time to a sample value.
//! Graphs are built by handing signals to the constructors of other signals,
//! and evaluated by pulling samples from the root with increasing time.

use std::cell::RefCell;
use std::fmt;
use std::ops;
use std::rc::Rc;

/// Upper end of the frequency channel in Hz.
/// Bipolar signals in `[-1, 1]` are mapped onto `[0, MAX_FREQUENCY]`.
pub const MAX_FREQUENCY: f64 = 11000.0;

/// A time-indexed source of samples.
///
/// Samples are nominally in `[-1, 1]`, but some channels use other ranges,
/// e.g. frequencies are measured in Hz and gates are either 0 or 1.
pub trait Signal {
    /// Sample the signal at `t` seconds.
    ///
    /// Consecutive calls must not go back in time, since most signals
    /// advance internal state (phases, envelope stages) based on the time
    /// that passed since the previous call.
    fn sample(&mut self, t: f64) -> f64;

    /// Whether the output is already measured in Hz, in which case the
    /// frequency channel passes it through unscaled.
    fn is_frequency(&self) -> bool {
        false
    }

    /// The value of a signal that never changes.
    fn constant(&self) -> Option<f64> {
        None
    }
}

/// Shared handle to a signal in the graph.
///
/// Cloning the handle does not clone the signal: all clones refer to the same
/// instance, so using a clone at two places in the graph shares its state
/// (e.g. two voices driven by one oscillator share its phase).
#[derive(Clone)]
pub struct Sig(Rc<RefCell<dyn Signal>>);

impl Sig {
    pub fn new<S: Signal + 'static>(signal: S) -> Sig {
        Sig(Rc::new(RefCell::new(signal)))
    }

    pub fn constant(value: f64) -> Sig {
        Sig::new(Const::new(value))
    }

    pub fn sample(&self, t: f64) -> f64 {
        self.0.borrow_mut().sample(t)
    }

    pub fn is_frequency(&self) -> bool {
        self.0.borrow().is_frequency()
    }

    pub fn constant_value(&self) -> Option<f64> {
        self.0.borrow().constant()
    }
}

/// Wire a signal into a graph while keeping typed access to it,
/// e.g. for querying whether a sequencer has finished.
impl<S: Signal + 'static> From<Rc<RefCell<S>>> for Sig {
    fn from(shared: Rc<RefCell<S>>) -> Sig {
        Sig(shared)
    }
}

impl fmt::Debug for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let signal = self.0.borrow();
        f.debug_struct("Sig")
            .field("constant", &signal.constant())
            .field("frequency", &signal.is_frequency())
            .finish()
    }
}

/// Anything that can be used where a signal is expected.
/// Plain numbers become constant signals.
pub trait IntoSig {
    fn into_sig(self) -> Sig;
}

impl IntoSig for Sig {
    fn into_sig(self) -> Sig {
        self
    }
}

impl IntoSig for &Sig {
    fn into_sig(self) -> Sig {
        self.clone()
    }
}

impl IntoSig for f64 {
    fn into_sig(self) -> Sig {
        Sig::constant(self)
    }
}

impl<S: Signal + 'static> IntoSig for Rc<RefCell<S>> {
    fn into_sig(self) -> Sig {
        Sig::from(self)
    }
}

/// A signal that always has the same value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Const {
    value: f64,
    frequency: bool,
}

impl Const {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            frequency: false,
        }
    }

    /// A constant that is explicitly measured in Hz.
    pub fn hz(value: f64) -> Self {
        Self {
            value,
            frequency: true,
        }
    }
}

impl Signal for Const {
    fn sample(&mut self, _t: f64) -> f64 {
        self.value
    }

    fn is_frequency(&self) -> bool {
        self.frequency
    }

    fn constant(&self) -> Option<f64> {
        Some(self.value)
    }
}

/// A constant frequency in Hz that bypasses the scaling of the frequency channel,
/// even when its magnitude is at most one.
///
/// ```
/// use sigsynth::signal::*;
///
/// assert_eq!(Frequency::channel(hz(0.5)).sample(0.0), 0.5);
/// assert_eq!(Frequency::channel(0.5).sample(0.0), 8250.0);
/// ```
pub fn hz(value: f64) -> Sig {
    Sig::new(Const::hz(value))
}

/// Map a bipolar value from `[-1, 1]` onto the frequency range `[0, MAX_FREQUENCY]`.
pub fn bipolar_to_hz(value: f64) -> f64 {
    (value + 1.0) * MAX_FREQUENCY / 2.0
}

/// Inverse of [`bipolar_to_hz`].
pub fn hz_to_bipolar(frequency: f64) -> f64 {
    frequency * 2.0 / MAX_FREQUENCY - 1.0
}

/// Apply the frequency channel rule to a plain number:
/// values with a magnitude above one are taken as Hz, everything else is bipolar.
///
/// ```
/// use sigsynth::signal::*;
///
/// assert_eq!(frequency_value(440.0), 440.0);
/// assert_eq!(frequency_value(0.0), 5500.0);
/// assert_eq!(frequency_value(1.0), 11000.0);
/// ```
pub fn frequency_value(value: f64) -> f64 {
    if value.abs() > 1.0 {
        value
    } else {
        bipolar_to_hz(value)
    }
}

/// The frequency channel, turning modulation-style bipolar signals into Hz.
pub struct Frequency {
    input: Sig,
}

impl Frequency {
    /// Route a signal through the frequency channel.
    ///
    /// Inputs that are already measured in Hz, and constants with a magnitude
    /// above one, pass through unscaled. All other inputs are mapped from
    /// `[-1, 1]` to `[0, MAX_FREQUENCY]`. The result is always marked as a frequency.
    pub fn channel(input: impl IntoSig) -> Sig {
        let input = input.into_sig();
        if input.is_frequency() {
            input
        } else if let Some(value) = input.constant_value() {
            hz(frequency_value(value))
        } else {
            Sig::new(Frequency { input })
        }
    }
}

impl Signal for Frequency {
    fn sample(&mut self, t: f64) -> f64 {
        bipolar_to_hz(self.input.sample(t))
    }

    fn is_frequency(&self) -> bool {
        true
    }
}

/// Binary operators for combining two signals sample by sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    Pow,
}

impl BinOp {
    pub fn apply(self, x: f64, y: f64) -> f64 {
        match self {
            BinOp::Add => x + y,
            BinOp::Sub => x - y,
            BinOp::Mul => x * y,
            BinOp::Div => x / y,
            BinOp::Min => x.min(y),
            BinOp::Max => x.max(y),
            BinOp::Pow => x.powf(y),
        }
    }
}

/// Two signals combined by an operator.
/// The left signal is always sampled before the right one.
pub struct Binary {
    op: BinOp,
    left: Sig,
    right: Sig,
    frequency: bool,
}

impl Signal for Binary {
    fn sample(&mut self, t: f64) -> f64 {
        let left = self.left.sample(t);
        let right = self.right.sample(t);
        self.op.apply(left, right)
    }

    fn is_frequency(&self) -> bool {
        self.frequency
    }
}

/// Combine two signals with an operator.
/// The result is measured in Hz if the right (carrier) signal is.
pub fn binary(op: BinOp, left: impl IntoSig, right: impl IntoSig) -> Sig {
    let left = left.into_sig();
    let right = right.into_sig();
    let frequency = right.is_frequency();
    Sig::new(Binary {
        op,
        left,
        right,
        frequency,
    })
}

/// Scale `input` by `ratio`, e.g. an oscillator by an envelope.
pub fn amp(ratio: impl IntoSig, input: impl IntoSig) -> Sig {
    Sig::new(Binary {
        op: BinOp::Mul,
        left: ratio.into_sig(),
        right: input.into_sig(),
        frequency: false,
    })
}

/// Shift `input` by `offset`.
pub fn bias(offset: impl IntoSig, input: impl IntoSig) -> Sig {
    binary(BinOp::Add, offset, input)
}

/// Multiply two signals.
pub fn mult(left: impl IntoSig, right: impl IntoSig) -> Sig {
    binary(BinOp::Mul, left, right)
}

impl ops::Add for Sig {
    type Output = Sig;

    fn add(self, rhs: Sig) -> Sig {
        bias(self, rhs)
    }
}

impl ops::Add<f64> for Sig {
    type Output = Sig;

    fn add(self, rhs: f64) -> Sig {
        bias(rhs, self)
    }
}

impl ops::Sub for Sig {
    type Output = Sig;

    fn sub(self, rhs: Sig) -> Sig {
        binary(BinOp::Sub, self, rhs)
    }
}

impl ops::Mul for Sig {
    type Output = Sig;

    fn mul(self, rhs: Sig) -> Sig {
        mult(self, rhs)
    }
}

impl ops::Mul<f64> for Sig {
    type Output = Sig;

    fn mul(self, rhs: f64) -> Sig {
        mult(rhs, self)
    }
}

impl ops::Neg for Sig {
    type Output = Sig;

    fn neg(self) -> Sig {
        amp(-1.0, self)
    }
}
