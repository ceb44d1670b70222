// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Discrete event signals: one-shot triggers and level gates.
//!
//! Both come in two flavors, one derived from comparing an input signal
//! against a threshold, and one that is switched manually, e.g. by a sequencer.

use std::cell::Cell;
use std::rc::Rc;

use crate::signal::{IntoSig, Sig, Signal};

/// Threshold used when none is given explicitly.
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Whether a control signal (trigger or gate) counts as set.
pub fn is_high(level: f64) -> bool {
    level > DEFAULT_THRESHOLD
}

/// Outputs 1 for a single sample when its input rises to the threshold.
/// It only fires again after the input dropped below the threshold in between.
pub struct EdgeTrigger {
    input: Sig,
    threshold: Sig,
    fired: bool,
}

impl EdgeTrigger {
    pub fn new(input: impl IntoSig, threshold: impl IntoSig) -> Self {
        Self {
            input: input.into_sig(),
            threshold: threshold.into_sig(),
            fired: false,
        }
    }

    pub fn with_default_threshold(input: impl IntoSig) -> Self {
        Self::new(input, DEFAULT_THRESHOLD)
    }
}

impl Signal for EdgeTrigger {
    fn sample(&mut self, t: f64) -> f64 {
        let level = self.input.sample(t);
        let threshold = self.threshold.sample(t);

        if !self.fired && level >= threshold {
            self.fired = true;
            return 1.0;
        }
        if self.fired && level < threshold {
            self.fired = false;
        }
        0.0
    }
}

/// A trigger fired by hand.
///
/// Clones share their state, so one clone can be fired while another one is
/// part of a signal graph. The next sample after firing is 1, all others are 0.
///
/// ```
/// use sigsynth::signal::Signal;
/// use sigsynth::trigger::Trigger;
///
/// let trigger = Trigger::new();
/// let mut reader = trigger.clone();
/// trigger.fire();
/// assert_eq!(reader.sample(0.0), 1.0);
/// assert_eq!(reader.sample(0.1), 0.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    firing: Rc<Cell<bool>>,
}

impl Trigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fire(&self) {
        self.firing.set(true);
    }

    /// Whether the trigger was fired but not yet read.
    pub fn is_pending(&self) -> bool {
        self.firing.get()
    }
}

impl Signal for Trigger {
    fn sample(&mut self, _t: f64) -> f64 {
        if self.firing.replace(false) {
            1.0
        } else {
            0.0
        }
    }
}

impl IntoSig for Trigger {
    fn into_sig(self) -> Sig {
        Sig::new(self)
    }
}

/// Outputs 1 while its input is at or above the threshold, and 0 otherwise.
pub struct LevelGate {
    input: Sig,
    threshold: Sig,
}

impl LevelGate {
    pub fn new(input: impl IntoSig, threshold: impl IntoSig) -> Self {
        Self {
            input: input.into_sig(),
            threshold: threshold.into_sig(),
        }
    }

    pub fn with_default_threshold(input: impl IntoSig) -> Self {
        Self::new(input, DEFAULT_THRESHOLD)
    }
}

impl Signal for LevelGate {
    fn sample(&mut self, t: f64) -> f64 {
        let level = self.input.sample(t);
        let threshold = self.threshold.sample(t);
        if level < threshold {
            0.0
        } else {
            1.0
        }
    }
}

/// A gate opened and closed by hand. Clones share their state.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    open: Rc<Cell<bool>>,
}

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self) {
        self.open.set(true);
    }

    pub fn off(&self) {
        self.open.set(false);
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }
}

impl Signal for Gate {
    fn sample(&mut self, _t: f64) -> f64 {
        if self.open.get() {
            1.0
        } else {
            0.0
        }
    }
}

impl IntoSig for Gate {
    fn into_sig(self) -> Sig {
        Sig::new(self)
    }
}
