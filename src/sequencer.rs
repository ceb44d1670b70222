// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

use log::{debug, trace};

use crate::signal::{frequency_value, Signal};
use crate::trigger::{Gate, Trigger};

/// A single step of a sequence: a value held for some time, or a rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    /// The value to hold, or `None` for a rest.
    pub value: Option<f64>,
    /// Duration in seconds.
    pub duration: f64,
}

impl Event {
    pub fn note(value: f64, duration: f64) -> Self {
        Self {
            value: Some(value),
            duration,
        }
    }

    pub fn rest(duration: f64) -> Self {
        Self {
            value: None,
            duration,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.value.is_none()
    }
}

/// Steps through a sequence of events, outputting the value of the current one.
///
/// At the start of every note it fires its trigger and opens its gate, rests close the gate.
/// Both can be handed to an envelope so that it follows the sequence.
///
/// ```
/// use sigsynth::sequencer::{Event, Sequencer};
/// use sigsynth::signal::Signal;
///
/// let steps = vec![Event::note(0.5, 1.0), Event::rest(1.0), Event::note(0.25, 1.0)];
/// let mut seq = Sequencer::new(steps);
/// assert_eq!(seq.sample(0.0), 0.5);
/// assert!(seq.gate().is_open());
/// assert_eq!(seq.sample(1.5), 0.5);
/// assert!(!seq.gate().is_open());
/// assert_eq!(seq.sample(2.6), 0.25);
/// ```
pub struct Sequencer<I> {
    steps: I,
    until: f64,
    value: f64,
    trigger: Trigger,
    gate: Gate,
    frequency: bool,
    exhausted: bool,
}

pub type BoxedSequencer = Sequencer<Box<dyn Iterator<Item = Event>>>;

impl<I: Iterator<Item = Event>> Sequencer<I> {
    pub fn new(steps: impl IntoIterator<IntoIter = I, Item = Event>) -> Self {
        Self {
            steps: steps.into_iter(),
            until: -1.0,
            value: 0.0,
            trigger: Trigger::new(),
            gate: Gate::new(),
            frequency: false,
            exhausted: false,
        }
    }

    /// A sequencer of pitches. Values pass through the frequency channel rule
    /// and the output is measured in Hz.
    pub fn frequencies(steps: impl IntoIterator<IntoIter = I, Item = Event>) -> Self {
        Self {
            frequency: true,
            ..Self::new(steps)
        }
    }

    /// The trigger fired at the start of each note.
    pub fn trigger(&self) -> Trigger {
        self.trigger.clone()
    }

    /// The gate that is open during notes and closed during rests.
    pub fn gate(&self) -> Gate {
        self.gate.clone()
    }

    /// The value currently held.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Whether all events have been played.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn advance(&mut self, t: f64) {
        match self.steps.next() {
            Some(event) => {
                trace!("t={:.4}: {:?}", t, event);
                match event.value {
                    Some(value) => {
                        self.value = if self.frequency {
                            frequency_value(value)
                        } else {
                            value
                        };
                        self.trigger.fire();
                        self.gate.on();
                    }
                    None => self.gate.off(),
                }
                self.until = t + event.duration;
            }
            None => {
                debug!("sequence finished at t={:.4}", t);
                self.gate.off();
                self.exhausted = true;
            }
        }
    }
}

impl<I: Iterator<Item = Event>> Signal for Sequencer<I> {
    fn sample(&mut self, t: f64) -> f64 {
        if !self.exhausted && t > self.until {
            self.advance(t);
        }
        self.value
    }

    fn is_frequency(&self) -> bool {
        self.frequency
    }
}
