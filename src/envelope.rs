// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

use crate::signal::{IntoSig, Sig, Signal};
use crate::trigger::is_high;

/// Lower bound for the duration of the attack, decay and release stages in seconds.
pub const MIN_STAGE_SECONDS: f64 = 1e-6;

/// Envelope levels below this are considered silent (about -80 dB).
pub const SILENCE_THRESHOLD: f64 = 1e-4;

/// The parameters of an Attack-Decay-Sustain-Release envelope.
///
/// When triggered, the amplitude rises towards one over `attack` seconds, then
/// falls over `decay` seconds to the `sustain` level where it is held while the
/// gate stays open. When the gate closes, it falls towards zero over `release` seconds.
/// All parameters are signals and may change over time.
#[derive(Debug, Clone)]
pub struct ADSR {
    /// Time in seconds to go from the current level to 1.0
    pub attack: Sig,
    /// Time in seconds to go from 1.0 to `sustain`.
    pub decay: Sig,
    /// Amplitude while the gate is open.
    pub sustain: Sig,
    /// Time in seconds to go from the current level to 0.0.
    pub release: Sig,
}

impl ADSR {
    pub fn new(
        attack: impl IntoSig,
        decay: impl IntoSig,
        sustain: impl IntoSig,
        release: impl IntoSig,
    ) -> Self {
        Self {
            attack: attack.into_sig(),
            decay: decay.into_sig(),
            sustain: sustain.into_sig(),
            release: release.into_sig(),
        }
    }

    /// Create an envelope following these parameters, driven by a trigger and a gate.
    ///
    /// # Example
    ///
    /// ```
    /// use sigsynth::envelope::ADSR;
    /// use sigsynth::signal::Signal;
    /// use sigsynth::trigger::{Gate, Trigger};
    ///
    /// let (trigger, gate) = (Trigger::new(), Gate::new());
    /// let mut env = ADSR::new(0.25, 0.5, 0.75, 1.0).instantiate(trigger.clone(), gate.clone());
    ///
    /// trigger.fire();
    /// gate.on();
    /// assert_eq!(env.sample(0.0), 0.0);
    /// assert_eq!(env.sample(0.125), 1.0);
    /// assert_eq!(env.sample(0.25), 1.0);
    /// assert_eq!(env.sample(0.5), 0.875);
    /// assert_eq!(env.sample(1.0), 0.75);
    ///
    /// gate.off();
    /// assert_eq!(env.sample(1.125), 0.65625);
    /// assert_eq!(env.sample(1.375), 0.4375);
    /// assert_eq!(env.sample(2.125), 0.0);
    /// ```
    pub fn instantiate(&self, trigger: impl IntoSig, gate: impl IntoSig) -> Envelope {
        Envelope {
            params: self.clone(),
            trigger: trigger.into_sig(),
            gate: gate.into_sig(),
            start_attack: None,
            start_release: None,
            last_sample: 0.0,
            last_t: 0.0,
        }
    }
}

impl Default for ADSR {
    fn default() -> Self {
        Self::new(0.1, 0.1, 0.5, 0.1)
    }
}

/// An ADSR envelope evaluated over time.
///
/// Attack and release approach their targets from wherever the envelope
/// currently is, so retriggering a sounding note does not cause a jump.
/// Each step covers the time since the previous sample, clamped so it
/// never passes the target.
pub struct Envelope {
    params: ADSR,
    trigger: Sig,
    gate: Sig,
    start_attack: Option<f64>,
    start_release: Option<f64>,
    last_sample: f64,
    last_t: f64,
}

impl Envelope {
    pub fn last_sample(&self) -> f64 {
        self.last_sample
    }

    /// Whether the envelope has died down below `threshold`.
    pub fn is_silent(&self, threshold: f64) -> bool {
        self.last_sample.abs() < threshold
    }

    /// Whether the gate was closed at the last sample and the envelope has died
    /// down below [`SILENCE_THRESHOLD`].
    pub fn is_released(&self) -> bool {
        self.start_release.is_some() && self.is_silent(SILENCE_THRESHOLD)
    }
}

impl Signal for Envelope {
    fn sample(&mut self, t: f64) -> f64 {
        debug_assert!(
            t >= self.last_t,
            "envelope sampled at {} after {}",
            t,
            self.last_t
        );
        let trigger = self.trigger.sample(t);
        let gate = self.gate.sample(t);
        let sustain = self.params.sustain.sample(t);

        if is_high(trigger) {
            self.start_attack = Some(t);
            self.start_release = None;
        }

        let sample = if is_high(gate) {
            self.start_release = None;
            // opening the gate without a trigger starts the attack as well
            let start_attack = *self.start_attack.get_or_insert(t);
            let attack = stage_length(self.params.attack.sample(t));
            let decay = stage_length(self.params.decay.sample(t));
            let start_decay = start_attack + attack;
            let start_sustain = start_decay + decay;

            if t < start_decay {
                let last = self.last_sample;
                (last + (1.0 - last) / (start_decay - t) * (t - self.last_t)).min(1.0)
            } else if t < start_sustain {
                1.0 - (t - start_decay) * (1.0 - sustain) / decay
            } else {
                sustain
            }
        } else {
            self.start_attack = None;
            let start_release = *self.start_release.get_or_insert(t);
            if self.last_sample == 0.0 {
                0.0
            } else {
                let end = start_release + stage_length(self.params.release.sample(t));
                if t < end {
                    let last = self.last_sample;
                    (last - last / (end - t) * (t - self.last_t)).max(0.0)
                } else {
                    0.0
                }
            }
        };

        self.last_sample = sample;
        self.last_t = t;
        sample
    }
}

fn stage_length(seconds: f64) -> f64 {
    seconds.max(MIN_STAGE_SECONDS)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::trigger::{Gate, Trigger};
    use float_cmp::approx_eq;

    const RATE: f64 = 1000.0;

    fn envelope(params: ADSR) -> (Envelope, Trigger, Gate) {
        let trigger = Trigger::new();
        let gate = Gate::new();
        let env = params.instantiate(trigger.clone(), gate.clone());
        (env, trigger, gate)
    }

    /// Sample the envelope for the samples in `range`, returning the last value.
    fn run(env: &mut Envelope, range: std::ops::Range<usize>) -> f64 {
        range.map(|i| env.sample(i as f64 / RATE)).last().unwrap_or(0.0)
    }

    #[test]
    fn idle_envelope_is_silent() {
        let (mut env, _, _) = envelope(ADSR::default());
        assert_eq!(run(&mut env, 0..100), 0.0);
        assert!(env.is_silent(SILENCE_THRESHOLD));
    }

    #[test]
    fn converges_to_sustain() {
        let (mut env, trigger, gate) = envelope(ADSR::new(0.01, 0.02, 0.5, 0.05));
        trigger.fire();
        gate.on();

        let mut last = 0.0;
        for i in 0..10 {
            let value = env.sample(i as f64 / RATE);
            assert!(value >= last, "attack must rise");
            assert!(value <= 1.0);
            last = value;
        }
        // half way through the decay
        assert!(approx_eq!(f64, run(&mut env, 10..21), 0.75, epsilon = 1e-9));
        assert!(approx_eq!(f64, run(&mut env, 21..100), 0.5));
    }

    #[test]
    fn release_decays_towards_zero() {
        let (mut env, trigger, gate) = envelope(ADSR::new(0.01, 0.02, 0.5, 0.05));
        trigger.fire();
        gate.on();
        run(&mut env, 0..100);
        gate.off();

        let mut last = env.last_sample();
        for i in 100..140 {
            let value = env.sample(i as f64 / RATE);
            assert!(value <= last && value >= 0.0);
            last = value;
        }
        assert!(last < 0.25);
        let tail = run(&mut env, 140..300);
        assert!(tail.abs() < 1e-3);
        assert!(env.is_released());
        assert_eq!(run(&mut env, 300..400), 0.0);
    }

    #[test]
    fn retrigger_starts_from_current_level() {
        let (mut env, trigger, gate) = envelope(ADSR::new(0.05, 0.05, 0.8, 0.1));
        trigger.fire();
        gate.on();
        run(&mut env, 0..200);
        gate.off();
        let released = run(&mut env, 200..230);
        assert!(released > 0.1 && released < 0.8);

        trigger.fire();
        gate.on();
        let next = env.sample(0.230);
        assert!(next > released && next < released + 0.1);
    }

    #[test]
    fn zero_length_stages_are_clamped() {
        let (mut env, trigger, gate) = envelope(ADSR::new(0.0, 0.0, 0.6, 0.0));
        trigger.fire();
        gate.on();
        for i in 0..10 {
            assert!(env.sample(i as f64 / RATE).is_finite());
        }
        assert_eq!(env.last_sample(), 0.6);
        gate.off();
        assert!(env.sample(0.010).is_finite());
        assert_eq!(env.sample(0.011), 0.0);
    }

    #[test]
    fn gate_without_trigger_starts_attack() {
        let (mut env, _, gate) = envelope(ADSR::new(0.01, 0.01, 0.3, 0.01));
        gate.on();
        assert!(approx_eq!(f64, run(&mut env, 0..50), 0.3));
    }

    #[test]
    fn reopening_the_gate_restarts_the_attack() {
        let (mut env, _, gate) = envelope(ADSR::new(0.01, 0.01, 0.5, 0.01));
        gate.on();
        run(&mut env, 0..50);
        gate.off();
        assert_eq!(run(&mut env, 50..100), 0.0);
        assert!(env.is_released());

        gate.on();
        assert!(approx_eq!(f64, env.sample(0.100), 0.1, epsilon = 1e-9));
        assert!(approx_eq!(f64, env.sample(0.101), 0.2, epsilon = 1e-9));
    }

    #[test]
    fn stage_starts_step_immediately() {
        let (mut env, trigger, gate) = envelope(ADSR::new(0.25, 0.5, 0.75, 1.0));
        trigger.fire();
        gate.on();
        assert_eq!(env.sample(0.0), 0.0);
        assert_eq!(env.sample(0.125), 1.0);
        run(&mut env, 1000..1001);
        assert_eq!(env.last_sample(), 0.75);

        // the first sample with the gate closed already falls
        gate.off();
        assert_eq!(env.sample(1.125), 0.65625);
        assert!(env.sample(1.5) < 0.65625);
        // coarse steps are clamped instead of overshooting
        assert_eq!(env.sample(2.0), 0.0);
    }
}
