// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Ready made instruments built from the basic signals.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use snafu::Snafu;

use crate::envelope::{Envelope, ADSR};
use crate::oscillator::{cosine, sine, Oscillator, Waveform};
use crate::sequencer::{BoxedSequencer, Event, Sequencer};
use crate::signal::{amp, bias, mult, Frequency, IntoSig, Sig, Signal};

/// Frequency ratio of one cent, minus one.
const CENT: f64 = 0.0005946;

/// Frequency modulation.
///
/// A sine modulator at `ratio` times the carrier frequency deviates the carrier
/// by up to `index` times the modulator frequency. The carrier is a cosine.
pub fn fm(frequency: impl IntoSig, ratio: impl IntoSig, index: impl IntoSig) -> Sig {
    let carrier = Frequency::channel(frequency);
    let modulator_frequency = mult(ratio, &carrier);
    let deviation = mult(index, &modulator_frequency);
    let modulator = mult(deviation, sine(modulator_frequency));
    cosine(bias(modulator, carrier))
}

/// Amplitude modulation of a sine by another sine at `factor` times its frequency.
pub fn am(frequency: impl IntoSig, factor: impl IntoSig) -> Sig {
    let carrier = Frequency::channel(frequency);
    let modulator = sine(mult(factor, &carrier));
    amp(modulator, sine(carrier))
}

/// Ring modulation of a sine by a sine at a fixed frequency.
pub fn rm(frequency: impl IntoSig, modulator: impl IntoSig) -> Sig {
    mult(sine(modulator), sine(frequency))
}

/// Periodically detune a frequency by up to `cents` at `rate` Hz.
pub fn vibrato(frequency: impl IntoSig, rate: impl IntoSig, cents: impl IntoSig) -> Sig {
    let depth = mult(mult(CENT, cents), sine(rate));
    mult(bias(1.0, depth), Frequency::channel(frequency))
}

/// Averages its inputs.
///
/// ```
/// use sigsynth::signal::Signal;
/// use sigsynth::synthesis::Mixer;
///
/// let mut mixer = Mixer::new(vec![0.5, -0.25, 0.0]);
/// assert_eq!(mixer.sample(0.0), 0.25 / 3.0);
///
/// let mut weighted = Mixer::weighted(vec![(1.0, 3.0), (-1.0, 1.0)]);
/// assert_eq!(weighted.sample(0.0), 0.5);
/// ```
pub struct Mixer {
    inputs: Vec<(Sig, f64)>,
    total_weight: f64,
}

impl Mixer {
    /// Mix all inputs with the same weight.
    pub fn new<S: IntoSig>(inputs: impl IntoIterator<Item = S>) -> Self {
        Self::weighted(inputs.into_iter().map(|input| (input, 1.0)))
    }

    /// Mix the inputs with the given weights.
    /// The output is the weighted sum divided by the total weight.
    pub fn weighted<S: IntoSig>(inputs: impl IntoIterator<Item = (S, f64)>) -> Self {
        let inputs: Vec<(Sig, f64)> = inputs
            .into_iter()
            .map(|(input, weight)| (input.into_sig(), weight))
            .collect();
        let total_weight = inputs.iter().map(|(_, weight)| weight).sum();
        Self {
            inputs,
            total_weight,
        }
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl Signal for Mixer {
    fn sample(&mut self, t: f64) -> f64 {
        if self.total_weight == 0.0 {
            return 0.0;
        }
        let sum: f64 = self
            .inputs
            .iter()
            .map(|(input, weight)| weight * input.sample(t))
            .sum();
        sum / self.total_weight
    }
}

/// Errors when parsing instrument parameters from text.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParseParamsError {
    #[snafu(display("Unknown timbre {:?}", name))]
    UnknownTimbre { name: String },
    #[snafu(display("Invalid number {:?}", text))]
    InvalidNumber { text: String },
    #[snafu(display("Timbre {:?} expects {} parameter(s)", name, expected))]
    WrongArgumentCount { name: String, expected: usize },
}

/// The sound of an instrument, i.e. what turns a frequency into a wave.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Timbre {
    Wave(Waveform),
    Fm { ratio: f64, index: f64 },
    Am { factor: f64 },
    Rm { frequency: f64 },
}

impl Timbre {
    pub fn build(self, frequency: impl IntoSig) -> Sig {
        match self {
            Timbre::Wave(waveform) => Sig::new(Oscillator::new(waveform, frequency)),
            Timbre::Fm { ratio, index } => fm(frequency, ratio, index),
            Timbre::Am { factor } => am(frequency, factor),
            Timbre::Rm { frequency: fixed } => rm(frequency, fixed),
        }
    }
}

impl Default for Timbre {
    fn default() -> Self {
        Timbre::Wave(Waveform::Sine)
    }
}

impl fmt::Display for Timbre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timbre::Wave(Waveform::Sine) => write!(f, "sine"),
            Timbre::Wave(Waveform::Cosine) => write!(f, "cosine"),
            Timbre::Wave(Waveform::Saw) => write!(f, "saw"),
            Timbre::Wave(Waveform::Square) => write!(f, "square"),
            Timbre::Wave(Waveform::Triangle) => write!(f, "triangle"),
            Timbre::Wave(Waveform::FourierSaw(n)) => write!(f, "fourier-saw:{}", n),
            Timbre::Wave(Waveform::FourierSquare(n)) => write!(f, "fourier-square:{}", n),
            Timbre::Wave(Waveform::FourierTriangle(n)) => write!(f, "fourier-triangle:{}", n),
            Timbre::Fm { ratio, index } => write!(f, "fm:{},{}", ratio, index),
            Timbre::Am { factor } => write!(f, "am:{}", factor),
            Timbre::Rm { frequency } => write!(f, "rm:{}", frequency),
        }
    }
}

/// Parse comma separated numbers, requiring exactly `expected` of them.
fn parse_args<T: FromStr>(name: &str, args: &str, expected: usize) -> Result<Vec<T>, ParseParamsError> {
    let values = args
        .split(',')
        .filter(|arg| !arg.is_empty())
        .map(|arg| {
            arg.trim().parse().map_err(|_| ParseParamsError::InvalidNumber {
                text: arg.to_string(),
            })
        })
        .collect::<Result<Vec<T>, _>>()?;
    if values.len() == expected {
        Ok(values)
    } else {
        Err(ParseParamsError::WrongArgumentCount {
            name: name.to_string(),
            expected,
        })
    }
}

/// Parses `sine`, `cosine`, `saw`, `square`, `triangle`, `fourier-saw:N`,
/// `fourier-square:N`, `fourier-triangle:N`, `fm:RATIO,INDEX`, `am:FACTOR` and `rm:FREQUENCY`.
/// The modulation timbres may omit their parameters, which default to `fm:1,1`, `am:2` and `rm:50`.
///
/// ```
/// use sigsynth::oscillator::Waveform;
/// use sigsynth::synthesis::Timbre;
///
/// assert_eq!("saw".parse(), Ok(Timbre::Wave(Waveform::Saw)));
/// assert_eq!("fourier-square:8".parse(), Ok(Timbre::Wave(Waveform::FourierSquare(8))));
/// assert_eq!("fm:2,1.5".parse(), Ok(Timbre::Fm { ratio: 2.0, index: 1.5 }));
/// assert!("fm:2".parse::<Timbre>().is_err());
/// ```
impl FromStr for Timbre {
    type Err = ParseParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, args) = match s.find(':') {
            Some(pos) => (&s[..pos], &s[pos + 1..]),
            None => (s, ""),
        };
        let waveform = |w: Waveform| -> Result<Self, Self::Err> { Ok(Timbre::Wave(w)) };
        match name {
            "sine" if args.is_empty() => waveform(Waveform::Sine),
            "cosine" if args.is_empty() => waveform(Waveform::Cosine),
            "saw" if args.is_empty() => waveform(Waveform::Saw),
            "square" if args.is_empty() => waveform(Waveform::Square),
            "triangle" if args.is_empty() => waveform(Waveform::Triangle),
            "fourier-saw" => waveform(Waveform::FourierSaw(parse_args(name, args, 1)?[0])),
            "fourier-square" => waveform(Waveform::FourierSquare(parse_args(name, args, 1)?[0])),
            "fourier-triangle" => {
                waveform(Waveform::FourierTriangle(parse_args(name, args, 1)?[0]))
            }
            "fm" if args.is_empty() => Ok(Timbre::Fm {
                ratio: 1.0,
                index: 1.0,
            }),
            "am" if args.is_empty() => Ok(Timbre::Am { factor: 2.0 }),
            "rm" if args.is_empty() => Ok(Timbre::Rm { frequency: 50.0 }),
            "fm" => {
                let args = parse_args(name, args, 2)?;
                Ok(Timbre::Fm {
                    ratio: args[0],
                    index: args[1],
                })
            }
            "am" => Ok(Timbre::Am {
                factor: parse_args(name, args, 1)?[0],
            }),
            "rm" => Ok(Timbre::Rm {
                frequency: parse_args(name, args, 1)?[0],
            }),
            _ => Err(ParseParamsError::UnknownTimbre {
                name: s.to_string(),
            }),
        }
    }
}

/// Vibrato settings, parsed from `RATE,CENTS`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vibrato {
    /// Oscillations per second.
    pub rate: f64,
    /// Maximum detuning.
    pub cents: f64,
}

impl Vibrato {
    pub fn apply(self, frequency: Sig) -> Sig {
        vibrato(frequency, self.rate, self.cents)
    }
}

impl Default for Vibrato {
    fn default() -> Self {
        Self {
            rate: 6.0,
            cents: 50.0,
        }
    }
}

impl FromStr for Vibrato {
    type Err = ParseParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let args = parse_args("vibrato", s, 2)?;
        Ok(Self {
            rate: args[0],
            cents: args[1],
        })
    }
}

/// Transforms the frequency of a voice before it reaches the oscillator.
pub type Modifier = Rc<dyn Fn(Sig) -> Sig>;

/// Builds monophonic voices that play a sequence of notes.
#[derive(Clone, Default)]
pub struct Synth {
    pub timbre: Timbre,
    pub modifier: Option<Modifier>,
    pub envelope: ADSR,
}

impl Synth {
    pub fn new(timbre: Timbre) -> Self {
        Self {
            timbre,
            ..Self::default()
        }
    }

    pub fn with_envelope(mut self, envelope: ADSR) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn with_modifier(mut self, modifier: impl Fn(Sig) -> Sig + 'static) -> Self {
        self.modifier = Some(Rc::new(modifier));
        self
    }

    pub fn with_vibrato(self, settings: Vibrato) -> Self {
        self.with_modifier(move |frequency| settings.apply(frequency))
    }

    /// Create a voice playing the given notes. The values of the events are frequencies.
    pub fn voice<I>(&self, steps: I) -> Voice
    where
        I: IntoIterator<Item = Event>,
        I::IntoIter: 'static,
    {
        let steps: Box<dyn Iterator<Item = Event>> = Box::new(steps.into_iter());
        let sequencer = Rc::new(RefCell::new(Sequencer::frequencies(steps)));
        let (trigger, gate) = {
            let sequencer = sequencer.borrow();
            (sequencer.trigger(), sequencer.gate())
        };

        let mut frequency = Sig::from(sequencer.clone());
        if let Some(modifier) = &self.modifier {
            frequency = modifier(frequency);
        }
        let oscillator = self.timbre.build(frequency);
        let envelope = Rc::new(RefCell::new(self.envelope.instantiate(trigger, gate)));
        // the oscillator pulls the sequencer before the envelope reads its trigger
        let output = amp(oscillator, envelope.clone());

        Voice {
            output,
            sequencer,
            envelope,
        }
    }
}

/// A voice created by [`Synth::voice`].
pub struct Voice {
    pub output: Sig,
    pub sequencer: Rc<RefCell<BoxedSequencer>>,
    pub envelope: Rc<RefCell<Envelope>>,
}

impl Voice {
    /// Whether all notes have been played and released.
    pub fn is_finished(&self) -> bool {
        self.sequencer.borrow().is_exhausted() && self.envelope.borrow().is_released()
    }
}

impl IntoSig for Voice {
    fn into_sig(self) -> Sig {
        self.output
    }
}

impl IntoSig for &Voice {
    fn into_sig(self) -> Sig {
        self.output.clone()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::signal::hz;
    use float_cmp::approx_eq;

    const RATE: f64 = 8000.0;

    fn render(signal: &Sig, count: usize) -> Vec<f64> {
        (0..count).map(|i| signal.sample(i as f64 / RATE)).collect()
    }

    #[test]
    fn mixer_identity() {
        for &n in &[1, 3] {
            let voice = sine(440.0);
            let reference = sine(440.0);
            let mut mixer = Mixer::new(vec![&voice; n]);
            for i in 0..100 {
                let t = i as f64 / RATE;
                assert!(approx_eq!(f64, mixer.sample(t), reference.sample(t), epsilon = 1e-12));
            }
        }
    }

    #[test]
    fn mixer_identity_with_shared_voices() {
        let synth = Synth::new(Timbre::Fm {
            ratio: 2.0,
            index: 1.0,
        })
        .with_envelope(ADSR::new(0.01, 0.02, 0.6, 0.03));
        let notes = || vec![Event::note(440.0, 0.05), Event::rest(0.02), Event::note(330.0, 0.05)];

        for &n in &[1, 4] {
            let voice = synth.voice(notes());
            let reference = synth.voice(notes());
            let mut mixer = Mixer::new(vec![&voice; n]);
            // covers attack, sustain, the rest and the release of the second note
            for i in 0..1600 {
                let t = i as f64 / RATE;
                let expected = reference.output.sample(t);
                assert!(
                    approx_eq!(f64, mixer.sample(t), expected, epsilon = 1e-12),
                    "{} voices differ at t={}",
                    n,
                    t
                );
            }
        }
    }

    #[test]
    fn empty_mixer_is_silent() {
        let mut mixer = Mixer::new(Vec::<Sig>::new());
        assert!(mixer.is_empty());
        assert_eq!(mixer.sample(0.0), 0.0);
    }

    #[test]
    fn fm_with_zero_index_is_a_cosine() {
        let plain = cosine(hz(440.0));
        let modulated = fm(440.0, 2.0, 0.0);
        for (a, b) in render(&plain, 200).into_iter().zip(render(&modulated, 200)) {
            assert!(approx_eq!(f64, a, b, epsilon = 1e-9));
        }
    }

    #[test]
    fn ring_modulation_multiplies() {
        let product = rm(440.0, 50.0);
        let carrier = sine(440.0);
        let modulator = sine(50.0);
        for i in 0..200 {
            let t = i as f64 / RATE;
            let expected = modulator.sample(t) * carrier.sample(t);
            assert!(approx_eq!(f64, product.sample(t), expected, epsilon = 1e-12));
        }
    }

    #[test]
    fn modulated_outputs_stay_in_range() {
        for timbre in &["am:2", "rm:50", "fm:3,2", "fourier-triangle:5"] {
            let timbre: Timbre = timbre.parse().unwrap();
            let out = timbre.build(220.0);
            for value in render(&out, 1000) {
                assert!(value.abs() <= 1.0 + 1e-9, "{} out of range: {}", timbre, value);
            }
        }
    }

    #[test]
    fn vibrato_detunes_within_bounds() {
        let f = vibrato(440.0, 6.0, 50.0);
        assert!(f.is_frequency());
        let limit = 440.0 * CENT * 50.0 + 1e-9;
        let mut largest: f64 = 0.0;
        for i in 0..2000 {
            let deviation = (f.sample(i as f64 / RATE) - 440.0).abs();
            assert!(deviation <= limit);
            largest = largest.max(deviation);
        }
        assert!(largest > limit * 0.9);
    }

    #[test]
    fn timbre_names_round_trip() {
        for name in &["sine", "triangle", "fourier-saw:16", "fm:2,1.5", "am:3", "rm:50"] {
            let timbre: Timbre = name.parse().unwrap();
            assert_eq!(&timbre.to_string(), name);
        }
        assert_eq!(
            "organ".parse::<Timbre>(),
            Err(ParseParamsError::UnknownTimbre {
                name: "organ".to_string()
            })
        );
        assert_eq!(
            "am:x".parse::<Timbre>(),
            Err(ParseParamsError::InvalidNumber {
                text: "x".to_string()
            })
        );
        assert!("sine:3".parse::<Timbre>().is_err());
        assert_eq!("am".parse(), Ok(Timbre::Am { factor: 2.0 }));
        assert_eq!("6,25".parse(), Ok(Vibrato { rate: 6.0, cents: 25.0 }));
    }

    #[test]
    fn voice_plays_and_releases() {
        let synth = Synth::new(Timbre::Wave(Waveform::Square))
            .with_envelope(ADSR::new(0.01, 0.01, 0.5, 0.05));
        let voice = synth.voice(vec![Event::note(440.0, 0.1), Event::rest(0.1)]);

        let samples = render(&voice.output, 400);
        // during sustain, the square wave is scaled to the sustain level
        assert!(samples[200..400]
            .iter()
            .all(|value| approx_eq!(f64, value.abs(), 0.5)));
        assert!(!voice.is_finished());

        for i in 400..3200 {
            voice.output.sample(i as f64 / RATE);
        }
        assert!(voice.is_finished());
        assert!(voice.output.sample(0.4).abs() < 1e-9);
    }

    #[test]
    fn voice_modifier_sees_frequency() {
        let synth = Synth::default().with_modifier(|frequency| mult(2.0, frequency));
        let voice = synth.voice(vec![Event::note(0.0, 1.0)]);
        voice.output.sample(0.0);
        // 0.0 is read as a bipolar value
        assert_eq!(voice.sequencer.borrow().value(), 5500.0);
    }
}
