// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Synthesis from a graph of small, stateful signals.
//!
//! ```
//! use sigsynth::envelope::ADSR;
//! use sigsynth::pianoroll::PianoRoll;
//! use sigsynth::sampler::Sampler;
//! use sigsynth::synthesis::{Synth, Timbre};
//!
//! let synth = Synth::new(Timbre::Fm { ratio: 2.0, index: 1.0 })
//!     .with_envelope(ADSR::new(0.01, 0.05, 0.6, 0.1));
//! let voice = synth.voice(PianoRoll::new(120.0, "C4 E4 G4 /2 C5"));
//! let samples: Vec<f64> = Sampler::new(voice, 22050).with_duration(1.0).collect();
//! assert_eq!(samples.len(), 22050);
//! assert!(samples.iter().all(|x| x.abs() <= 1.0));
//! ```

pub mod envelope;
pub mod oscillator;
pub mod output;
pub mod pianoroll;
pub mod pitch;
pub mod ramp;
pub mod sampler;
pub mod sequencer;
pub mod signal;
pub mod synthesis;
pub mod trigger;

// Utility modules
pub mod rational;
pub mod util;

pub use signal::{IntoSig, Sig, Signal};
