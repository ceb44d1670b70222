// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! `sigsynth` renders piano roll scores to a sound file or the speakers.

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use log::{debug, info};
use structopt::StructOpt;

use sigsynth::envelope::ADSR;
use sigsynth::output::{self, sox};
use sigsynth::pianoroll::PianoRoll;
use sigsynth::sampler::Sampler;
use sigsynth::signal::{amp, Sig};
use sigsynth::synthesis::{Mixer, Synth, Timbre, Vibrato};
use sigsynth::util::from_decibels;

#[derive(Debug, StructOpt)]
#[structopt(name = "sigsynth", about = "Playing piano rolls through a signal graph")]
struct Opt {
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    verbose: usize,

    /// Piano roll scores, one voice each. Arguments starting with `@` name a file to read.
    #[structopt(required = true)]
    scores: Vec<String>,

    /// Bars per minute. A bar lasts 60/tempo seconds and `/N` is its Nth part.
    #[structopt(short, long, default_value = "60")]
    tempo: f64,

    /// Samples per second.
    #[structopt(short, long, default_value = "44100")]
    rate: u32,

    /// sine, cosine, saw, square, triangle, fourier-saw:N, fourier-square:N,
    /// fourier-triangle:N, fm:RATIO,INDEX, am:FACTOR or rm:FREQUENCY
    #[structopt(long, default_value = "sine")]
    timbre: Timbre,

    /// Attack time in seconds.
    #[structopt(long, default_value = "0.1")]
    attack: f64,

    /// Decay time in seconds.
    #[structopt(long, default_value = "0.1")]
    decay: f64,

    /// Sustain level.
    #[structopt(long, default_value = "0.5")]
    sustain: f64,

    /// Release time in seconds.
    #[structopt(long, default_value = "0.1")]
    release: f64,

    /// Vibrato as RATE,CENTS, e.g. 6,50
    #[structopt(long)]
    vibrato: Option<Vibrato>,

    /// Volume change in decibels.
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    gain: f64,

    /// Seconds to render. Defaults to the length of the longest score plus the release time.
    #[structopt(short, long)]
    duration: Option<f64>,

    /// Output file, raw 16 bit PCM if it ends in `.raw` and WAV otherwise.
    /// Music is played directly if not given.
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
}

fn read_score(score: &str) -> std::io::Result<String> {
    match score.strip_prefix('@') {
        Some(path) => fs::read_to_string(path),
        None => Ok(score.to_string()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let opt = Opt::from_args();

    let level = match opt.verbose {
        0 => log::Level::Info,
        1 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    simple_logger::init_with_level(level)?;

    let mut synth = Synth::new(opt.timbre).with_envelope(ADSR::new(
        opt.attack,
        opt.decay,
        opt.sustain,
        opt.release,
    ));
    if let Some(vibrato) = opt.vibrato {
        synth = synth.with_vibrato(vibrato);
    }

    let mut length: f64 = 0.0;
    let mut voices = Vec::new();
    for score in &opt.scores {
        let roll = PianoRoll::new(opt.tempo, read_score(score)?);
        let score_length = roll.total_duration();
        debug!("score of {:.2}s: {}", score_length, score);
        length = length.max(score_length);
        voices.push(synth.voice(roll));
    }
    let duration = opt.duration.unwrap_or(length + opt.release);
    info!(
        "Rendering {} voice(s) with {} for {:.2}s at {} Hz",
        voices.len(),
        opt.timbre,
        duration,
        opt.rate
    );

    let mix: Sig = amp(from_decibels(opt.gain), Sig::new(Mixer::new(voices)));
    let samples = Sampler::new(mix, opt.rate).with_duration(duration);

    match opt.output {
        Some(path) => output::write_file(&path, samples, opt.rate)?,
        None => sox::play(samples, opt.rate, (opt.rate / 4).max(1) as usize)?,
    };
    Ok(())
}
