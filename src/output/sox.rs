// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Play audio on the speakers using a sox subprocess.

use std::io::{self, Write};
use std::process::{Command, Stdio};

use log::{debug, info, warn};
use snafu::ResultExt;

use super::{pcm_chunks, OutputError, Playback};

/// Run `play` reading mono 16 bit PCM from its standard input,
/// and hand that input to the callback.
pub fn with_sox_player<R, F: FnOnce(&mut dyn Write) -> io::Result<R>>(
    sample_rate: u32,
    callback: F,
) -> io::Result<R> {
    let mut player = Command::new("play")
        .arg("--channels")
        .arg("1")
        .arg("--rate")
        .arg(sample_rate.to_string())
        .arg("--type")
        .arg("s16")
        .arg("/dev/stdin")
        .stdin(Stdio::piped())
        .spawn()?;

    let mut audio_stream = player
        .stdin
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "player has no stdin"))?;

    let result = callback(&mut audio_stream);

    drop(audio_stream);
    player.wait()?;

    result
}

/// Stream samples to the speakers in chunks of `period` samples.
/// Blocks until everything has been played and returns the number of samples written.
pub fn play(
    samples: impl IntoIterator<Item = f64>,
    sample_rate: u32,
    period: usize,
) -> Result<u64, OutputError> {
    let total = with_sox_player(sample_rate, |out| write_chunks(out, samples, period))
        .context(Playback)?;
    info!("Played {} samples", total);
    Ok(total)
}

/// Write PCM chunks, reporting each one.
fn write_chunks(
    out: &mut dyn Write,
    samples: impl IntoIterator<Item = f64>,
    period: usize,
) -> io::Result<u64> {
    let mut total = 0;
    let mut bytes = Vec::with_capacity(period * 2);
    for chunk in pcm_chunks(samples, period) {
        bytes.clear();
        for sample in &chunk {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        let written = out.write(&bytes)?;
        if written != bytes.len() {
            warn!("Only wrote {}/{} samples", written / 2, period);
            out.write_all(&bytes[written..])?;
        }
        total += period as u64;
        debug!("wrote {} samples, {} total", period, total);
    }
    out.flush()?;
    Ok(total)
}
