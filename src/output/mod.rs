// sigsynth -- composable signal synthesis driven by text scores
// Copyright (C) 2021  Fabian Thorand
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation.
//
// A copy of the license can be found in the LICENSE file in the root of
// this repository.

//! Getting samples out of the process, as 16 bit PCM.

pub mod sox;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use snafu::{ResultExt, Snafu};

/// Largest magnitude of a PCM sample. The range is kept symmetric.
pub const PCM_MAX: i16 = 32767;

/// Errors when writing audio.
#[derive(Debug, Snafu)]
pub enum OutputError {
    #[snafu(display("Could not write {}: {}", path.display(), source))]
    WriteFile { path: PathBuf, source: io::Error },
    #[snafu(display("Could not encode {}: {}", path.display(), source))]
    EncodeWav {
        path: PathBuf,
        source: hound::Error,
    },
    #[snafu(display("Audio playback failed: {}", source))]
    Playback { source: io::Error },
}

/// Convert a sample to 16 bit PCM, saturating outside of `[-1, 1]`.
///
/// ```
/// use sigsynth::output::to_pcm;
///
/// assert_eq!(to_pcm(0.0), 0);
/// assert_eq!(to_pcm(0.5), 16384);
/// assert_eq!(to_pcm(-1.0), -32767);
/// assert_eq!(to_pcm(3.0), 32767);
/// assert_eq!(to_pcm(f64::NAN), 0);
/// ```
pub fn to_pcm(sample: f64) -> i16 {
    // the cast saturates and maps NaN to zero
    ((sample * PCM_MAX as f64).round() as i16).max(-PCM_MAX)
}

/// Groups samples into PCM chunks of a fixed size.
/// The last chunk is padded with silence.
pub struct PcmChunks<I> {
    samples: I,
    size: usize,
}

/// Convert samples to PCM in chunks of `size` samples.
///
/// ```
/// use sigsynth::output::pcm_chunks;
///
/// let chunks: Vec<Vec<i16>> = pcm_chunks(vec![1.0, -1.0, 0.0], 2).collect();
/// assert_eq!(chunks, vec![vec![32767, -32767], vec![0, 0]]);
/// ```
pub fn pcm_chunks<I: IntoIterator<Item = f64>>(samples: I, size: usize) -> PcmChunks<I::IntoIter> {
    assert!(size > 0, "Chunks must not be empty");
    PcmChunks {
        samples: samples.into_iter(),
        size,
    }
}

impl<I: Iterator<Item = f64>> Iterator for PcmChunks<I> {
    type Item = Vec<i16>;

    fn next(&mut self) -> Option<Vec<i16>> {
        let mut chunk: Vec<i16> = self.samples.by_ref().take(self.size).map(to_pcm).collect();
        if chunk.is_empty() {
            None
        } else {
            chunk.resize(self.size, 0);
            Some(chunk)
        }
    }
}

/// Write samples as headerless little endian 16 bit PCM.
/// Returns the number of samples written.
pub fn write_raw<W: Write>(writer: &mut W, samples: impl IntoIterator<Item = f64>) -> io::Result<u64> {
    let mut written = 0;
    for sample in samples {
        writer.write_all(&to_pcm(sample).to_le_bytes())?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

/// Write samples to a raw PCM file.
pub fn write_raw_file(
    path: &Path,
    samples: impl IntoIterator<Item = f64>,
) -> Result<u64, OutputError> {
    let file = File::create(path).context(WriteFile { path })?;
    write_raw(&mut BufWriter::new(file), samples).context(WriteFile { path })
}

/// Write samples as a mono 16 bit WAV file.
pub fn write_wav(
    path: &Path,
    samples: impl IntoIterator<Item = f64>,
    sample_rate: u32,
) -> Result<u64, OutputError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).context(EncodeWav { path })?;
    let mut written = 0;
    for sample in samples {
        writer
            .write_sample(to_pcm(sample))
            .context(EncodeWav { path })?;
        written += 1;
    }
    writer.finalize().context(EncodeWav { path })?;
    Ok(written)
}

/// Write samples to a file, as raw PCM if the extension is `raw`, and as WAV otherwise.
pub fn write_file(
    path: &Path,
    samples: impl IntoIterator<Item = f64>,
    sample_rate: u32,
) -> Result<u64, OutputError> {
    let raw = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("raw"));
    let written = if raw {
        write_raw_file(path, samples)?
    } else {
        write_wav(path, samples, sample_rate)?
    };
    info!(
        "Wrote {} samples ({:.2}s) to {}",
        written,
        written as f64 / sample_rate as f64,
        path.display()
    );
    Ok(written)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pcm_saturates() {
        assert_eq!(to_pcm(1.0), PCM_MAX);
        assert_eq!(to_pcm(1.5), PCM_MAX);
        assert_eq!(to_pcm(-1.5), -PCM_MAX);
        assert_eq!(to_pcm(-0.5), -16384);
        assert_eq!(to_pcm(1e-6), 0);
    }

    #[test]
    fn chunks_are_padded() {
        let chunks: Vec<Vec<i16>> = pcm_chunks((0..10).map(|_| 0.5), 4).collect();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|chunk| chunk.len() == 4));
        assert_eq!(chunks[2], vec![16384, 16384, 0, 0]);
        assert_eq!(pcm_chunks(Vec::new(), 4).count(), 0);
    }

    #[test]
    fn raw_is_little_endian() {
        let mut buffer = Vec::new();
        let written = write_raw(&mut buffer, vec![1.0, -1.0, 0.0]).unwrap();
        assert_eq!(written, 3);
        assert_eq!(buffer, vec![0xff, 0x7f, 0x01, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn files_by_extension() {
        let dir = std::env::temp_dir();
        let samples = vec![0.0, 0.25, -0.25, 1.0];

        let raw = dir.join(format!("sigsynth-test-{}.raw", std::process::id()));
        assert_eq!(write_file(&raw, samples.clone(), 8000).unwrap(), 4);
        assert_eq!(std::fs::metadata(&raw).unwrap().len(), 8);
        std::fs::remove_file(&raw).unwrap();

        let wav = dir.join(format!("sigsynth-test-{}.wav", std::process::id()));
        assert_eq!(write_file(&wav, samples, 8000).unwrap(), 4);
        let reader = hound::WavReader::open(&wav).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 8000);
        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![0, 8192, -8192, 32767]);
        std::fs::remove_file(&wav).unwrap();
    }

    #[test]
    fn missing_directory_is_reported() {
        let path = Path::new("/nonexistent-sigsynth-dir/out.raw");
        match write_file(path, vec![0.0], 8000) {
            Err(OutputError::WriteFile { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected {:?}", other),
        }
    }
}
