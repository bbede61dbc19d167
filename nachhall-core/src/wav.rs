//! Reading and writing WAV files.

use std::path::Path;

use tracing::debug;

use crate::{Signal, WavError};

/// Sample format of a written file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BitDepth {
    #[default]
    Int16,
    Float32,
}

/// Reads a WAV file into a mono signal.
///
/// Integer samples are scaled to [-1, 1], several channels are averaged.
pub fn read_wav(path: impl AsRef<Path>) -> Result<Signal, WavError> {
    let file = std::fs::File::open(path)?;
    let mut reader =
        hound::WavReader::new(std::io::BufReader::new(file)).map_err(map_hound_error)?;

    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(map_hound_error)?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(map_hound_error)?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let data = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    debug!(
        sample_rate = spec.sample_rate,
        channels,
        bits = spec.bits_per_sample,
        samples = data.len(),
        "read wav file"
    );

    Ok(Signal::new(spec.sample_rate, data))
}

/// Writes `channels` interleaved into one file.
///
/// Shorter channels are padded with silence. With `normalize` the loudest
/// sample of all channels is scaled to full scale.
pub fn write_wav(
    path: impl AsRef<Path>,
    channels: &[Vec<f32>],
    sample_rate: u32,
    normalize: bool,
    bit_depth: BitDepth,
) -> Result<(), WavError> {
    if channels.is_empty() {
        return Err(WavError::NoChannels);
    }
    let n_channels =
        u16::try_from(channels.len()).map_err(|_| WavError::TooManyChannels(channels.len()))?;

    let (bits_per_sample, sample_format) = match bit_depth {
        BitDepth::Int16 => (16, hound::SampleFormat::Int),
        BitDepth::Float32 => (32, hound::SampleFormat::Float),
    };
    let spec = hound::WavSpec {
        channels: n_channels,
        sample_rate,
        bits_per_sample,
        sample_format,
    };

    let peak = channels
        .iter()
        .flatten()
        .fold(0.0f32, |peak, s| peak.max(s.abs()));
    let gain = if normalize && peak > 0.0 { 1.0 / peak } else { 1.0 };

    let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
    let mut writer = hound::WavWriter::create(path, spec).map_err(map_hound_error)?;

    for n in 0..frames {
        for channel in channels {
            let sample = channel.get(n).copied().unwrap_or(0.0) * gain;
            let written = match bit_depth {
                BitDepth::Int16 => {
                    let sample = (sample * i16::MAX as f32)
                        .round()
                        .clamp(i16::MIN as f32, i16::MAX as f32);
                    writer.write_sample(sample as i16)
                }
                BitDepth::Float32 => writer.write_sample(sample),
            };
            written.map_err(map_hound_error)?;
        }
    }

    writer.finalize().map_err(map_hound_error)?;

    debug!(channels = channels.len(), frames, sample_rate, ?bit_depth, "wrote wav file");

    Ok(())
}

pub(crate) fn map_hound_error(err: hound::Error) -> WavError {
    match err {
        hound::Error::IoError(error) => WavError::Io(error),
        other => WavError::Format(other.to_string()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn float_round_trip_keeps_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let data = vec![0.25, -0.5, 0.125, 0.0];

        write_wav(&path, &[data.clone()], 16_000, false, BitDepth::Float32).unwrap();
        let signal = read_wav(&path).unwrap();

        assert_eq!(signal.sample_rate(), 16_000);
        assert_eq!(signal.samples(), data.as_slice());
    }

    #[test]
    fn channels_are_padded_normalized_and_downmixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");

        write_wav(
            &path,
            &[vec![2.0, 1.0, 0.5], vec![0.0, 1.0]],
            8_000,
            true,
            BitDepth::Int16,
        )
        .unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.duration(), 3);
        let raw: Vec<i16> = reader.into_samples().map(Result::unwrap).collect();
        assert_eq!(raw, [i16::MAX, 0, 16384, 16384, 8192, 0]);

        let signal = read_wav(&path).unwrap();
        let expected = [0.5, 0.5, 0.125];
        assert_eq!(signal.len(), 3);
        for (s, e) in signal.iter().zip(expected) {
            assert!((s - e).abs() < 1e-3, "{s} vs {e}");
        }
    }

    #[test]
    fn nothing_to_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");

        assert!(matches!(
            write_wav(&path, &[], 8_000, true, BitDepth::Int16),
            Err(WavError::NoChannels)
        ));
        assert!(!path.exists());
    }

    #[test]
    fn read_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.wav");
        let garbage = dir.path().join("garbage.wav");
        std::fs::write(&garbage, b"definitely not a wav file").unwrap();

        assert!(matches!(read_wav(missing), Err(WavError::Io(_))));
        assert!(matches!(read_wav(garbage), Err(WavError::Format(_))));
    }
}
