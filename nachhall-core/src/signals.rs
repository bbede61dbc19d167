//! Dry test signals to feed into a room.

mod noise;
mod sweep;

use std::path::Path;

pub use noise::WhiteNoise;
pub use sweep::ExponentialSweep;

use crate::{
    wav::{write_wav, BitDepth},
    WavError,
};

pub trait FiniteSignal: Send + Sync + ExactSizeIterator<Item = f32> {}

impl<T> FiniteSignal for T where T: Send + Sync + ExactSizeIterator<Item = f32> {}

/// Writes a generated signal as a mono 32 bit float file.
pub fn write_signal(
    signal: impl FiniteSignal,
    sample_rate: u32,
    path: impl AsRef<Path>,
) -> Result<(), WavError> {
    let data: Vec<f32> = signal.collect();

    write_wav(path, &[data], sample_rate, false, BitDepth::Float32)
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;
    use crate::wav::read_wav;

    #[test]
    fn written_signal_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.wav");
        let sweep = ExponentialSweep::new(50.0, 7_000.0, 0.5, Duration::from_millis(250), 16_000);
        let expected: Vec<f32> = sweep.clone().collect();

        write_signal(sweep, 16_000, &path).unwrap();
        let signal = read_wav(&path).unwrap();

        assert_eq!(signal.sample_rate(), 16_000);
        assert_eq!(signal.samples(), expected.as_slice());
    }
}
