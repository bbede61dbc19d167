mod analysis;
mod convolve;
mod distance;
mod geometry;
mod impulse_response;
mod ism;
mod material;
mod metrics;
mod octave;
mod ray_tracing;
mod room;
mod sabine;
mod window;

pub mod signals;
pub mod wav;

pub use analysis::*;
pub use convolve::convolve;
pub use distance::angular_distance;
pub use geometry::*;
pub use impulse_response::*;
pub use material::*;
pub use metrics::{edt, rt60};
pub use octave::{OctaveBands, OCTAVE_CENTERS};
pub use ray_tracing::RayTracingOptions;
pub use room::*;
pub use sabine::inverse_sabine;

use thiserror::Error;

use std::{io, path::Path, slice::Iter};

/// A mono audio buffer together with the rate it was sampled at.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    sample_rate: u32,
    data: Vec<f32>,
}

impl Signal {
    pub fn new(sample_rate: u32, data: Vec<f32>) -> Self {
        Self { sample_rate, data }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WavError> {
        wav::read_wav(path)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.sample_rate as f64
    }

    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    pub fn iter(&self) -> Iter<'_, f32> {
        self.data.iter()
    }
}

impl From<Signal> for Vec<f32> {
    fn from(signal: Signal) -> Self {
        signal.data
    }
}

#[inline]
pub fn dbfs(v: f32) -> f32 {
    20.0 * f32::log10(v.abs())
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("error loading or writing audio")]
    Wav(#[from] WavError),
    #[error("target reverberation time must be positive, got {0}s")]
    InvalidRt60(f64),
    #[error(
        "evaluation of parameters failed: room may be too large for the required RT60 \
         (absorption {0:.3} > 1)"
    )]
    RoomTooLarge(f64),
    #[error("absorption coefficient must lie in [0, 1], got {0}")]
    InvalidAbsorption(f64),
    #[error("source delay must be a non-negative number of seconds, got {0}")]
    InvalidDelay(f64),
    #[error("source signal is sampled at {signal} Hz but the room simulates at {room} Hz")]
    SampleRateMismatch { signal: u32, room: u32 },
    #[error("the room has no sources")]
    NoSources,
    #[error("the room has no microphones")]
    NoMicrophones,
    #[error("the room has not been simulated yet")]
    NotSimulated,
    #[error("impulse response does not decay far enough to estimate a reverberation time")]
    InsufficientDecay,
    #[error("vectors differ in length: {0} vs {1}")]
    LengthMismatch(usize, usize),
    #[error("angle is undefined for a zero-length vector")]
    ZeroVector,
}

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("room dimensions must be three positive, finite lengths, got {0:?}")]
    InvalidDimensions(Vec<f64>),
    #[error("{kind} at {point} lies outside the room")]
    OutsideRoom { kind: &'static str, point: Point },
}

#[derive(Error, Debug)]
pub enum WavError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("malformed or unsupported wav file: {0}")]
    Format(String),
    #[error("nothing to write, no channels given")]
    NoChannels,
    #[error("too many channels for a wav file: {0}")]
    TooManyChannels(usize),
}
