use rand::{rngs::SmallRng, SeedableRng};
use tracing::{debug, info, info_span, trace};

use crate::{
    convolve,
    ism::{self, Renderer, FRACTIONAL_DELAY_LENGTH},
    octave::OctaveBands,
    ray_tracing::{self, RayTracingOptions, Tracer},
    AirAbsorption, Dimensions, Error, GeometryError, ImpulseResponse, Material, Point, Rirs,
    Signal, SPEED_OF_SOUND,
};

/// Image source order kept when the tail is ray traced.
pub const HYBRID_ISM_ORDER: u32 = 3;

/// How the impulse responses of a room are computed.
#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    /// Image sources up to `max_order` reflections.
    Ism { max_order: u32, randomized: bool },
    /// Image sources up to `ism_order`, later reflections are ray traced.
    Hybrid {
        ism_order: u32,
        rays: RayTracingOptions,
    },
}

impl Method {
    pub fn ism(max_order: u32) -> Self {
        Method::Ism {
            max_order,
            randomized: true,
        }
    }

    pub fn hybrid() -> Self {
        Method::Hybrid {
            ism_order: HYBRID_ISM_ORDER,
            rays: RayTracingOptions::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Method::Ism { .. } => "ism",
            Method::Hybrid { .. } => "hybrid",
        }
    }

    fn ism_order(&self) -> u32 {
        match self {
            Method::Ism { max_order, .. } => *max_order,
            Method::Hybrid { ism_order, .. } => *ism_order,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SoundSource {
    pub position: Point,
    pub signal: Signal,
    /// Playback delay, in seconds.
    pub delay: f64,
}

#[derive(Debug, Clone)]
struct Simulation {
    rirs: Rirs,
    signals: Vec<Vec<f32>>,
}

/// A shoebox room with its sources, microphones and simulation results.
#[derive(Debug, Clone)]
pub struct Room {
    dimensions: Dimensions,
    sample_rate: u32,
    material: Material,
    method: Method,
    air: Option<AirAbsorption>,
    speed_of_sound: f64,
    seed: Option<u64>,
    sources: Vec<SoundSource>,
    microphones: Vec<Point>,
    simulation: Option<Simulation>,
}

impl Room {
    pub fn new(
        dimensions: Dimensions,
        sample_rate: u32,
        material: Material,
        method: Method,
        air_absorption: bool,
    ) -> Self {
        Self {
            dimensions,
            sample_rate,
            material,
            method,
            air: air_absorption.then(AirAbsorption::standard),
            speed_of_sound: SPEED_OF_SOUND,
            seed: None,
            sources: Vec::new(),
            microphones: Vec::new(),
            simulation: None,
        }
    }

    pub fn with_speed_of_sound(mut self, speed_of_sound: f64) -> Self {
        self.speed_of_sound = speed_of_sound;
        self
    }

    /// Makes randomized image placement and ray tracing repeatable.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn sources(&self) -> &[SoundSource] {
        &self.sources
    }

    pub fn microphones(&self) -> &[Point] {
        &self.microphones
    }

    pub fn add_source(&mut self, position: Point, signal: Signal, delay: f64) -> Result<(), Error> {
        if !self.dimensions.contains(&position) {
            return Err(GeometryError::OutsideRoom {
                kind: "source",
                point: position,
            }
            .into());
        }
        if !(delay.is_finite() && delay >= 0.0) {
            return Err(Error::InvalidDelay(delay));
        }
        if signal.sample_rate() != self.sample_rate {
            return Err(Error::SampleRateMismatch {
                signal: signal.sample_rate(),
                room: self.sample_rate,
            });
        }

        debug!(%position, delay, samples = signal.len(), "added source");

        self.sources.push(SoundSource {
            position,
            signal,
            delay,
        });
        self.simulation = None;

        Ok(())
    }

    /// Appends microphones, keeping the order they are given in.
    pub fn add_microphone_array(&mut self, microphones: Vec<Point>) -> Result<(), Error> {
        if let Some(point) = microphones.iter().find(|p| !self.dimensions.contains(p)) {
            return Err(GeometryError::OutsideRoom {
                kind: "microphone",
                point: *point,
            }
            .into());
        }

        debug!(count = microphones.len(), "added microphones");

        self.microphones.extend(microphones);
        self.simulation = None;

        Ok(())
    }

    /// Computes all impulse responses and the signal every microphone records.
    pub fn simulate(&mut self) -> Result<(), Error> {
        if self.sources.is_empty() {
            return Err(Error::NoSources);
        }
        if self.microphones.is_empty() {
            return Err(Error::NoMicrophones);
        }

        let _span = info_span!(
            "simulate",
            method = self.method.name(),
            sources = self.sources.len(),
            microphones = self.microphones.len()
        )
        .entered();

        let mut rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };

        let bands = OctaveBands::new(self.sample_rate);
        let renderer = Renderer {
            sample_rate: self.sample_rate,
            speed_of_sound: self.speed_of_sound,
            material: &self.material,
            air: self.air.as_ref(),
            bands: &bands,
        };

        let mut responses = vec![Vec::with_capacity(self.sources.len()); self.microphones.len()];

        for (index, source) in self.sources.iter().enumerate() {
            let mut images =
                ism::image_sources(&self.dimensions, &source.position, self.method.ism_order());
            if let Method::Ism {
                randomized: true, ..
            } = self.method
            {
                ism::randomize(&mut images, &mut rng);
            }

            let mut rirs: Vec<Vec<f32>> = self
                .microphones
                .iter()
                .map(|microphone| renderer.render(&images, microphone))
                .collect();

            if let Method::Hybrid { ism_order, rays } = &self.method {
                let tail = self.ray_traced_tail(source, *ism_order, rays, &bands, &mut rng);
                for (rir, tail) in rirs.iter_mut().zip(tail) {
                    add_at(rir, &tail, FRACTIONAL_DELAY_LENGTH / 2);
                }
            }

            debug!(source = index, images = images.len(), "computed impulse responses");

            for (row, rir) in responses.iter_mut().zip(rirs) {
                row.push(ImpulseResponse::new(self.sample_rate, rir));
            }
        }

        let rirs = Rirs::new(responses);
        let signals = self.mix(&rirs);

        info!(
            max_rir_len = rirs.max_len(),
            signal_len = signals.first().map_or(0, Vec::len),
            "simulation finished"
        );

        self.simulation = Some(Simulation { rirs, signals });

        Ok(())
    }

    fn ray_traced_tail(
        &self,
        source: &SoundSource,
        ism_order: u32,
        options: &RayTracingOptions,
        bands: &OctaveBands,
        rng: &mut SmallRng,
    ) -> Vec<Vec<f32>> {
        let no_air = AirAbsorption::none();
        let tracer = Tracer {
            dimensions: &self.dimensions,
            material: &self.material,
            air: self.air.as_ref().unwrap_or(&no_air),
            n_bands: bands.len().max(1),
            sample_rate: self.sample_rate,
            speed_of_sound: self.speed_of_sound,
            options,
            min_order: ism_order + 1,
        };

        tracer
            .trace(&source.position, &self.microphones, rng)
            .iter()
            .map(|histogram| {
                trace!(
                    bins = histogram.n_bins(),
                    energy = histogram.total(0),
                    "synthesizing ray traced tail"
                );
                let noise = ray_tracing::noise(histogram.n_bins() * histogram.bin_samples, rng);
                ray_tracing::synthesize(histogram, &noise, bands)
            })
            .collect()
    }

    /// Convolves every source with its impulse responses and sums them per
    /// microphone.
    fn mix(&self, rirs: &Rirs) -> Vec<Vec<f32>> {
        let fs = self.sample_rate as f64;
        let offsets: Vec<usize> = self
            .sources
            .iter()
            .map(|source| (source.delay * fs).floor() as usize)
            .collect();

        let longest = self
            .sources
            .iter()
            .zip(&offsets)
            .map(|(source, offset)| source.signal.len() + offset)
            .max()
            .unwrap_or(0);

        let mut len = (rirs.max_len() + longest).saturating_sub(1);
        if len % 2 == 1 {
            len += 1;
        }

        (0..rirs.n_microphones())
            .map(|microphone| {
                let mut output = vec![0.0f32; len];
                for (index, (source, offset)) in self.sources.iter().zip(&offsets).enumerate() {
                    let Some(rir) = rirs.get(microphone, index) else {
                        continue;
                    };
                    let wet = convolve(source.signal.samples(), &rir.data);
                    add_at(&mut output, &wet, *offset);
                }
                output
            })
            .collect()
    }

    pub fn rirs(&self) -> Result<&Rirs, Error> {
        self.simulation
            .as_ref()
            .map(|simulation| &simulation.rirs)
            .ok_or(Error::NotSimulated)
    }

    /// Recorded signal of every microphone, all of the same length.
    pub fn mic_signals(&self) -> Result<&[Vec<f32>], Error> {
        self.simulation
            .as_ref()
            .map(|simulation| simulation.signals.as_slice())
            .ok_or(Error::NotSimulated)
    }

    /// Reverberation time of every impulse response, indexed `[mic][source]`.
    pub fn measure_rt60(&self, decay_db: f64) -> Result<Vec<Vec<f64>>, Error> {
        let rirs = self.rirs()?;

        (0..rirs.n_microphones())
            .map(|microphone| {
                (0..rirs.n_sources())
                    .map(|source| {
                        rirs.get(microphone, source)
                            .ok_or(Error::NotSimulated)?
                            .rt60(decay_db)
                    })
                    .collect()
            })
            .collect()
    }
}

/// Adds `signal` into `target` starting at `offset`, growing `target` if needed.
fn add_at(target: &mut Vec<f32>, signal: &[f32], offset: usize) {
    let end = offset + signal.len();
    if target.len() < end {
        target.resize(end, 0.0);
    }

    target[offset..end]
        .iter_mut()
        .zip(signal)
        .for_each(|(t, s)| *t += s);
}
