//! Stochastic ray tracing for the late reverberation tail.
//!
//! Rays leave the source in uniformly random directions and bounce
//! specularly between the walls. Whenever a ray crosses the sphere around a
//! microphone it leaves part of its energy in a time histogram, which is
//! later turned into a noise-like impulse response.

use rand::{distributions::Uniform, prelude::Distribution, Rng};
use tracing::debug;

use crate::{octave::OctaveBands, AirAbsorption, Dimensions, Material, Point};

#[derive(Debug, Clone, PartialEq)]
pub struct RayTracingOptions {
    pub n_rays: usize,
    /// Radius of the sphere around each microphone that collects energy, in m.
    pub receiver_radius: f64,
    /// Rays are dropped once their energy falls below this fraction of the
    /// energy they started with.
    pub energy_threshold: f64,
    /// Rays are dropped after travelling for this many seconds.
    pub time_threshold: f64,
    /// Width of one histogram bin, in s.
    pub histogram_bin: f64,
}

impl Default for RayTracingOptions {
    fn default() -> Self {
        Self {
            n_rays: 10_000,
            receiver_radius: 0.5,
            energy_threshold: 1e-7,
            time_threshold: 10.0,
            histogram_bin: 0.004,
        }
    }
}

/// Energy arriving at one microphone, per octave band and time bin.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EnergyHistogram {
    pub bin_samples: usize,
    pub bands: Vec<Vec<f64>>,
}

impl EnergyHistogram {
    fn new(bin_samples: usize, n_bands: usize) -> Self {
        Self {
            bin_samples,
            bands: vec![Vec::new(); n_bands],
        }
    }

    fn deposit(&mut self, band: usize, bin: usize, energy: f64) {
        let bins = &mut self.bands[band];
        if bins.len() <= bin {
            bins.resize(bin + 1, 0.0);
        }
        bins[bin] += energy;
    }

    pub fn n_bins(&self) -> usize {
        self.bands.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn total(&self, band: usize) -> f64 {
        self.bands[band].iter().sum()
    }
}

pub(crate) struct Tracer<'a> {
    pub dimensions: &'a Dimensions,
    pub material: &'a Material,
    pub air: &'a AirAbsorption,
    pub n_bands: usize,
    pub sample_rate: u32,
    pub speed_of_sound: f64,
    pub options: &'a RayTracingOptions,
    /// Only reflections of at least this order are recorded.
    pub min_order: u32,
}

impl Tracer<'_> {
    fn bin_samples(&self) -> usize {
        (self.options.histogram_bin * self.sample_rate as f64)
            .round()
            .max(1.0) as usize
    }

    /// Traces `n_rays` rays from `source` and records them at every microphone.
    pub fn trace<R: Rng>(
        &self,
        source: &Point,
        microphones: &[Point],
        rng: &mut R,
    ) -> Vec<EnergyHistogram> {
        let bin_samples = self.bin_samples();
        let bin_duration = bin_samples as f64 / self.sample_rate as f64;
        let mut histograms =
            vec![EnergyHistogram::new(bin_samples, self.n_bands); microphones.len()];

        let radius = self.options.receiver_radius;
        let sphere_volume = 4.0 / 3.0 * std::f64::consts::PI * radius.powi(3);
        // energy density inside the sphere, expressed as squared pressure
        let receiver_scale = 1.0 / (sphere_volume * 4.0 * std::f64::consts::PI);

        let reflection = 1.0 - self.material.energy_absorption();
        let initial_energy = 1.0 / self.options.n_rays.max(1) as f64;
        let energy_floor = initial_energy * self.options.energy_threshold;
        let max_distance = self.options.time_threshold * self.speed_of_sound;

        let cos_theta = Uniform::new_inclusive(-1.0, 1.0);
        let phi = Uniform::new(0.0, 2.0 * std::f64::consts::PI);
        let lengths = self.dimensions.as_array();

        let mut segments = 0usize;
        for _ in 0..self.options.n_rays {
            let z: f64 = cos_theta.sample(rng);
            let azimuth: f64 = phi.sample(rng);
            let planar = (1.0 - z * z).max(0.0).sqrt();
            let mut direction = [planar * azimuth.cos(), planar * azimuth.sin(), z];

            let mut position = source.as_array();
            let mut energy = vec![initial_energy; self.n_bands];
            let mut travelled = 0.0;
            let mut order = 0u32;

            while travelled < max_distance {
                let (hit, axis) = next_wall(&position, &direction, &lengths);
                segments += 1;

                if order >= self.min_order {
                    for (microphone, histogram) in microphones.iter().zip(histograms.iter_mut()) {
                        let Some((chord, closest)) =
                            crossing(&position, &direction, hit, microphone, radius)
                        else {
                            continue;
                        };

                        let arrival = (travelled + closest) / self.speed_of_sound;
                        let bin = (arrival / bin_duration) as usize;
                        for (band, e) in energy.iter().enumerate() {
                            let at_receiver = e * self.air.energy_factor(band, closest);
                            histogram.deposit(band, bin, at_receiver * chord * receiver_scale);
                        }
                    }
                }

                for (p, d) in position.iter_mut().zip(direction.iter()) {
                    *p += d * hit;
                }
                position[axis] = if direction[axis] > 0.0 { lengths[axis] } else { 0.0 };
                direction[axis] = -direction[axis];

                for (band, e) in energy.iter_mut().enumerate() {
                    *e *= reflection * self.air.energy_factor(band, hit);
                }
                travelled += hit;
                order += 1;

                if energy.iter().all(|e| *e < energy_floor) {
                    break;
                }
            }
        }

        debug!(rays = self.options.n_rays, segments, "traced rays");

        histograms
    }
}

/// Distance along `direction` to the first wall and the axis of that wall.
fn next_wall(position: &[f64; 3], direction: &[f64; 3], lengths: &[f64; 3]) -> (f64, usize) {
    let mut nearest = (f64::INFINITY, 0);

    for axis in 0..3 {
        let d = direction[axis];
        let t = if d > 0.0 {
            (lengths[axis] - position[axis]) / d
        } else if d < 0.0 {
            -position[axis] / d
        } else {
            continue;
        };

        if t < nearest.0 {
            nearest = (t.max(0.0), axis);
        }
    }

    nearest
}

/// Part of the segment `position + t * direction`, `t` in `[0, length]`,
/// inside the sphere around `center`.
///
/// Returns the chord length and the distance along the segment to the point
/// closest to the center.
fn crossing(
    position: &[f64; 3],
    direction: &[f64; 3],
    length: f64,
    center: &Point,
    radius: f64,
) -> Option<(f64, f64)> {
    let to_center = [
        center.x - position[0],
        center.y - position[1],
        center.z - position[2],
    ];
    let along: f64 = to_center.iter().zip(direction).map(|(a, b)| a * b).sum();
    let squared: f64 = to_center.iter().map(|a| a * a).sum();
    let miss = squared - along * along;

    if miss >= radius * radius {
        return None;
    }

    let half_chord = (radius * radius - miss).sqrt();
    let enter = (along - half_chord).max(0.0);
    let exit = (along + half_chord).min(length);

    if exit <= enter {
        return None;
    }

    Some((exit - enter, along.clamp(enter, exit)))
}

/// Shapes a noise sequence so that every bin carries the energy of the
/// histogram, band by band, then joins the bands.
pub(crate) fn synthesize(
    histogram: &EnergyHistogram,
    noise: &[f32],
    bands: &OctaveBands,
) -> Vec<f32> {
    let len = histogram.n_bins() * histogram.bin_samples;
    let len = len.min(noise.len());

    let per_band: Vec<Vec<f32>> = histogram
        .bands
        .iter()
        .map(|bins| {
            let mut out = vec![0.0f32; len];
            for (bin, energy) in bins.iter().enumerate() {
                let start = bin * histogram.bin_samples;
                if start >= len || *energy <= 0.0 {
                    continue;
                }
                let end = (start + histogram.bin_samples).min(len);

                let power: f64 = noise[start..end].iter().map(|n| (n * n) as f64).sum();
                if power <= 0.0 {
                    continue;
                }

                let gain = (energy / power).sqrt() as f32;
                out[start..end]
                    .iter_mut()
                    .zip(&noise[start..end])
                    .for_each(|(o, n)| *o = n * gain);
            }
            out
        })
        .collect();

    bands.combine(&per_band)
}

/// Uniform white noise in [-1, 1] shared by all bands of a synthesis.
pub(crate) fn noise<R: Rng>(len: usize, rng: &mut R) -> Vec<f32> {
    let distribution = Uniform::new_inclusive(-1.0f32, 1.0);

    (0..len).map(|_| distribution.sample(rng)).collect()
}

#[cfg(test)]
mod test {
    use rand::{rngs::SmallRng, SeedableRng};

    use super::*;

    fn tracer<'a>(
        dimensions: &'a Dimensions,
        material: &'a Material,
        air: &'a AirAbsorption,
        options: &'a RayTracingOptions,
        min_order: u32,
    ) -> Tracer<'a> {
        Tracer {
            dimensions,
            material,
            air,
            n_bands: 1,
            sample_rate: 16_000,
            speed_of_sound: 343.0,
            options,
            min_order,
        }
    }

    #[test]
    fn wall_distances() {
        let lengths = [10.0, 10.0, 10.0];
        let (t, axis) = next_wall(&[2.0, 5.0, 5.0], &[-1.0, 0.0, 0.0], &lengths);

        assert_eq!(axis, 0);
        assert!((t - 2.0).abs() < 1e-12);

        let (t, axis) = next_wall(&[2.0, 5.0, 5.0], &[0.0, 0.0, 1.0], &lengths);
        assert_eq!(axis, 2);
        assert!((t - 5.0).abs() < 1e-12);
    }

    #[test]
    fn chord_through_sphere() {
        let center = Point::new(5.0, 0.0, 0.0);
        let (chord, closest) =
            crossing(&[0.0, 0.0, 0.0], &[1.0, 0.0, 0.0], 10.0, &center, 0.5).unwrap();

        assert!((chord - 1.0).abs() < 1e-12);
        assert!((closest - 5.0).abs() < 1e-12);

        // segment ends before it reaches the sphere
        assert!(crossing(&[0.0, 0.0, 0.0], &[1.0, 0.0, 0.0], 3.0, &center, 0.5).is_none());
        // passes beside it
        assert!(crossing(&[0.0, 1.0, 0.0], &[1.0, 0.0, 0.0], 10.0, &center, 0.5).is_none());
    }

    #[test]
    fn direct_energy_matches_spherical_spreading() {
        let dimensions = Dimensions::new(10.0, 10.0, 10.0).unwrap();
        let material = Material::new(1.0).unwrap();
        let air = AirAbsorption::none();
        let options = RayTracingOptions {
            n_rays: 50_000,
            ..Default::default()
        };

        let source = Point::new(5.0, 5.0, 2.0);
        let microphone = Point::new(5.0, 5.0, 5.0);
        let mut rng = SmallRng::seed_from_u64(1);

        let histograms = tracer(&dimensions, &material, &air, &options, 0).trace(
            &source,
            &[microphone],
            &mut rng,
        );

        let distance: f64 = 3.0;
        let expected = 1.0 / (16.0 * std::f64::consts::PI.powi(2) * distance.powi(2));
        let total = histograms[0].total(0);

        assert!(
            (total - expected).abs() < 0.3 * expected,
            "got {total}, expected {expected}"
        );
    }

    #[test]
    fn early_orders_are_skipped() {
        let dimensions = Dimensions::new(10.0, 10.0, 10.0).unwrap();
        // every reflection absorbs everything
        let material = Material::new(1.0).unwrap();
        let air = AirAbsorption::none();
        let options = RayTracingOptions {
            n_rays: 1_000,
            ..Default::default()
        };
        let mut rng = SmallRng::seed_from_u64(2);

        let histograms = tracer(&dimensions, &material, &air, &options, 1).trace(
            &Point::new(5.0, 5.0, 2.0),
            &[Point::new(5.0, 5.0, 5.0)],
            &mut rng,
        );

        assert_eq!(histograms[0].total(0), 0.0);
    }

    #[test]
    fn synthesis_preserves_bin_energy() {
        let bands = OctaveBands::new(16_000);
        let histogram = EnergyHistogram {
            bin_samples: 64,
            bands: vec![vec![0.0, 1e-3, 5e-4, 0.0, 1e-4]],
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let noise = noise(histogram.n_bins() * histogram.bin_samples, &mut rng);

        let rir = synthesize(&histogram, &noise, &bands);

        assert_eq!(rir.len(), 5 * 64);
        let bin_energy = |bin: usize| -> f64 {
            rir[bin * 64..(bin + 1) * 64]
                .iter()
                .map(|s| (s * s) as f64)
                .sum()
        };

        assert_eq!(bin_energy(0), 0.0);
        assert!((bin_energy(1) - 1e-3).abs() < 1e-9);
        assert!((bin_energy(2) - 5e-4).abs() < 1e-9);
        assert_eq!(bin_energy(3), 0.0);
    }
}
