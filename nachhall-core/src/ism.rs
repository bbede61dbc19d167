//! Image source method for box rooms.
//!
//! Every reflection path up to a given order is replaced by a mirrored copy of
//! the source. An image reaches the microphone after `d / c` seconds, scaled by
//! spherical spreading and one reflection coefficient per wall it was mirrored
//! across.

use rand::{distributions::Uniform, prelude::Distribution, Rng};
use tracing::trace;

use crate::{
    octave::OctaveBands, window::HannWindow, AirAbsorption, Dimensions, Material, Point,
};

/// Taps of the fractional delay filter used to place an image in time.
pub(crate) const FRACTIONAL_DELAY_LENGTH: usize = 81;

/// Largest random displacement of a reflected image along each axis, in m.
const MAX_RANDOM_DISPLACEMENT: f64 = 0.08;

/// Closest an image may get to a microphone, keeps the 1/d gain finite.
const MIN_DISTANCE: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ImageSource {
    pub position: Point,
    pub order: u32,
}

/// All images of `source` with at most `max_order` reflections.
pub(crate) fn image_sources(
    dimensions: &Dimensions,
    source: &Point,
    max_order: u32,
) -> Vec<ImageSource> {
    let n = max_order as i64;
    let [lx, ly, lz] = dimensions.as_array();
    let mut images = Vec::new();

    for i in -n..=n {
        let rest = n - i.abs();
        for j in -rest..=rest {
            let rest = rest - j.abs();
            for k in -rest..=rest {
                images.push(ImageSource {
                    position: Point::new(
                        mirror(i, lx, source.x),
                        mirror(j, ly, source.y),
                        mirror(k, lz, source.z),
                    ),
                    order: (i.abs() + j.abs() + k.abs()) as u32,
                });
            }
        }
    }

    images
}

/// Coordinate of the `n`-th image along an axis of length `length`.
fn mirror(n: i64, length: f64, coordinate: f64) -> f64 {
    if n.rem_euclid(2) == 0 {
        n as f64 * length + coordinate
    } else {
        (n + 1) as f64 * length - coordinate
    }
}

/// Jitters every reflected image to break up the regular lattice.
///
/// The direct path stays where it is.
pub(crate) fn randomize<R: Rng>(images: &mut [ImageSource], rng: &mut R) {
    let displacement = Uniform::new_inclusive(-MAX_RANDOM_DISPLACEMENT, MAX_RANDOM_DISPLACEMENT);

    for image in images.iter_mut().filter(|image| image.order > 0) {
        image.position.x += displacement.sample(rng);
        image.position.y += displacement.sample(rng);
        image.position.z += displacement.sample(rng);
    }
}

/// Turns a set of images into the impulse response seen by one microphone.
pub(crate) struct Renderer<'a> {
    pub sample_rate: u32,
    pub speed_of_sound: f64,
    pub material: &'a Material,
    pub air: Option<&'a AirAbsorption>,
    pub bands: &'a OctaveBands,
}

impl Renderer<'_> {
    pub fn render(&self, images: &[ImageSource], microphone: &Point) -> Vec<f32> {
        let half = FRACTIONAL_DELAY_LENGTH / 2;
        let fs = self.sample_rate as f64;
        let reflection = self.material.reflection();

        let distances: Vec<f64> = images
            .iter()
            .map(|image| image.position.distance(microphone).max(MIN_DISTANCE))
            .collect();

        let Some(max_distance) = distances.iter().copied().reduce(f64::max) else {
            return Vec::new();
        };

        let max_time = max_distance * fs / self.speed_of_sound + half as f64;
        let len = max_time.ceil() as usize + half + 1;

        let n_bands = match self.air {
            Some(_) => self.bands.len().max(1),
            None => 1,
        };
        let mut per_band = vec![vec![0.0f32; len]; n_bands];

        let window = HannWindow::symmetric(FRACTIONAL_DELAY_LENGTH).data;
        let mut taps = vec![0.0f32; FRACTIONAL_DELAY_LENGTH];

        for (image, distance) in images.iter().zip(distances) {
            let gain = reflection.powi(image.order as i32)
                / (4.0 * std::f64::consts::PI * distance);

            let time = distance * fs / self.speed_of_sound + half as f64;
            let whole = time.floor();
            let fraction = time - whole;
            let start = whole as usize - half;

            for (k, tap) in taps.iter_mut().enumerate() {
                *tap = window[k] * sinc(k as f64 - half as f64 - fraction) as f32;
            }

            for (band, response) in per_band.iter_mut().enumerate() {
                let band_gain = match self.air {
                    Some(air) => gain * air.pressure_factor(band, distance),
                    None => gain,
                } as f32;

                response[start..start + FRACTIONAL_DELAY_LENGTH]
                    .iter_mut()
                    .zip(taps.iter())
                    .for_each(|(r, t)| *r += band_gain * t);
            }
        }

        trace!(images = images.len(), len, bands = n_bands, "rendered image sources");

        if per_band.len() == 1 {
            per_band.pop().unwrap_or_default()
        } else {
            self.bands.combine(&per_band)
        }
    }
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        let px = std::f64::consts::PI * x;
        px.sin() / px
    }
}
