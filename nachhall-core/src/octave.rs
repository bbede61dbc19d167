use rustfft::{num_complex::Complex, FftPlanner};

pub(crate) const NUM_BANDS: usize = 7;

/// Center frequencies of the octave bands the simulation resolves, in Hz.
pub const OCTAVE_CENTERS: [f64; NUM_BANDS] =
    [125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0];

/// Half width, in octaves, of the raised-cosine crossover between two bands.
const CROSSOVER_HALF_WIDTH: f64 = 0.25;

/// Octave bands that fit below the Nyquist frequency of a sample rate.
///
/// The lowest band reaches down to DC and the highest band up to Nyquist, so
/// the band masks cover the whole spectrum and sum to one in every bin.
#[derive(Debug, Clone, PartialEq)]
pub struct OctaveBands {
    sample_rate: u32,
    centers: Vec<f64>,
}

impl OctaveBands {
    pub fn new(sample_rate: u32) -> Self {
        let nyquist = sample_rate as f64 / 2.0;
        let centers = OCTAVE_CENTERS
            .iter()
            .copied()
            .take_while(|fc| fc / std::f64::consts::SQRT_2 < nyquist)
            .collect();

        Self {
            sample_rate,
            centers,
        }
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn centers(&self) -> &[f64] {
        &self.centers
    }

    /// Gain of `band` at `frequency`.
    pub fn gain(&self, band: usize, frequency: f64) -> f64 {
        if self.centers.len() <= 1 {
            return 1.0;
        }

        // crossovers sit on the upper edge of each band but the last
        let lower = band
            .checked_sub(1)
            .map_or(1.0, |b| 1.0 - self.low_pass(b, frequency));
        let upper = if band + 1 < self.centers.len() {
            self.low_pass(band, frequency)
        } else {
            1.0
        };

        lower * upper
    }

    fn low_pass(&self, band: usize, frequency: f64) -> f64 {
        let edge = self.centers[band] * std::f64::consts::SQRT_2;
        if frequency <= 0.0 {
            return 1.0;
        }

        let octaves = (frequency / edge).log2();
        if octaves <= -CROSSOVER_HALF_WIDTH {
            1.0
        } else if octaves >= CROSSOVER_HALF_WIDTH {
            0.0
        } else {
            let t = (octaves + CROSSOVER_HALF_WIDTH) / (2.0 * CROSSOVER_HALF_WIDTH);
            0.5 * (1.0 + f64::cos(std::f64::consts::PI * t))
        }
    }

    /// Per band gains for every bin of an `n_fft` point spectrum.
    pub fn masks(&self, n_fft: usize) -> Vec<Vec<f32>> {
        let bin_width = self.sample_rate as f64 / n_fft as f64;

        (0..self.len())
            .map(|band| {
                (0..n_fft)
                    .map(|bin| {
                        let frequency = bin.min(n_fft - bin) as f64 * bin_width;
                        self.gain(band, frequency) as f32
                    })
                    .collect()
            })
            .collect()
    }

    /// Filters every band signal to its own octave and sums the results.
    ///
    /// `bands` holds one signal per band. Shorter signals are zero padded, the
    /// result is as long as the longest one.
    pub fn combine(&self, bands: &[Vec<f32>]) -> Vec<f32> {
        let len = bands.iter().map(Vec::len).max().unwrap_or(0);
        if len == 0 {
            return Vec::new();
        }
        if bands.len() == 1 || self.len() <= 1 {
            let mut sum = vec![0.0; len];
            for band in bands {
                sum.iter_mut().zip(band).for_each(|(s, b)| *s += b);
            }
            return sum;
        }

        let n_fft = (2 * len).next_power_of_two();
        let masks = self.masks(n_fft);

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n_fft);

        let mut spectrum = vec![Complex::new(0.0f32, 0.0); n_fft];
        for (band, mask) in bands.iter().zip(masks.iter()) {
            let mut buffer: Vec<_> = band
                .iter()
                .map(Complex::from)
                .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
                .take(n_fft)
                .collect();

            fft.process(&mut buffer);

            for ((s, b), m) in spectrum.iter_mut().zip(buffer).zip(mask) {
                *s += b.scale(*m);
            }
        }

        let ifft = planner.plan_fft_inverse(n_fft);
        ifft.process(&mut spectrum);

        let scale = 1.0 / n_fft as f32;
        spectrum.into_iter().take(len).map(|s| s.re * scale).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bands_below_nyquist() {
        assert_eq!(OctaveBands::new(16_000).len(), 7);
        assert_eq!(OctaveBands::new(8_000).len(), 6);
        assert_eq!(OctaveBands::new(343).len(), 1);
    }

    #[test]
    fn masks_partition_the_spectrum() {
        let bands = OctaveBands::new(16_000);
        let masks = bands.masks(1024);

        for bin in 0..1024 {
            let sum: f32 = masks.iter().map(|m| m[bin]).sum();
            assert!((sum - 1.0).abs() < 1e-5, "bin {bin} sums to {sum}");
        }

        // DC and Nyquist belong to the outer bands
        assert_eq!(masks[0][0], 1.0);
        assert_eq!(masks[6][512], 1.0);
    }

    #[test]
    fn mask_peaks_at_center() {
        let bands = OctaveBands::new(16_000);

        for (band, fc) in OCTAVE_CENTERS.iter().enumerate() {
            assert!((bands.gain(band, *fc) - 1.0).abs() < 1e-12);
        }
        assert!(bands.gain(0, 1000.0) < 1e-12);
    }

    #[test]
    fn identical_bands_are_reproduced() {
        let bands = OctaveBands::new(16_000);
        let signal: Vec<f32> = (0..500)
            .map(|n| f32::sin(n as f32 * 0.3) * f32::exp(-(n as f32) / 100.0))
            .collect();

        let combined = bands.combine(&vec![signal.clone(); bands.len()]);

        assert_eq!(combined.len(), signal.len());
        for (a, b) in combined.iter().zip(signal.iter()) {
            assert!((a - b).abs() < 1e-4, "{a} vs {b}");
        }
    }

    #[test]
    fn combine_nothing() {
        let bands = OctaveBands::new(16_000);

        assert!(bands.combine(&[]).is_empty());
    }
}
