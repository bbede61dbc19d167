use rand::{distributions, distributions::Distribution, rngs, SeedableRng};

/// Uniformly distributed noise in `[-amplitude, amplitude]`.
#[derive(Debug, Clone)]
pub struct WhiteNoise {
    amplitude: f32,
    remaining: usize,
    rng: rngs::SmallRng,
    distribution: distributions::Uniform<f32>,
}

impl WhiteNoise {
    pub fn new(amplitude: f32, n_samples: usize) -> Self {
        Self::with_rng(amplitude, n_samples, rngs::SmallRng::from_entropy())
    }

    /// Noise that repeats for the same `seed`.
    pub fn with_seed(amplitude: f32, n_samples: usize, seed: u64) -> Self {
        Self::with_rng(amplitude, n_samples, rngs::SmallRng::seed_from_u64(seed))
    }

    fn with_rng(amplitude: f32, n_samples: usize, rng: rngs::SmallRng) -> Self {
        WhiteNoise {
            amplitude,
            remaining: n_samples,
            rng,
            distribution: distributions::Uniform::new_inclusive(-1.0, 1.0),
        }
    }
}

impl Iterator for WhiteNoise {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        Some(self.amplitude * self.distribution.sample(&mut self.rng))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for WhiteNoise {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bounded_and_finite() {
        let noise = WhiteNoise::new(0.5, 1_000);

        assert_eq!(noise.len(), 1_000);
        let samples: Vec<_> = noise.collect();
        assert_eq!(samples.len(), 1_000);
        assert!(samples.iter().all(|s| s.abs() <= 0.5));
    }

    #[test]
    fn seeded_noise_repeats() {
        let a: Vec<_> = WhiteNoise::with_seed(1.0, 64, 3).collect();
        let b: Vec<_> = WhiteNoise::with_seed(1.0, 64, 3).collect();
        let c: Vec<_> = WhiteNoise::with_seed(1.0, 64, 4).collect();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
