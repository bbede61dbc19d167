use std::time::Duration;

/// Sine sweep whose frequency rises exponentially over time.
#[derive(Debug, Clone)]
pub struct ExponentialSweep {
    sample_index: usize,
    start_frequency: f32,
    end_frequency: f32,
    sample_rate: u32,
    n_samples: usize,
    amplitude: f32,
}

impl ExponentialSweep {
    pub fn new(
        start_frequency: f32,
        end_frequency: f32,
        amplitude: f32,
        duration: Duration,
        sample_rate: u32,
    ) -> Self {
        let n_samples = (sample_rate as f32 * duration.as_secs_f32()) as usize;

        Self {
            sample_index: 0,
            start_frequency,
            end_frequency,
            sample_rate,
            n_samples,
            amplitude,
        }
    }
}

impl Iterator for ExponentialSweep {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        use std::f32::consts::PI;

        if self.sample_index < self.n_samples {
            let c = (self.end_frequency / self.start_frequency).ln();
            let l = self.n_samples as f32 / self.sample_rate as f32 / c;

            let t = self.sample_index as f32 / self.sample_rate as f32;
            let s = 2.0 * PI * self.start_frequency * l * (f32::exp(t / l) - 1.0);
            let s = self.amplitude * f32::sin(s);

            self.sample_index += 1;

            Some(s)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.n_samples - self.sample_index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ExponentialSweep {}
