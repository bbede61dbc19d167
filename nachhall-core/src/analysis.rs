use rustfft::{
    num_complex::{Complex, Complex32},
    FftPlanner,
};

use crate::{dbfs, window::HannWindow, ImpulseResponse};

/// Spectrum of an impulse response from DC up to Nyquist.
#[derive(Debug, Clone)]
pub struct FrequencyResponse {
    pub sample_rate: u32,
    pub fft_size: usize,
    pub data: Vec<Complex32>,
}

impl FrequencyResponse {
    /// The response is zero padded to the next power of two.
    pub fn new(impulse_response: &ImpulseResponse) -> Self {
        let fft_size = impulse_response.len().max(2).next_power_of_two();

        let mut buffer: Vec<_> = impulse_response
            .data
            .iter()
            .map(Complex::from)
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(fft_size)
            .collect();

        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        fft.process(&mut buffer);

        buffer.truncate(fft_size / 2 + 1);

        Self {
            sample_rate: impulse_response.sample_rate,
            fft_size,
            data: buffer,
        }
    }

    /// Center frequency of every bin, in Hz.
    pub fn frequencies(&self) -> impl Iterator<Item = f32> + '_ {
        let resolution = self.sample_rate as f32 / self.fft_size as f32;
        (0..self.data.len()).map(move |bin| bin as f32 * resolution)
    }

    pub fn magnitude_db(&self) -> impl Iterator<Item = f32> + '_ {
        self.data
            .iter()
            .map(|s| dbfs(s.norm().max(f32::MIN_POSITIVE)))
    }
}

/// Short time magnitude spectra of an impulse response.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub sample_rate: u32,
    pub window_size: usize,
    pub hop: usize,
    /// One magnitude spectrum per frame, DC up to Nyquist.
    pub frames: Vec<Vec<f32>>,
}

impl Spectrogram {
    pub fn new(impulse_response: &ImpulseResponse, window_size: usize, hop: usize) -> Self {
        let window_size = window_size.max(2);
        let hop = hop.max(1);

        let mut data = impulse_response.data.clone();
        if data.len() < window_size {
            data.resize(window_size, 0.0);
        }

        let window = HannWindow::periodic(window_size).data;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(window_size);

        let frames = (0..=data.len() - window_size)
            .step_by(hop)
            .map(|start| {
                let mut buffer: Vec<_> = data[start..start + window_size]
                    .iter()
                    .zip(window.iter())
                    .map(|(s, w)| Complex::from(s * w))
                    .collect();

                fft.process(&mut buffer);

                buffer
                    .into_iter()
                    .take(window_size / 2 + 1)
                    .map(|s| s.norm())
                    .collect()
            })
            .collect();

        Self {
            sample_rate: impulse_response.sample_rate,
            window_size,
            hop,
            frames,
        }
    }

    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn n_bins(&self) -> usize {
        self.window_size / 2 + 1
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unit_impulse_is_flat() {
        let mut data = vec![0.0; 100];
        data[0] = 1.0;
        let response = ImpulseResponse::new(8_000, data).frequency_response();

        assert_eq!(response.fft_size, 128);
        assert_eq!(response.data.len(), 65);
        for db in response.magnitude_db() {
            assert!(db.abs() < 1e-4, "{db}");
        }

        let frequencies: Vec<_> = response.frequencies().collect();
        assert_eq!(frequencies[0], 0.0);
        assert_eq!(frequencies[64], 4_000.0);
    }

    #[test]
    fn silence_stays_finite() {
        let response = ImpulseResponse::new(8_000, vec![0.0; 16]).frequency_response();

        assert!(response.magnitude_db().all(f32::is_finite));
    }

    #[test]
    fn sine_peaks_in_its_bin() {
        // bin 8 of a 64 point window at 8 kHz
        let frequency = 8.0 * 8_000.0 / 64.0;
        let data = (0..1024)
            .map(|n| f32::sin(2.0 * std::f32::consts::PI * frequency * n as f32 / 8_000.0))
            .collect();
        let spectrogram = ImpulseResponse::new(8_000, data).spectrogram(64, 32);

        assert_eq!(spectrogram.n_bins(), 33);
        assert_eq!(spectrogram.n_frames(), (1024 - 64) / 32 + 1);

        for frame in &spectrogram.frames {
            let peak = frame
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(bin, _)| bin);
            assert_eq!(peak, Some(8));
        }
    }

    #[test]
    fn short_input_gives_one_frame() {
        let spectrogram = ImpulseResponse::new(8_000, vec![1.0; 10]).spectrogram(256, 64);

        assert_eq!(spectrogram.n_frames(), 1);
        assert_eq!(spectrogram.frames[0].len(), 129);
    }
}
