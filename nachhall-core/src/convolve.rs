use rustfft::{num_complex::Complex, FftPlanner};

/// Kernels up to this length are convolved directly.
const DIRECT_LIMIT: usize = 64;

/// Linear convolution of `signal` with `kernel`.
///
/// The result holds `signal.len() + kernel.len() - 1` samples, or none if
/// either input is empty. Long inputs go through FFT overlap-add.
pub fn convolve(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
    if signal.is_empty() || kernel.is_empty() {
        return Vec::new();
    }

    if signal.len() <= DIRECT_LIMIT || kernel.len() <= DIRECT_LIMIT {
        return convolve_direct(signal, kernel);
    }

    let output_len = signal.len() + kernel.len() - 1;
    let fft_size = (2 * kernel.len()).next_power_of_two();
    let block_size = fft_size - kernel.len() + 1;

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_size);
    let ifft = planner.plan_fft_inverse(fft_size);

    let mut kernel_fft = zero_padded(kernel, fft_size);
    fft.process(&mut kernel_fft);

    let scale = 1.0 / fft_size as f32;
    let mut output = vec![0.0; output_len];

    for (n, block) in signal.chunks(block_size).enumerate() {
        let start = n * block_size;

        let mut buffer = zero_padded(block, fft_size);
        fft.process(&mut buffer);

        buffer
            .iter_mut()
            .zip(kernel_fft.iter())
            .for_each(|(b, k)| *b *= *k);

        ifft.process(&mut buffer);

        let valid = (block.len() + kernel.len() - 1).min(output_len - start);
        output[start..start + valid]
            .iter_mut()
            .zip(buffer.iter())
            .for_each(|(o, b)| *o += b.re * scale);
    }

    output
}

fn zero_padded(data: &[f32], len: usize) -> Vec<Complex<f32>> {
    data.iter()
        .map(Complex::from)
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(len)
        .collect()
}

fn convolve_direct(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
    let mut output = vec![0.0; signal.len() + kernel.len() - 1];

    for (i, s) in signal.iter().enumerate() {
        for (o, k) in output[i..].iter_mut().zip(kernel) {
            *o += s * k;
        }
    }

    output
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unit_impulse() {
        let signal = [1.0, 2.0, 3.0, 4.0, 5.0];
        let result = convolve(&signal, &[1.0]);

        assert_eq!(result, signal);
    }

    #[test]
    fn known_result() {
        let result = convolve(&[1.0, 2.0, 3.0], &[1.0, 1.0]);

        assert_eq!(result, [1.0, 3.0, 5.0, 3.0]);
    }

    #[test]
    fn empty_input() {
        assert!(convolve(&[], &[1.0]).is_empty());
        assert!(convolve(&[1.0], &[]).is_empty());
    }

    #[test]
    fn overlap_add_matches_direct() {
        let signal: Vec<f32> = (0..1500).map(|i| (i as f32 * 0.05).sin()).collect();
        let kernel: Vec<f32> = (0..300).map(|i| (-0.01 * i as f32).exp()).collect();

        let fast = convolve(&signal, &kernel);
        let direct = convolve_direct(&signal, &kernel);

        assert_eq!(fast.len(), signal.len() + kernel.len() - 1);
        for (i, (a, b)) in fast.iter().zip(direct.iter()).enumerate() {
            assert!((a - b).abs() < 1e-3 * b.abs().max(1.0), "sample {i}: {a} vs {b}");
        }
    }
}
