pub(crate) struct HannWindow {
    pub data: Vec<f32>,
}

impl HannWindow {
    /// Periodic window, as used for spectral analysis.
    pub fn periodic(width: usize) -> Self {
        let data = (0..width)
            .map(|n| f32::sin((std::f32::consts::PI * n as f32) / width as f32).powi(2))
            .collect();

        Self { data }
    }

    /// Symmetric window, zero at both ends, as used for filter design.
    pub fn symmetric(width: usize) -> Self {
        if width < 2 {
            return Self {
                data: vec![1.0; width],
            };
        }

        let span = (width - 1) as f32;
        let data = (0..width)
            .map(|n| f32::sin((std::f32::consts::PI * n as f32) / span).powi(2))
            .collect();

        Self { data }
    }
}
