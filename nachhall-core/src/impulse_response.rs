use crate::{metrics, Error, FrequencyResponse, Spectrogram};

/// Response of a microphone to a unit impulse at one source.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    pub sample_rate: u32,
    pub data: Vec<f32>,
}

impl ImpulseResponse {
    pub fn new(sample_rate: u32, data: Vec<f32>) -> Self {
        Self { sample_rate, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.sample_rate as f64
    }

    pub fn rt60(&self, decay_db: f64) -> Result<f64, Error> {
        metrics::rt60(&self.data, self.sample_rate, decay_db)
    }

    pub fn edt(&self) -> Result<f64, Error> {
        metrics::edt(&self.data, self.sample_rate)
    }

    pub fn frequency_response(&self) -> FrequencyResponse {
        FrequencyResponse::new(self)
    }

    pub fn spectrogram(&self, window_size: usize, hop: usize) -> Spectrogram {
        Spectrogram::new(self, window_size, hop)
    }
}

/// Impulse responses of a simulated room, one per microphone and source pair.
#[derive(Debug, Clone, Default)]
pub struct Rirs {
    responses: Vec<Vec<ImpulseResponse>>,
}

impl Rirs {
    /// `responses` is indexed `[microphone][source]`.
    pub(crate) fn new(responses: Vec<Vec<ImpulseResponse>>) -> Self {
        Self { responses }
    }

    pub fn get(&self, microphone: usize, source: usize) -> Option<&ImpulseResponse> {
        self.responses.get(microphone)?.get(source)
    }

    pub fn n_microphones(&self) -> usize {
        self.responses.len()
    }

    pub fn n_sources(&self) -> usize {
        self.responses.first().map_or(0, Vec::len)
    }

    /// Every `(microphone, source, response)` triple, microphone major.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize, &ImpulseResponse)> {
        self.responses.iter().enumerate().flat_map(|(m, sources)| {
            sources
                .iter()
                .enumerate()
                .map(move |(s, response)| (m, s, response))
        })
    }

    /// Length of the longest response.
    pub fn max_len(&self) -> usize {
        self.pairs()
            .map(|(_, _, response)| response.len())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn rirs() -> Rirs {
        let ir = |len| ImpulseResponse::new(8_000, vec![1.0; len]);

        Rirs::new(vec![vec![ir(3), ir(5)], vec![ir(7), ir(2)], vec![ir(1), ir(4)]])
    }

    #[test]
    fn indexed_by_microphone_then_source() {
        let rirs = rirs();

        assert_eq!(rirs.n_microphones(), 3);
        assert_eq!(rirs.n_sources(), 2);
        assert_eq!(rirs.get(1, 0).map(ImpulseResponse::len), Some(7));
        assert_eq!(rirs.get(2, 1).map(ImpulseResponse::len), Some(4));
        assert!(rirs.get(3, 0).is_none());
        assert!(rirs.get(0, 2).is_none());
    }

    #[test]
    fn pairs_and_longest() {
        let rirs = rirs();
        let pairs: Vec<_> = rirs.pairs().map(|(m, s, _)| (m, s)).collect();

        assert_eq!(pairs, [(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]);
        assert_eq!(rirs.max_len(), 7);
        assert_eq!(Rirs::default().max_len(), 0);
    }

    #[test]
    fn duration_in_seconds() {
        let ir = ImpulseResponse::new(8_000, vec![0.0; 4_000]);

        assert_eq!(ir.duration(), 0.5);
    }
}
