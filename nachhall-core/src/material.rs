use crate::{octave::NUM_BANDS, Error};

/// Speed of sound in air at roughly 20 °C, in m/s.
pub const SPEED_OF_SOUND: f64 = 343.0;

/// Energy attenuation of air in 1/m for each octave band in [`crate::OCTAVE_CENTERS`],
/// at 20 °C and 50 % relative humidity.
const AIR_ABSORPTION_20C_50RH: [f64; NUM_BANDS] =
    [0.1e-3, 0.2e-3, 0.5e-3, 1.1e-3, 2.7e-3, 9.4e-3, 29.0e-3];

/// Wall material with a frequency independent energy absorption coefficient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    energy_absorption: f64,
}

impl Material {
    pub fn new(energy_absorption: f64) -> Result<Self, Error> {
        if (0.0..=1.0).contains(&energy_absorption) {
            Ok(Self { energy_absorption })
        } else {
            Err(Error::InvalidAbsorption(energy_absorption))
        }
    }

    /// Builds a material from an amplitude (pressure) absorption coefficient,
    /// the way rooms used to be parametrised before energy coefficients.
    pub fn from_amplitude_absorption(absorption: f64) -> Result<Self, Error> {
        if !(0.0..=1.0).contains(&absorption) {
            return Err(Error::InvalidAbsorption(absorption));
        }

        Self::new(1.0 - (1.0 - absorption).powi(2))
    }

    pub fn energy_absorption(&self) -> f64 {
        self.energy_absorption
    }

    /// Pressure reflection coefficient.
    pub fn reflection(&self) -> f64 {
        (1.0 - self.energy_absorption).sqrt()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AirAbsorption {
    coefficients: [f64; NUM_BANDS],
}

impl AirAbsorption {
    pub fn standard() -> Self {
        Self {
            coefficients: AIR_ABSORPTION_20C_50RH,
        }
    }

    pub fn none() -> Self {
        Self {
            coefficients: [0.0; NUM_BANDS],
        }
    }

    pub fn coefficient(&self, band: usize) -> f64 {
        self.coefficients.get(band).copied().unwrap_or(0.0)
    }

    pub fn energy_factor(&self, band: usize, distance: f64) -> f64 {
        f64::exp(-self.coefficient(band) * distance)
    }

    pub fn pressure_factor(&self, band: usize, distance: f64) -> f64 {
        f64::exp(-0.5 * self.coefficient(band) * distance)
    }
}

impl Default for AirAbsorption {
    fn default() -> Self {
        Self::standard()
    }
}
