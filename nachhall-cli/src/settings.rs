use std::path::{Path, PathBuf};

use clap::ValueEnum;
use nachhall_core::{Point, RayTracingOptions};
use serde::Deserialize;

/// File picked up from the working directory when no `--config` is given.
const DEFAULT_CONFIG_FILE: &str = "nachhall.toml";

/// Prefix of environment variables overriding settings, e.g.
/// `NACHHALL_RT60_TARGET=0.5` or `NACHHALL_RAYS__N_RAYS=2000`.
const ENV_PREFIX: &str = "NACHHALL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    /// Image sources up to the order derived from the target RT60
    #[default]
    Ism,
    /// Low order image sources with a ray traced tail
    Hybrid,
}

impl MethodKind {
    pub fn name(&self) -> &'static str {
        match self {
            MethodKind::Ism => "ism",
            MethodKind::Hybrid => "hybrid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub method: MethodKind,
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Target reverberation time, in seconds.
    pub rt60_target: f64,
    pub room_dim: Vec<f64>,
    pub speed_of_sound: f64,
    /// Expected rate of the input file. Nothing is resampled, another rate
    /// is rejected.
    pub sample_rate: Option<u32>,
    pub sources: Vec<SourceSettings>,
    pub microphones: Vec<[f64; 3]>,
    /// Makes randomized image placement and ray tracing repeatable.
    pub seed: Option<u64>,
    pub plot: PlotSettings,
    pub rays: RaySettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceSettings {
    pub position: [f64; 3],
    /// Playback delay, in seconds.
    #[serde(default)]
    pub delay: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlotSettings {
    pub enabled: bool,
    /// `[mic, source]` pairs to plot, all of them if unset.
    pub select: Option<Vec<[usize; 2]>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RaySettings {
    pub n_rays: usize,
    pub receiver_radius: f64,
    pub energy_threshold: f64,
    pub time_threshold: f64,
    pub histogram_bin: f64,
}

impl Settings {
    /// Layers the built-in defaults, a TOML file and `NACHHALL_*` variables.
    ///
    /// An explicitly given file must exist, the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn source_points(&self) -> impl Iterator<Item = (Point, f64)> + '_ {
        self.sources
            .iter()
            .map(|source| (Point::from(source.position), source.delay))
    }

    pub fn microphone_points(&self) -> Vec<Point> {
        self.microphones.iter().copied().map(Point::from).collect()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            method: MethodKind::default(),
            input: PathBuf::from("samples/guitar_16k.wav"),
            output_dir: PathBuf::from("."),
            rt60_target: 0.3,
            room_dim: vec![10.0, 10.0, 10.0],
            speed_of_sound: nachhall_core::SPEED_OF_SOUND,
            sample_rate: None,
            sources: vec![
                SourceSettings {
                    position: [2.5, 0.0, 5.0],
                    delay: 0.5,
                },
                SourceSettings {
                    position: [7.5, 0.0, 5.0],
                    delay: 0.5,
                },
            ],
            microphones: vec![
                [5.0, 5.0, 5.0],
                [2.5, 10.0, 5.0],
                [7.5, 10.0, 5.0],
                [5.0, 0.0, 5.0],
            ],
            seed: None,
            plot: PlotSettings::default(),
            rays: RaySettings::default(),
        }
    }
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            select: None,
        }
    }
}

impl Default for RaySettings {
    fn default() -> Self {
        let options = RayTracingOptions::default();

        Self {
            n_rays: options.n_rays,
            receiver_radius: options.receiver_radius,
            energy_threshold: options.energy_threshold,
            time_threshold: options.time_threshold,
            histogram_bin: options.histogram_bin,
        }
    }
}

impl From<&RaySettings> for RayTracingOptions {
    fn from(settings: &RaySettings) -> Self {
        Self {
            n_rays: settings.n_rays,
            receiver_radius: settings.receiver_radius,
            energy_threshold: settings.energy_threshold,
            time_threshold: settings.time_threshold,
            histogram_bin: settings.histogram_bin,
        }
    }
}
