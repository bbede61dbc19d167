mod log;
mod plot;
mod settings;
mod workflow;

use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use nachhall_core::{
    angular_distance,
    signals::{write_signal, ExponentialSweep, FiniteSignal, WhiteNoise},
    Dimensions, Material, Method, Room,
};

use crate::settings::{MethodKind, Settings};

/// Simulates a shoebox room tuned to a target reverberation time.
#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    /// Simulation method, overrides the configured one
    #[arg(long, value_enum)]
    method: Option<MethodKind>,
    /// Settings file, `nachhall.toml` is used if present
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log more, repeat for even more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    subcommand: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Prints the angle between two vectors, in radians
    Angle {
        /// First vector, separated by spaces or commas
        #[arg(
            num_args = 1..,
            value_delimiter = ',',
            default_value = "1,1",
            allow_negative_numbers = true
        )]
        a: Vec<f64>,
        /// Second vector, takes every value up to the end of the line
        #[arg(
            long = "vs",
            num_args = 1..,
            value_delimiter = ',',
            default_value = "1,2",
            allow_hyphen_values = true
        )]
        b: Vec<f64>,
        /// Treat opposite vectors as parallel
        #[arg(long)]
        sign_invariant: bool,
    },
    /// Renders an empty 5 m cube
    PlotRoom {
        #[arg(short, long, default_value = "room.png")]
        output: PathBuf,
    },
    /// Writes a test signal to use as dry input
    Generate {
        #[arg(short, long, default_value = "samples/guitar_16k.wav")]
        output: PathBuf,
        #[arg(long, value_enum, default_value_t = SignalKind::Sweep)]
        signal: SignalKind,
        #[arg(short, long, default_value_t = 16_000)]
        sample_rate: u32,
        #[arg(short, long, default_value_t = 5)]
        duration: u64,
        /// Makes the noise repeatable
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SignalKind {
    /// Exponential sine sweep from 50 Hz to just below Nyquist
    Sweep,
    /// Uniform white noise
    Noise,
}

const SIGNAL_AMPLITUDE: f32 = 0.5;

fn test_signal(
    kind: SignalKind,
    sample_rate: u32,
    duration: Duration,
    seed: Option<u64>,
) -> Box<dyn FiniteSignal> {
    match kind {
        SignalKind::Sweep => Box::new(ExponentialSweep::new(
            50.0,
            0.45 * sample_rate as f32,
            SIGNAL_AMPLITUDE,
            duration,
            sample_rate,
        )),
        SignalKind::Noise => {
            let n_samples = (duration.as_secs_f64() * sample_rate as f64) as usize;
            Box::new(match seed {
                Some(seed) => WhiteNoise::with_seed(SIGNAL_AMPLITUDE, n_samples, seed),
                None => WhiteNoise::new(SIGNAL_AMPLITUDE, n_samples),
            })
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Err(err) = log::init(cli.verbose) {
        eprintln!("nachhall: failed to initialize logger: {err}");
    }

    match cli.subcommand {
        Some(Command::Angle {
            a,
            b,
            sign_invariant,
        }) => {
            let angle = angular_distance(&a, &b, sign_invariant)?;
            println!("angle: {angle}");

            Ok(())
        }
        Some(Command::PlotRoom { output }) => {
            let dimensions = Dimensions::new(5.0, 5.0, 5.0)?;
            let material = Material::from_amplitude_absorption(0.2)?;
            let room = Room::new(dimensions, 16_000, material, Method::ism(15), false);

            plot::plot_room(&room, &output)?;
            log::info!(path = %output.display(), "plotted room");

            Ok(())
        }
        Some(Command::Generate {
            output,
            signal,
            sample_rate,
            duration,
            seed,
        }) => {
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let samples = test_signal(signal, sample_rate, Duration::from_secs(duration), seed);
            write_signal(samples, sample_rate, &output)
                .with_context(|| format!("failed to write {}", output.display()))?;
            log::info!(path = %output.display(), ?signal, "wrote test signal");

            Ok(())
        }
        None => {
            let mut settings =
                Settings::load(cli.config.as_deref()).context("failed to load settings")?;
            if let Some(method) = cli.method {
                settings.method = method;
            }
            log::debug!(?settings, "loaded settings");

            let report = workflow::run(&settings)?;
            log::info!(
                output = %report.output.display(),
                absorption = report.absorption,
                max_order = report.max_order,
                max_rir_len = report.max_rir_len,
                pairs = report.rt60.iter().map(Vec::len).sum::<usize>(),
                plots = report.plots.len(),
                "done"
            );

            Ok(())
        }
    }
}
