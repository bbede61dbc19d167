//! Builds the configured scene, simulates it and writes out the results.

use std::path::{Path, PathBuf};

use anyhow::Context;
use nachhall_core::{
    inverse_sabine,
    wav::{write_wav, BitDepth},
    Dimensions, Material, Method, Room, Signal, HYBRID_ISM_ORDER,
};

use crate::{
    log::{debug, info},
    plot,
    settings::{MethodKind, Settings},
};

/// Decay range the reported reverberation time is measured over, in dB.
const RT60_DECAY_DB: f64 = 60.0;

/// Microphone and source whose reverberation time is printed.
const REPORTED_PAIR: (usize, usize) = (1, 0);

#[derive(Debug)]
pub struct Report {
    pub output: PathBuf,
    pub absorption: f64,
    pub max_order: u32,
    pub max_rir_len: usize,
    /// Measured reverberation times, indexed `[mic][source]`.
    pub rt60: Vec<Vec<f64>>,
    pub plots: Vec<PathBuf>,
}

pub fn run(settings: &Settings) -> anyhow::Result<Report> {
    let (absorption, max_order) = inverse_sabine(
        settings.rt60_target,
        &settings.room_dim,
        settings.speed_of_sound,
    )
    .context("failed to derive room parameters")?;
    info!(absorption, max_order, "derived room parameters");

    let signal = Signal::from_file(&settings.input)
        .with_context(|| format!("failed to read {}", settings.input.display()))?;
    let sample_rate = settings.sample_rate.unwrap_or(signal.sample_rate());

    let method = match settings.method {
        MethodKind::Ism => Method::Ism {
            max_order,
            randomized: true,
        },
        MethodKind::Hybrid => Method::Hybrid {
            ism_order: HYBRID_ISM_ORDER,
            rays: (&settings.rays).into(),
        },
    };

    let mut room = build_room(settings, absorption, sample_rate, method, &signal)
        .context("failed to set up the room")?;

    room.simulate().context("simulation failed")?;
    let rirs = room.rirs()?;

    let output = settings
        .output_dir
        .join(output_file_name(&settings.input, settings.method));
    std::fs::create_dir_all(&settings.output_dir)
        .with_context(|| format!("failed to create {}", settings.output_dir.display()))?;
    write_wav(
        &output,
        room.mic_signals()?,
        sample_rate,
        true,
        BitDepth::Int16,
    )
    .with_context(|| format!("failed to write {}", output.display()))?;
    info!(path = %output.display(), "wrote reverberant signals");

    let rt60 = room
        .measure_rt60(RT60_DECAY_DB)
        .context("failed to measure the reverberation time")?;
    for (mic, row) in rt60.iter().enumerate() {
        for (source, value) in row.iter().enumerate() {
            let edt = rirs.get(mic, source).and_then(|rir| rir.edt().ok());
            debug!(mic, source, rt60 = value, ?edt, "measured reverberation time");
        }
    }

    let (mic, source) = REPORTED_PAIR;
    let reported = rt60
        .get(mic)
        .or_else(|| rt60.first())
        .and_then(|row| row.get(source));
    println!("The desired RT60 was {}", settings.rt60_target);
    if let Some(measured) = reported {
        println!("The measured RT60 is {measured}");
    }

    let mut plots = Vec::new();
    if settings.plot.enabled {
        for kind in plot::Kind::ALL {
            let path = settings.output_dir.join(kind.file_name());
            let panels = plot::plot_rirs(rirs, settings.plot.select.as_deref(), kind, &path)
                .with_context(|| format!("failed to plot {}", path.display()))?;
            debug!(?kind, panels, "plotted impulse responses");
            plots.push(path);
        }
    }

    Ok(Report {
        output,
        absorption,
        max_order,
        max_rir_len: rirs.max_len(),
        rt60,
        plots,
    })
}

fn build_room(
    settings: &Settings,
    absorption: f64,
    sample_rate: u32,
    method: Method,
    signal: &Signal,
) -> Result<Room, nachhall_core::Error> {
    let dimensions = Dimensions::from_slice(&settings.room_dim)?;
    let material = Material::new(absorption)?;

    let mut room = Room::new(dimensions, sample_rate, material, method, true)
        .with_speed_of_sound(settings.speed_of_sound);
    if let Some(seed) = settings.seed {
        room = room.with_seed(seed);
    }

    for (position, delay) in settings.source_points() {
        room.add_source(position, signal.clone(), delay)?;
    }
    room.add_microphone_array(settings.microphone_points())?;

    Ok(room)
}

/// `<input stem>_reverb_<method>.wav`
fn output_file_name(input: &Path, method: MethodKind) -> String {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_else(|| "output".into());

    format!("{stem}_reverb_{}.wav", method.name())
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use nachhall_core::signals::{write_signal, ExponentialSweep};

    use super::*;

    fn settings(dir: &Path, method: MethodKind) -> Settings {
        let input = dir.join("guitar_8k.wav");
        let sweep = ExponentialSweep::new(50.0, 3_500.0, 0.5, Duration::from_millis(250), 8_000);
        write_signal(sweep, 8_000, &input).unwrap();

        let mut settings = Settings {
            method,
            input,
            output_dir: dir.join("out"),
            seed: Some(1),
            ..Default::default()
        };
        settings.rays.n_rays = 500;
        settings
    }

    fn check_output(settings: &Settings, report: &Report, name: &str) {
        assert_eq!(report.output, settings.output_dir.join(name));

        let reader = hound::WavReader::open(&report.output).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 4);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_rate, 8_000);

        // 2000 samples of input delayed by 4000
        let mut expected = report.max_rir_len + 6_000 - 1;
        expected += expected % 2;
        assert_eq!(reader.duration() as usize, expected);

        assert_eq!(report.rt60.len(), 4);
        for value in report.rt60.iter().flatten() {
            assert!(value.is_finite() && *value > 0.0, "got {value}");
        }

        assert_eq!(report.plots.len(), 3);
        for plot in &report.plots {
            assert!(std::fs::metadata(plot).unwrap().len() > 0);
        }
    }

    #[test]
    fn image_source_scene() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), MethodKind::Ism);

        let report = run(&settings).unwrap();

        assert!((report.absorption - 0.895).abs() < 1e-3);
        assert_eq!(report.max_order, 10);
        check_output(&settings, &report, "guitar_8k_reverb_ism.wav");
    }

    #[test]
    fn hybrid_scene() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path(), MethodKind::Hybrid);

        let report = run(&settings).unwrap();

        check_output(&settings, &report, "guitar_8k_reverb_hybrid.wav");
    }

    #[test]
    fn invalid_room_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            room_dim: vec![10.0, 0.0, 10.0],
            input: dir.path().join("missing.wav"),
            output_dir: dir.path().join("out"),
            ..Default::default()
        };

        let err = run(&settings).unwrap_err();

        assert!(format!("{err:#}").contains("room dimensions"), "{err:#}");
        assert!(!settings.output_dir.exists());
    }

    #[test]
    fn sample_rate_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path(), MethodKind::Ism);
        settings.sample_rate = Some(16_000);

        let err = run(&settings).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<nachhall_core::Error>(),
            Some(nachhall_core::Error::SampleRateMismatch {
                signal: 8_000,
                room: 16_000
            })
        ));
        assert!(!settings.output_dir.exists());
    }

    #[test]
    fn output_name_follows_input_and_method() {
        assert_eq!(
            output_file_name(Path::new("samples/guitar_16k.wav"), MethodKind::Hybrid),
            "guitar_16k_reverb_hybrid.wav"
        );
    }
}
