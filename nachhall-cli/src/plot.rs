use std::{collections::BTreeSet, path::Path};

use anyhow::bail;
use nachhall_core::{ImpulseResponse, Rirs, Room};
use ndarray::Array2;
use ndarray_stats::QuantileExt;
use plotters::{coord::Shift, prelude::*};

/// Size of one panel in the grid, in pixels.
const PANEL_SIZE: (u32, u32) = (320, 240);

/// Lowest level drawn in transfer function panels, relative to the peak.
const TF_RANGE_DB: f32 = 100.0;

const SPECTROGRAM_WINDOW: usize = 256;
const SPECTROGRAM_HOP: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Impulse response over time
    Ir,
    /// Magnitude of the transfer function in dB
    Tf,
    Spec,
}

impl Kind {
    pub const ALL: [Kind; 3] = [Kind::Ir, Kind::Tf, Kind::Spec];

    pub fn file_name(&self) -> &'static str {
        match self {
            Kind::Ir => "rir_ir.png",
            Kind::Tf => "rir_tf.png",
            Kind::Spec => "rir_spec.png",
        }
    }
}

/// Draws one panel per selected `[mic, source]` pair, microphones in rows and
/// sources in columns. Without a selection every pair is drawn.
///
/// Returns the number of panels drawn.
pub fn plot_rirs(
    rirs: &Rirs,
    select: Option<&[[usize; 2]]>,
    kind: Kind,
    path: &Path,
) -> anyhow::Result<usize> {
    let pairs: Vec<(usize, usize)> = match select {
        Some(select) => select.iter().map(|[mic, source]| (*mic, *source)).collect(),
        None => rirs.pairs().map(|(mic, source, _)| (mic, source)).collect(),
    };
    if pairs.is_empty() {
        bail!("no impulse responses to plot");
    }
    if let Some((mic, source)) = pairs.iter().find(|(m, s)| rirs.get(*m, *s).is_none()) {
        bail!("there is no impulse response from source {source} to mic {mic}");
    }

    let mics: Vec<usize> = unique(pairs.iter().map(|(mic, _)| *mic));
    let sources: Vec<usize> = unique(pairs.iter().map(|(_, source)| *source));

    let size = (
        PANEL_SIZE.0 * sources.len() as u32,
        PANEL_SIZE.1 * mics.len() as u32,
    );
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let panels = root.split_evenly((mics.len(), sources.len()));

    for (mic, source) in &pairs {
        let (Some(row), Some(column)) = (
            mics.iter().position(|m| m == mic),
            sources.iter().position(|s| s == source),
        ) else {
            continue;
        };
        let Some(rir) = rirs.get(*mic, *source) else {
            continue;
        };

        let panel = &panels[row * sources.len() + column];
        match kind {
            Kind::Ir => draw_impulse_response(panel, rir)?,
            Kind::Tf => draw_transfer_function(panel, rir)?,
            Kind::Spec => draw_spectrogram(panel, rir)?,
        }
    }

    root.present()?;

    Ok(pairs.len())
}

fn unique(indices: impl Iterator<Item = usize>) -> Vec<usize> {
    indices.collect::<BTreeSet<_>>().into_iter().collect()
}

fn draw_impulse_response<DB>(
    area: &DrawingArea<DB, Shift>,
    rir: &ImpulseResponse,
) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let peak = rir.data.iter().fold(0.0f32, |peak, s| peak.max(s.abs()));
    let peak = if peak > 0.0 { peak } else { 1.0 };
    let duration = (rir.duration() as f32).max(f32::EPSILON);

    let mut chart = ChartBuilder::on(area)
        .margin(8)
        .build_cartesian_2d(0f32..duration, -peak..peak)?;

    let time_step = 1.0 / rir.sample_rate as f32;
    chart.draw_series(LineSeries::new(
        rir.data
            .iter()
            .enumerate()
            .map(|(n, s)| (n as f32 * time_step, *s)),
        &BLUE,
    ))?;

    Ok(())
}

fn draw_transfer_function<DB>(
    area: &DrawingArea<DB, Shift>,
    rir: &ImpulseResponse,
) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let response = rir.frequency_response();
    let magnitude: Vec<f32> = response.magnitude_db().collect();

    let top = magnitude.iter().copied().fold(f32::MIN, f32::max);
    let bottom = top - TF_RANGE_DB;
    let nyquist = rir.sample_rate as f32 / 2.0;

    let mut chart = ChartBuilder::on(area)
        .margin(8)
        .build_cartesian_2d(0f32..nyquist, bottom..top + 1.0)?;

    chart.draw_series(LineSeries::new(
        response
            .frequencies()
            .zip(magnitude.iter().map(|db| db.max(bottom))),
        &RED,
    ))?;

    Ok(())
}

fn draw_spectrogram<DB>(area: &DrawingArea<DB, Shift>, rir: &ImpulseResponse) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let spectrogram = rir.spectrogram(SPECTROGRAM_WINDOW, SPECTROGRAM_HOP);
    let (n_frames, n_bins) = (spectrogram.n_frames(), spectrogram.n_bins());

    let magnitudes = Array2::from_shape_vec(
        (n_frames, n_bins),
        spectrogram.frames.into_iter().flatten().collect(),
    )?;
    let highest = magnitudes.max_skipnan().sqrt();
    let highest = if highest > 0.0 { highest } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .margin(8)
        .build_cartesian_2d(0..n_frames, 0..n_bins)?;

    let color_scale = colorous::TURBO;
    chart.draw_series(magnitudes.indexed_iter().map(|((frame, bin), magnitude)| {
        let scaled = magnitude.sqrt() / highest;
        let color = color_scale.eval_continuous(scaled as f64);

        Rectangle::new(
            [(frame, bin), (frame + 1, bin + 1)],
            RGBColor(color.r, color.g, color.b).filled(),
        )
    }))?;

    Ok(())
}

/// Draws the room as a wireframe with its sources in red and microphones in
/// blue. Height points up.
pub fn plot_room(room: &Room, path: &Path) -> anyhow::Result<()> {
    let root = BitMapBackend::new(path, (640, 480)).into_drawing_area();
    root.fill(&WHITE)?;

    let [width, depth, height] = room.dimensions().as_array();
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_3d(0.0..width, 0.0..height, 0.0..depth)?;
    chart.with_projection(|mut projection| {
        projection.yaw = 0.6;
        projection.pitch = 0.3;
        projection.scale = 0.8;
        projection.into_matrix()
    });

    for (from, to) in room.dimensions().edges() {
        chart.draw_series(LineSeries::new(
            [(from.x, from.z, from.y), (to.x, to.z, to.y)],
            &BLACK,
        ))?;
    }

    chart.draw_series(room.sources().iter().map(|source| {
        let p = source.position;
        Circle::new((p.x, p.z, p.y), 5, RED.filled())
    }))?;
    chart.draw_series(
        room.microphones()
            .iter()
            .map(|p| Circle::new((p.x, p.z, p.y), 4, BLUE.filled())),
    )?;

    root.present()?;

    Ok(())
}

#[cfg(test)]
mod test {
    use nachhall_core::{Dimensions, Material, Method, Point, Signal};

    use super::*;

    fn simulated_room() -> Room {
        let dimensions = Dimensions::new(4.0, 3.0, 2.5).unwrap();
        let material = Material::new(0.6).unwrap();
        let mut room = Room::new(dimensions, 8_000, material, Method::ism(4), false).with_seed(5);

        let mut click = vec![0.0; 16];
        click[0] = 1.0;
        for position in [Point::new(1.0, 1.0, 1.0), Point::new(3.0, 2.0, 1.2)] {
            room.add_source(position, Signal::new(8_000, click.clone()), 0.0)
                .unwrap();
        }
        room.add_microphone_array(vec![
            Point::new(2.0, 1.5, 1.0),
            Point::new(0.5, 2.5, 2.0),
            Point::new(3.5, 0.5, 0.5),
        ])
        .unwrap();
        room.simulate().unwrap();

        room
    }

    /// Width and height from the header of a PNG file.
    fn png_size(path: &Path) -> (u32, u32) {
        let bytes = std::fs::read(path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");

        let word = |at: usize| {
            u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        (word(16), word(20))
    }

    #[test]
    fn one_panel_per_pair() {
        let dir = tempfile::tempdir().unwrap();
        let room = simulated_room();
        let rirs = room.rirs().unwrap();

        for kind in Kind::ALL {
            let path = dir.path().join(kind.file_name());
            let panels = plot_rirs(rirs, None, kind, &path).unwrap();

            assert_eq!(panels, 6);
            assert_eq!(png_size(&path), (2 * 320, 3 * 240));
        }
    }

    #[test]
    fn selection_shapes_the_grid() {
        let dir = tempfile::tempdir().unwrap();
        let room = simulated_room();
        let path = dir.path().join("selected.png");

        let panels = plot_rirs(
            room.rirs().unwrap(),
            Some(&[[0, 1], [2, 1]]),
            Kind::Ir,
            &path,
        )
        .unwrap();

        assert_eq!(panels, 2);
        assert_eq!(png_size(&path), (320, 2 * 240));
    }

    #[test]
    fn unknown_pair_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let room = simulated_room();
        let path = dir.path().join("unknown.png");

        assert!(plot_rirs(room.rirs().unwrap(), Some(&[[3, 0]]), Kind::Tf, &path).is_err());
        assert!(plot_rirs(room.rirs().unwrap(), Some(&[]), Kind::Tf, &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn room_wireframe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("room.png");

        plot_room(&simulated_room(), &path).unwrap();

        assert_eq!(png_size(&path), (640, 480));
    }
}
