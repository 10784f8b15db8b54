//! Conversion driver: discovers frames and fans them out over a worker pool.

use crate::{
    camera::{load_image, save_png},
    error::{Error, IoResultExt, Result},
    io::{write_bin_file, write_label_file, LabelAllSink},
    label::{transcode_labels, CategoryFilter, CategoryMap},
    layout::{check_index, frame_name, OutputLayout, PRIMARY_VIEW},
    lidar::reencode_point_cloud,
    types::{Mode, SplitPrefix},
};
use image::DynamicImage;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub load_dir: PathBuf,
    pub save_dir: PathBuf,
    pub mode: Mode,
    pub prefix: SplitPrefix,
    pub workers: usize,
    /// Test splits have no ground truth, so no label is read or written.
    pub test_mode: bool,
    pub filter: CategoryFilter,
    pub class_map: CategoryMap,
    pub label_all: bool,
}

/// One unit of work: a sensor file and its label inside a session directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub dir_idx: usize,
    pub file_idx: usize,
    pub session: PathBuf,
    pub stem: String,
    pub sensor_path: PathBuf,
}

impl Frame {
    pub fn key(&self) -> (usize, usize) {
        (self.dir_idx, self.file_idx)
    }

    pub fn name(&self, prefix: SplitPrefix) -> String {
        frame_name(prefix, self.file_idx, self.dir_idx)
    }

    pub fn label_path(&self) -> PathBuf {
        self.session.join(format!("{}.json", self.stem))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sensor_path.display())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub objects: usize,
    pub points: usize,
    pub label_all_lines: Option<usize>,
}

impl ConversionSummary {
    pub fn print_summary(&self) {
        info!("=== Conversion Summary ===");
        info!("Frames: {}", self.total);
        info!("Succeeded: {}", self.succeeded);
        info!("Objects written: {}", self.objects);
        info!("Points written: {}", self.points);
        if let Some(lines) = self.label_all_lines {
            info!("Aggregate label lines: {}", lines);
        }

        if self.failed > 0 {
            warn!("Failed: {}", self.failed);
        } else {
            info!("Failed: 0");
        }
    }
}

struct FrameReport {
    objects: usize,
    points: usize,
}

enum SensorData {
    Scan(Vec<[f32; 4]>),
    Image(DynamicImage),
}

/// Lists the frames of every session directory under `load_dir`.
///
/// Sessions and sensor files are sorted by name, which fixes `dir_idx` and
/// `file_idx` across runs.
pub fn discover_frames<P>(load_dir: P, mode: Mode) -> Result<Vec<Frame>>
where
    P: AsRef<Path>,
{
    let load_dir = load_dir.as_ref();
    let extension = mode
        .sensor_extension()
        .ok_or_else(|| unsupported_mode(mode))?;

    let mut sessions: Vec<PathBuf> = fs::read_dir(load_dir)
        .with_path(load_dir)?
        .map(|entry| entry.map(|entry| entry.path()).with_path(load_dir))
        .filter(|path| path.as_ref().map_or(true, |path| path.is_dir()))
        .collect::<Result<_>>()?;
    sessions.sort();

    let mut frames = vec![];

    for (dir_idx, session) in sessions.into_iter().enumerate() {
        check_index(dir_idx, &session)?;

        let pattern = format!(
            "{}/*.{extension}",
            glob::Pattern::escape(&session.to_string_lossy())
        );
        let mut sensor_files: Vec<PathBuf> = glob::glob(&pattern)
            .map_err(|err| Error::malformed(&session, err))?
            .map(|entry| {
                entry.map_err(|err| Error::io(err.path().to_path_buf(), err.into_error()))
            })
            .collect::<Result<_>>()?;
        sensor_files.sort();

        for (file_idx, sensor_path) in sensor_files.into_iter().enumerate() {
            check_index(file_idx, &sensor_path)?;

            let stem = sensor_path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .ok_or_else(|| Error::malformed(&sensor_path, "file name is not valid UTF-8"))?
                .to_string();

            frames.push(Frame {
                dir_idx,
                file_idx,
                session: session.clone(),
                stem,
                sensor_path,
            });
        }
    }

    Ok(frames)
}

/// Converts every frame under `config.load_dir`.
///
/// A failing frame is logged and counted without stopping the others.
pub fn convert(config: &ConvertConfig) -> Result<ConversionSummary> {
    if config.mode == Mode::MultiModal {
        return Err(unsupported_mode(config.mode));
    }

    let frames = discover_frames(&config.load_dir, config.mode)?;
    if frames.is_empty() {
        warn!("No frames found under '{}'", config.load_dir.display());
    }

    let layout = OutputLayout::new(&config.save_dir, config.prefix, !config.test_mode);
    layout.create()?;

    let sink = (config.label_all && !config.test_mode)
        .then(|| LabelAllSink::new(layout.label_all_path()));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()?;

    info!(
        "Converting {} frames with {} workers...",
        frames.len(),
        config.workers
    );
    let pb = create_progress_bar(frames.len() as u64);

    let reports: Vec<Option<FrameReport>> = pool.install(|| {
        frames
            .par_iter()
            .map(|frame| {
                let report = match convert_frame(frame, config, &layout, sink.as_ref()) {
                    Ok(report) => Some(report),
                    Err(err) => {
                        error!("Failed to convert frame {frame}: {err}");
                        None
                    }
                };
                pb.inc(1);
                report
            })
            .collect()
    });
    pb.finish_and_clear();

    let mut summary = ConversionSummary {
        total: frames.len(),
        ..Default::default()
    };
    for report in reports {
        match report {
            Some(FrameReport { objects, points }) => {
                summary.succeeded += 1;
                summary.objects += objects;
                summary.points += points;
            }
            None => summary.failed += 1,
        }
    }

    if let Some(sink) = sink {
        summary.label_all_lines = Some(sink.finish()?);
    }

    summary.print_summary();
    Ok(summary)
}

/// Decodes every input of a frame, then writes its outputs. A frame that
/// fails leaves no output behind.
fn convert_frame(
    frame: &Frame,
    config: &ConvertConfig,
    layout: &OutputLayout,
    sink: Option<&LabelAllSink>,
) -> Result<FrameReport> {
    let name = frame.name(config.prefix);

    let labels = if config.test_mode {
        None
    } else {
        Some(transcode_labels(
            frame.label_path(),
            &config.filter,
            &config.class_map,
        )?)
    };

    let (sensor, sensor_path) = match config.mode {
        Mode::PointCloud => (
            SensorData::Scan(reencode_point_cloud(&frame.sensor_path)?),
            layout.velodyne_path(&name),
        ),
        Mode::Image => (
            SensorData::Image(load_image(&frame.sensor_path)?),
            layout.image_path(PRIMARY_VIEW, &name),
        ),
        Mode::MultiModal => return Err(unsupported_mode(config.mode)),
    };
    let label_path = layout.label_path(PRIMARY_VIEW, &name);

    let written = write_sensor(&sensor, &sensor_path).and_then(|points| {
        if let Some(labels) = &labels {
            write_label_file(&labels.objects, &label_path)?;
        }
        Ok(points)
    });
    let points = match written {
        Ok(points) => points,
        Err(err) => {
            discard_output(&sensor_path);
            if labels.is_some() {
                discard_output(&label_path);
            }
            return Err(err);
        }
    };

    let objects = match labels {
        Some(labels) => {
            if let Some(sink) = sink {
                sink.submit(frame.key(), &name, &labels.objects);
            }
            labels.objects.len()
        }
        None => 0,
    };

    Ok(FrameReport { objects, points })
}

fn write_sensor(sensor: &SensorData, path: &Path) -> Result<usize> {
    match sensor {
        SensorData::Scan(points) => {
            write_bin_file(points, path)?;
            Ok(points.len())
        }
        SensorData::Image(image) => {
            save_png(image, path)?;
            Ok(0)
        }
    }
}

fn discard_output(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!("Unable to remove '{}': {err}", path.display()),
    }
}

fn unsupported_mode(mode: Mode) -> Error {
    Error::UnsupportedMode(format!(
        "{mode:?} conversion needs calibration export, which is not implemented"
    ))
}

fn create_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");
    pb.set_style(style);
    pb
}
