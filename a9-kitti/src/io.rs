use crate::error::{Error, IoResultExt, Result};
use a9_kitti_format::{BinPoint, KittiObject};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, prelude::*, BufReader, BufWriter},
    iter,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

/// Writes headerless little-endian `f32` quadruples.
pub struct RawBinWriter {
    writer: BufWriter<File>,
}

impl RawBinWriter {
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let writer = BufWriter::new(File::create(path)?);
        Ok(Self { writer })
    }

    pub fn push(&mut self, point: [f32; 4]) -> io::Result<()> {
        for val in point {
            self.writer.write_f32::<LittleEndian>(val)?;
        }
        Ok(())
    }

    /// Flushes the buffer and closes the file, reporting any write error
    /// that dropping the writer would swallow.
    pub fn finish(self) -> io::Result<()> {
        let file = self.writer.into_inner().map_err(|err| err.into_error())?;
        file.sync_all()
    }
}

pub fn write_bin_file<P>(points: &[[f32; 4]], bin_file: P) -> Result<()>
where
    P: AsRef<Path>,
{
    let bin_file = bin_file.as_ref();
    let mut writer = RawBinWriter::from_path(bin_file).with_path(bin_file)?;

    for &point in points {
        writer.push(point).with_path(bin_file)?;
    }

    writer.finish().with_path(bin_file)
}

pub fn load_bin_iter<P>(path: P) -> Result<impl Iterator<Item = Result<BinPoint>>>
where
    P: AsRef<Path>,
{
    let bin_path = path.as_ref().to_path_buf();
    let mut input = BufReader::new(File::open(&bin_path).with_path(&bin_path)?);

    macro_rules! read_f32 {
        () => {{
            input.read_f32::<LittleEndian>()
        }};
    }

    macro_rules! try_read_f32 {
        () => {{
            let mut buf = [0u8; 4];
            let cnt = input.read(&mut buf)?;

            match cnt {
                4 => Ok(Some(f32::from_le_bytes(buf))),
                0 => Ok(None),
                cnt => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("Truncated f32 found. Expect 4 bytes, but read {cnt} bytes."),
                )),
            }
        }};
    }

    let mut next = move || -> io::Result<Option<BinPoint>> {
        let Some(x) = try_read_f32!()? else {
            return Ok(None);
        };
        let y = read_f32!()?;
        let z = read_f32!()?;
        let intensity = read_f32!()?;

        let point = BinPoint { x, y, z, intensity };
        Ok(Some(point))
    };

    let mut failed = false;
    Ok(iter::from_fn(move || {
        if failed {
            return None;
        }
        let item = next().transpose()?;
        failed = item.is_err();
        Some(item.map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => Error::malformed(&bin_path, err),
            _ => Error::io(&bin_path, err),
        }))
    }))
}

/// Writes one KITTI line per object. An empty slice produces an empty file.
pub fn write_label_file<P>(objects: &[KittiObject], label_file: P) -> Result<()>
where
    P: AsRef<Path>,
{
    let label_file = label_file.as_ref();
    let mut writer = BufWriter::new(File::create(label_file).with_path(label_file)?);

    for object in objects {
        writeln!(writer, "{object}").with_path(label_file)?;
    }

    writer
        .into_inner()
        .map_err(|err| err.into_error())
        .and_then(|file| file.sync_all())
        .with_path(label_file)
}

pub fn read_label_lines<P>(label_file: P) -> Result<Vec<KittiObject>>
where
    P: AsRef<Path>,
{
    let label_file = label_file.as_ref();
    let reader = BufReader::new(File::open(label_file).with_path(label_file)?);

    reader
        .lines()
        .enumerate()
        .map(|(lineno, line)| {
            let line = line.with_path(label_file)?;
            line.parse()
                .map_err(|err| Error::malformed(label_file, format!("line {}: {err}", lineno + 1)))
        })
        .collect()
}

/// Collects the label lines of every frame into one aggregate file.
///
/// Frames submit concurrently; the file is written once by [finish] in
/// `(dir_idx, file_idx)` order so its content does not depend on worker
/// scheduling. Each line is the KITTI line followed by the frame name.
///
/// [finish]: LabelAllSink::finish
pub struct LabelAllSink {
    path: PathBuf,
    frames: Mutex<BTreeMap<(usize, usize), Vec<String>>>,
}

impl LabelAllSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frames: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn submit(&self, key: (usize, usize), frame_name: &str, objects: &[KittiObject]) {
        let lines = objects
            .iter()
            .map(|object| format!("{object} {frame_name}"))
            .collect();

        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, lines);
    }

    /// Writes the aggregate file and returns the number of lines.
    pub fn finish(self) -> Result<usize> {
        let Self { path, frames } = self;
        let frames = frames.into_inner().unwrap_or_else(PoisonError::into_inner);

        let mut writer = BufWriter::new(File::create(&path).with_path(&path)?);
        let mut count = 0;

        for line in frames.values().flatten() {
            writeln!(writer, "{line}").with_path(&path)?;
            count += 1;
        }

        writer
            .into_inner()
            .map_err(|err| err.into_error())
            .and_then(|file| file.sync_all())
            .with_path(&path)?;
        Ok(count)
    }
}
