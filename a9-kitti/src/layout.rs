//! Output directory tree and the fixed-width file naming scheme.
//!
//! KITTI tooling parses file names positionally, so every artifact of a
//! frame is named `{prefix}{file_idx:03}{dir_idx:03}`.

use crate::{
    error::{Error, IoResultExt, Result},
    types::SplitPrefix,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Largest index representable in a 3-digit name component.
pub const MAX_INDEX: usize = 999;

/// The view every single-sensor frame is written to.
pub const PRIMARY_VIEW: usize = 0;

pub fn frame_name(prefix: SplitPrefix, file_idx: usize, dir_idx: usize) -> String {
    format!("{prefix}{file_idx:03}{dir_idx:03}")
}

/// Rejects an index that would widen a 3-digit name component.
pub fn check_index(index: usize, path: &Path) -> Result<()> {
    if index > MAX_INDEX {
        return Err(Error::malformed(
            path,
            format!("index {index} exceeds the 3-digit naming limit of {MAX_INDEX}"),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    prefix: SplitPrefix,
    with_labels: bool,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, prefix: SplitPrefix, with_labels: bool) -> Self {
        Self {
            root: root.into(),
            prefix,
            with_labels,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn prefix(&self) -> SplitPrefix {
        self.prefix
    }

    pub fn velodyne_dir(&self) -> PathBuf {
        self.root.join("velodyne")
    }

    pub fn label_dir(&self, view: usize) -> PathBuf {
        self.root.join(format!("label_{view}"))
    }

    pub fn image_dir(&self, view: usize) -> PathBuf {
        self.root.join(format!("image_{view}"))
    }

    pub fn label_all_dir(&self) -> PathBuf {
        self.root.join("label_all")
    }

    pub fn calib_dir(&self) -> PathBuf {
        self.root.join("calib")
    }

    pub fn pose_dir(&self) -> PathBuf {
        self.root.join("pose")
    }

    pub fn timestamp_dir(&self) -> PathBuf {
        self.root.join("timestamp")
    }

    pub fn label_path(&self, view: usize, name: &str) -> PathBuf {
        self.label_dir(view).join(format!("{name}.txt"))
    }

    pub fn velodyne_path(&self, name: &str) -> PathBuf {
        self.velodyne_dir().join(format!("{name}.bin"))
    }

    pub fn image_path(&self, view: usize, name: &str) -> PathBuf {
        self.image_dir(view).join(format!("{name}.png"))
    }

    /// The aggregate label file shared by every frame of this split.
    pub fn label_all_path(&self) -> PathBuf {
        self.label_all_dir().join(format!("{}.txt", self.prefix))
    }

    pub fn dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![
            self.calib_dir(),
            self.velodyne_dir(),
            self.pose_dir(),
            self.timestamp_dir(),
            self.image_dir(PRIMARY_VIEW),
        ];
        if self.with_labels {
            dirs.push(self.label_all_dir());
            dirs.push(self.label_dir(PRIMARY_VIEW));
        }
        dirs
    }

    /// Creates the directory tree. Existing directories and their files are
    /// kept, so several splits may share one root.
    pub fn create(&self) -> Result<()> {
        for dir in self.dirs() {
            fs::create_dir_all(&dir).with_path(&dir)?;
        }
        Ok(())
    }
}
