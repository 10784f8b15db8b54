use clap::ValueEnum;
use std::fmt;

/// The sensor data a conversion run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Mode {
    #[value(name = "point-cloud")]
    PointCloud,
    #[value(name = "image")]
    Image,
    #[value(name = "multi-modal")]
    MultiModal,
}

impl Mode {
    /// Extension of the per-frame input file that defines the frames.
    pub fn sensor_extension(&self) -> Option<&'static str> {
        match self {
            Mode::PointCloud => Some("pcd"),
            Mode::Image => Some("png"),
            Mode::MultiModal => None,
        }
    }
}

/// Dataset split, written as the first digit of every output file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum SplitPrefix {
    #[value(name = "0", alias = "train")]
    Train,
    #[value(name = "1", alias = "val")]
    Val,
    #[value(name = "2", alias = "test")]
    Test,
}

impl SplitPrefix {
    pub fn digit(&self) -> u8 {
        match self {
            SplitPrefix::Train => 0,
            SplitPrefix::Val => 1,
            SplitPrefix::Test => 2,
        }
    }
}

impl fmt::Display for SplitPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.digit())
    }
}

/// File kinds understood by the inspection commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum FileFormat {
    #[value(name = "pcd")]
    Pcd,
    #[value(name = "bin.kitti")]
    KittiBin,
    #[value(name = "label.kitti")]
    KittiLabel,
}
