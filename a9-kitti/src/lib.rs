//! Converts A9 datasets (JSON 3D box labels, `.pcd` scans, images) into the
//! KITTI layout.

pub mod camera;
pub mod convert;
pub mod error;
pub mod io;
pub mod label;
pub mod layout;
pub mod lidar;
pub mod types;
pub mod utils;

pub use convert::{convert, discover_frames, ConversionSummary, ConvertConfig, Frame};
pub use error::{Error, Result};
pub use label::{transcode_labels, CategoryFilter, CategoryMap, TranscodedLabels};
pub use lidar::reencode_point_cloud;
pub use types::{FileFormat, Mode, SplitPrefix};
