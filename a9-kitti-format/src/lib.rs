//! Data models of the A9 source layout and the KITTI target layout.

mod a9;
mod kitti;

pub use a9::*;
pub use kitti::*;
