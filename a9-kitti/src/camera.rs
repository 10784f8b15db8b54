use crate::error::{Error, Result};
use image::{DynamicImage, ImageError, ImageFormat};
use std::{io, path::Path};

pub fn load_image<P>(path: P) -> Result<DynamicImage>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    image::open(path).map_err(|err| match err {
        ImageError::IoError(err) => Error::io(path, err),
        err => Error::malformed(path, err),
    })
}

/// Re-encodes an image as PNG.
pub fn save_png<P>(image: &DynamicImage, path: P) -> Result<()>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|err| match err {
            ImageError::IoError(err) => Error::io(path, err),
            err => Error::io(path, io::Error::other(err)),
        })
}
