use crate::opts::Dump;
use a9_kitti::{
    io::{load_bin_iter, read_label_lines},
    utils::guess_file_format,
    FileFormat,
};
use a9_kitti_format::BinPoint;
use eyre::{eyre, Result};
use std::path::Path;

pub fn dump(args: Dump) -> Result<()> {
    let Dump { input, format } = args;

    let format = match format {
        Some(format) => format,
        None => guess_file_format(&input)
            .ok_or_else(|| eyre!("unable to guess file format of '{}'", input.display()))?,
    };

    use FileFormat as F;
    match format {
        F::Pcd => dump_pcd(&input)?,
        F::KittiBin => dump_kitti_bin(&input)?,
        F::KittiLabel => dump_kitti_label(&input)?,
    }

    Ok(())
}

fn dump_pcd<P>(path: P) -> Result<()>
where
    P: AsRef<Path>,
{
    let reader = pcd_rs::DynReader::open(path)?;

    for record in reader {
        let record = record?;
        println!("{record:?}");
    }

    Ok(())
}

fn dump_kitti_bin<P>(path: P) -> Result<()>
where
    P: AsRef<Path>,
{
    for point in load_bin_iter(path)? {
        let BinPoint { x, y, z, intensity } = point?;
        println!("{x} {y} {z} {intensity}");
    }

    Ok(())
}

fn dump_kitti_label<P>(path: P) -> Result<()>
where
    P: AsRef<Path>,
{
    for object in read_label_lines(path)? {
        println!("{object}");
    }

    Ok(())
}
