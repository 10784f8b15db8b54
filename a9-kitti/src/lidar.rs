//! A9 `.pcd` scans to KITTI `[x, y, z, intensity]` points.

use crate::error::{Error, IoResultExt, Result};
use a9_kitti_format::{A9Point, A9_POINT_FIELDS, KITTI_INTENSITY_SCALE};
use itertools::izip;
use pcd_rs::{DynRecord, Field, PcdDeserialize, PcdMeta, Reader, ValueKind};
use std::{
    fs::{self, File},
    io::BufReader,
    path::Path,
};

// Each of the four required fields takes at least one byte in either encoding.
const MIN_POINT_BYTES: u64 = 4;

type PcdReader<T> = Reader<T, BufReader<File>>;

/// Reads a `.pcd` scan and packs it into KITTI points, one `[f32; 4]` per
/// point with intensity divided by 256.
///
/// Scans holding exactly `x y z intensity` as `f32` are read through
/// [A9Point]; any other schema goes through dynamic records.
pub fn reencode_point_cloud<P>(path: P) -> Result<Vec<[f32; 4]>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file_len = fs::metadata(path).with_path(path)?.len();
    let reader = open_reader::<DynRecord>(path)?;

    let num_points = usize::try_from(reader.meta().num_points)
        .map_err(|_| Error::malformed(path, "point count does not fit in memory"))?;
    // The header is untrusted, so never reserve more than the file can hold.
    let capacity = usize::try_from(file_len / MIN_POINT_BYTES)
        .unwrap_or(usize::MAX)
        .min(num_points);

    if is_a9_schema(reader.meta()) {
        drop(reader);
        let reader = open_reader::<A9Point>(path)?;
        read_a9_points(reader, num_points, capacity, path)
    } else {
        read_dyn_points(reader, num_points, capacity, path)
    }
}

fn open_reader<T>(path: &Path) -> Result<PcdReader<T>>
where
    T: PcdDeserialize,
{
    let file = File::open(path).with_path(path)?;
    Reader::from_reader(BufReader::new(file)).map_err(|err| Error::malformed(path, err))
}

fn is_a9_schema(meta: &PcdMeta) -> bool {
    meta.field_defs.len() == A9_POINT_FIELDS.len()
        && meta
            .field_defs
            .iter()
            .zip(A9_POINT_FIELDS)
            .all(|(field, name)| {
                field.name == name && field.kind == ValueKind::F32 && field.count == 1
            })
}

fn read_a9_points(
    reader: PcdReader<A9Point>,
    num_points: usize,
    capacity: usize,
    path: &Path,
) -> Result<Vec<[f32; 4]>> {
    let mut points = Vec::with_capacity(capacity);

    for record in reader.take(num_points) {
        let A9Point { x, y, z, intensity } = record.map_err(|err| Error::malformed(path, err))?;
        points.push([x, y, z, intensity / KITTI_INTENSITY_SCALE]);
    }

    Ok(points)
}

fn read_dyn_points(
    reader: PcdReader<DynRecord>,
    num_points: usize,
    capacity: usize,
    path: &Path,
) -> Result<Vec<[f32; 4]>> {
    let indices =
        required_field_indices(reader.meta()).map_err(|err| Error::malformed(path, err))?;
    let mut columns: [Vec<f32>; 4] = Default::default();
    columns.iter_mut().for_each(|column| column.reserve(capacity));

    for record in reader.take(num_points) {
        let DynRecord(fields) = record.map_err(|err| Error::malformed(path, err))?;

        for (column, &index, name) in izip!(&mut columns, &indices, A9_POINT_FIELDS) {
            let value = fields
                .get(index)
                .and_then(scalar_f32)
                .ok_or_else(|| Error::malformed(path, format!("unreadable '{name}' value")))?;
            column.push(value);
        }
    }

    let [xs, ys, zs, mut intensities] = columns;
    intensities
        .iter_mut()
        .for_each(|intensity| *intensity /= KITTI_INTENSITY_SCALE);

    interleave(&xs, &ys, &zs, &intensities).map_err(|err| Error::malformed(path, err))
}

/// Locates `x`, `y`, `z` and `intensity` in the PCD schema.
pub fn required_field_indices(meta: &PcdMeta) -> Result<[usize; 4], String> {
    let mut indices = [0; 4];

    for (slot, name) in indices.iter_mut().zip(A9_POINT_FIELDS) {
        let (index, field) = meta
            .field_defs
            .iter()
            .enumerate()
            .find(|(_, field)| field.name == name)
            .ok_or_else(|| format!("required field '{name}' is missing"))?;

        if field.count != 1 {
            return Err(format!(
                "field '{name}' must hold one value, but has count {}",
                field.count
            ));
        }
        *slot = index;
    }

    Ok(indices)
}

/// Interleaves four equally long columns point-major.
pub fn interleave(
    xs: &[f32],
    ys: &[f32],
    zs: &[f32],
    is: &[f32],
) -> Result<Vec<[f32; 4]>, String> {
    let len = xs.len();
    if ys.len() != len || zs.len() != len || is.len() != len {
        return Err(format!(
            "column lengths disagree: x={}, y={}, z={}, intensity={}",
            xs.len(),
            ys.len(),
            zs.len(),
            is.len()
        ));
    }

    let points = izip!(xs, ys, zs, is)
        .map(|(&x, &y, &z, &i)| [x, y, z, i])
        .collect();
    Ok(points)
}

fn scalar_f32(field: &Field) -> Option<f32> {
    let value = match field {
        Field::I8(values) => *values.first()? as f32,
        Field::I16(values) => *values.first()? as f32,
        Field::I32(values) => *values.first()? as f32,
        Field::U8(values) => *values.first()? as f32,
        Field::U16(values) => *values.first()? as f32,
        Field::U32(values) => *values.first()? as f32,
        Field::F32(values) => *values.first()?,
        Field::F64(values) => *values.first()? as f32,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii_pcd(types: &str, points: &str, rows: &[&str]) -> String {
        let sizes = if types == "F F F U" { "4 4 4 2" } else { "4 4 4 4" };
        format!(
            "# .PCD v0.7 - Point Cloud Data file format\n\
             VERSION 0.7\n\
             FIELDS x y z intensity\n\
             SIZE {sizes}\n\
             TYPE {types}\n\
             COUNT 1 1 1 1\n\
             WIDTH {points}\n\
             HEIGHT 1\n\
             VIEWPOINT 0 0 0 1 0 0 0\n\
             POINTS {points}\n\
             DATA ascii\n\
             {}\n",
            rows.join("\n")
        )
    }

    #[test]
    fn a9_schema_is_read_typed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pcd");
        fs::write(&path, ascii_pcd("F F F F", "2", &["1 2 3 256", "-1 0.5 0 512"])).unwrap();

        let reader = open_reader::<DynRecord>(&path).unwrap();
        assert!(is_a9_schema(reader.meta()));
        assert_eq!(
            reencode_point_cloud(&path).unwrap(),
            vec![[1.0, 2.0, 3.0, 1.0], [-1.0, 0.5, 0.0, 2.0]]
        );
    }

    #[test]
    fn other_schema_is_read_dynamically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pcd");
        fs::write(&path, ascii_pcd("F F F U", "1", &["1 2 3 128"])).unwrap();

        let reader = open_reader::<DynRecord>(&path).unwrap();
        assert!(!is_a9_schema(reader.meta()));
        assert_eq!(reencode_point_cloud(&path).unwrap(), vec![[1.0, 2.0, 3.0, 0.5]]);
    }

    #[test]
    fn inflated_point_count_is_malformed() {
        let dir = tempfile::tempdir().unwrap();

        for types in ["F F F F", "F F F U"] {
            let path = dir.path().join("inflated.pcd");
            fs::write(&path, ascii_pcd(types, "4000000000000", &["1 2 3 256"])).unwrap();
            assert!(matches!(
                reencode_point_cloud(&path),
                Err(Error::MalformedInput { .. })
            ));
        }
    }

    #[test]
    fn empty_scan_has_no_points() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pcd");
        fs::write(&path, ascii_pcd("F F F F", "0", &[])).unwrap();
        assert!(reencode_point_cloud(&path).unwrap().is_empty());
    }

    #[test]
    fn interleave_is_point_major() {
        let points = interleave(&[0.0, 1.0], &[0.0, 1.0], &[0.0, 1.0], &[2.0, 1.0]).unwrap();
        assert_eq!(points, vec![[0.0, 0.0, 0.0, 2.0], [1.0, 1.0, 1.0, 1.0]]);
        assert_eq!(
            points.as_flattened(),
            &[0.0, 0.0, 0.0, 2.0, 1.0, 1.0, 1.0, 1.0]
        );
    }

    #[test]
    fn interleave_rejects_ragged_columns() {
        let err = interleave(&[0.0, 1.0], &[0.0], &[0.0, 1.0], &[0.0, 1.0]).unwrap_err();
        assert!(err.contains("y=1"));
    }

    #[test]
    fn scalar_casts_every_kind() {
        assert_eq!(scalar_f32(&Field::U16(vec![512])), Some(512.0));
        assert_eq!(scalar_f32(&Field::I8(vec![-3])), Some(-3.0));
        assert_eq!(scalar_f32(&Field::F64(vec![0.5])), Some(0.5));
        assert_eq!(scalar_f32(&Field::F32(vec![])), None);
    }
}
