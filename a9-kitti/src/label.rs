//! A9 JSON labels to KITTI label lines.

use crate::error::{Error, IoResultExt, Result};
use a9_kitti_format::{A9Label, A9LabelFile, KittiObject, PlanarBox};
use log::debug;
use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::BufReader,
    path::Path,
};

// Values not available in A9 labels.
const TRUNCATED: f64 = 0.0;
const OCCLUDED: u8 = 0;
const ALPHA: f64 = -10.0;

/// Allow-list of source categories. An empty filter keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryFilter(HashSet<String>);

impl CategoryFilter {
    pub fn keeps(&self, category: &str) -> bool {
        self.0.is_empty() || self.0.contains(category)
    }
}

impl<S: Into<String>> FromIterator<S> for CategoryFilter {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Renames source categories. Categories without an entry pass through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap(HashMap<String, String>);

impl CategoryMap {
    pub fn rename<'a>(&'a self, category: &'a str) -> &'a str {
        self.0.get(category).map(String::as_str).unwrap_or(category)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for CategoryMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(from, to)| (from.into(), to.into()))
                .collect(),
        )
    }
}

pub fn read_label_file<P>(path: P) -> Result<A9LabelFile>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path).with_path(path)?);

    serde_json::from_reader(reader).map_err(|err| {
        if err.is_io() {
            Error::io(path, err.into())
        } else {
            Error::malformed(path, err)
        }
    })
}

/// Everything derived from one label file.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodedLabels {
    /// Kept labels in file order.
    pub objects: Vec<KittiObject>,
    /// Planar boxes of every label, filtered or not, keyed by label id.
    pub boxes: HashMap<String, PlanarBox>,
}

/// Reads one A9 label file and converts every kept label, in file order.
pub fn transcode_labels<P>(
    path: P,
    filter: &CategoryFilter,
    map: &CategoryMap,
) -> Result<TranscodedLabels>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = read_label_file(path)?;
    let objects = transcode(&file, filter, map);
    let boxes = box_map(&file);
    debug!(
        "{}: kept {} of {} labels",
        path.display(),
        objects.len(),
        file.labels.len()
    );
    Ok(TranscodedLabels { objects, boxes })
}

pub fn transcode(
    file: &A9LabelFile,
    filter: &CategoryFilter,
    map: &CategoryMap,
) -> Vec<KittiObject> {
    file.labels
        .iter()
        .filter(|label| filter.keeps(&label.category))
        .map(|label| to_kitti_object(label, map.rename(&label.category)))
        .collect()
}

pub fn to_kitti_object(label: &A9Label, category: &str) -> KittiObject {
    let box3d = &label.box3d;

    KittiObject {
        category: category.to_string(),
        truncated: TRUNCATED,
        occluded: OCCLUDED,
        alpha: ALPHA,
        bbox: box3d.planar_bbox(),
        height: box3d.dimension.height,
        width: box3d.dimension.width,
        length: box3d.dimension.length,
        x: box3d.location.x,
        y: box3d.location.y,
        z: box3d.bottom_center_z(),
        heading: box3d.orientation.rotation_yaw,
    }
}

/// Planar boxes of all labels keyed by label id, for correlating labels
/// across sensors.
pub fn box_map(file: &A9LabelFile) -> HashMap<String, PlanarBox> {
    file.labels
        .iter()
        .map(|label| (label.id.clone(), label.box3d.planar_bbox()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::fs;

    const SCENARIO: &str = r#"{"labels":[{"id":"1","category":"CAR","box3d":{"location":{"x":10,"y":2,"z":1},"dimension":{"length":4,"width":2,"height":1.5},"orientation":{"rotationYaw":0.5}}}]}"#;

    fn label(id: &str, category: &str, x: f64) -> String {
        format!(
            r#"{{"id":"{id}","category":"{category}","box3d":{{"location":{{"x":{x},"y":-3.3,"z":0.8}},"dimension":{{"length":0.6,"width":0.7,"height":1.8}},"orientation":{{"rotationYaw":-1.2}}}}}}"#
        )
    }

    fn mixed_file() -> A9LabelFile {
        let text = format!(
            r#"{{"labels":[{},{},{},{}]}}"#,
            label("a", "CAR", 1.0),
            label("b", "PEDESTRIAN", 2.0),
            label("c", "TRUCK", 3.0),
            label("d", "PEDESTRIAN", 4.0),
        );
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn scenario_line() {
        let file: A9LabelFile = serde_json::from_str(SCENARIO).unwrap();
        let objects = transcode(&file, &CategoryFilter::default(), &CategoryMap::default());
        assert_eq!(objects.len(), 1);
        assert_eq!(
            objects[0].to_string(),
            "CAR 0.00 0 -10.00 8.00 1.00 12.00 3.00 1.50 2.00 4.00 10.00 2.00 0.25 0.50"
        );
    }

    #[test]
    fn derived_fields_follow_the_box() {
        let file = mixed_file();
        let objects = transcode(&file, &CategoryFilter::default(), &CategoryMap::default());

        for (object, label) in objects.iter().zip(&file.labels) {
            let dim = label.box3d.dimension;
            assert_abs_diff_eq!(object.z, label.box3d.location.z - dim.height / 2.0);
            assert_abs_diff_eq!(object.bbox.right - object.bbox.left, dim.length, epsilon = 1e-9);
            assert_abs_diff_eq!(object.bbox.bottom - object.bbox.top, dim.width, epsilon = 1e-9);

            let parsed: KittiObject = object.to_string().parse().unwrap();
            assert_abs_diff_eq!(parsed.z, object.z, epsilon = 0.005);
            assert_abs_diff_eq!(
                parsed.bbox.right - parsed.bbox.left,
                dim.length,
                epsilon = 0.0101
            );
        }
    }

    #[test]
    fn filter_drops_only_excluded_categories() {
        let file = mixed_file();
        let all = transcode(&file, &CategoryFilter::default(), &CategoryMap::default());
        let filter: CategoryFilter = ["CAR", "TRUCK"].into_iter().collect();
        let kept = transcode(&file, &filter, &CategoryMap::default());

        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|object| object.category != "PEDESTRIAN"));
        assert_eq!(kept[0], all[0]);
        assert_eq!(kept[1], all[2]);
    }

    #[test]
    fn map_renames_after_filtering() {
        let file = mixed_file();
        let filter: CategoryFilter = ["CAR", "PEDESTRIAN"].into_iter().collect();
        let map: CategoryMap = [("CAR", "Car"), ("PEDESTRIAN", "Pedestrian")]
            .into_iter()
            .collect();
        let categories: Vec<_> = transcode(&file, &filter, &map)
            .into_iter()
            .map(|object| object.category)
            .collect();
        assert_eq!(categories, ["Car", "Pedestrian", "Pedestrian"]);
    }

    #[test]
    fn empty_labels_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        fs::write(&path, r#"{"labels": []}"#).unwrap();

        let labels =
            transcode_labels(&path, &CategoryFilter::default(), &CategoryMap::default()).unwrap();
        assert!(labels.objects.is_empty());
        assert!(labels.boxes.is_empty());
    }

    #[test]
    fn error_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let filter = CategoryFilter::default();
        let map = CategoryMap::default();

        let missing = dir.path().join("missing.json");
        assert!(matches!(
            transcode_labels(&missing, &filter, &map),
            Err(Error::Io { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{\"labels\": [").unwrap();
        assert!(matches!(
            transcode_labels(&broken, &filter, &map),
            Err(Error::MalformedInput { .. })
        ));

        let no_height = dir.path().join("no_height.json");
        fs::write(&no_height, SCENARIO.replace(",\"height\":1.5", "")).unwrap();
        assert!(matches!(
            transcode_labels(&no_height, &filter, &map),
            Err(Error::MalformedInput { .. })
        ));
    }

    #[test]
    fn box_map_covers_filtered_labels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.json");
        fs::write(&path, serde_json::to_string(&mixed_file()).unwrap()).unwrap();

        let filter: CategoryFilter = ["CAR"].into_iter().collect();
        let labels = transcode_labels(&path, &filter, &CategoryMap::default()).unwrap();
        assert_eq!(labels.objects.len(), 1);
        assert_eq!(labels.boxes.len(), 4);
        assert_eq!(labels.boxes["a"], labels.objects[0].bbox);
        assert_abs_diff_eq!(labels.boxes["c"].left, 2.7, epsilon = 1e-9);
        assert_abs_diff_eq!(labels.boxes["c"].bottom, -2.95, epsilon = 1e-9);
    }
}
