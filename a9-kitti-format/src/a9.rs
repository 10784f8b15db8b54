use pcd_rs::{PcdDeserialize, PcdSerialize};
use serde::{Deserialize, Serialize};

/// Names of the PCD fields a KITTI scan is built from, in output column order.
pub const A9_POINT_FIELDS: [&str; 4] = ["x", "y", "z", "intensity"];

/// One A9 label file. Fields other than `labels` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A9LabelFile {
    pub labels: Vec<A9Label>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A9Label {
    pub id: String,
    pub category: String,
    pub box3d: A9Box3D,
}

/// A 3D box centered at its centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A9Box3D {
    pub location: Location,
    pub dimension: Dimension,
    pub orientation: Orientation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Orientation {
    pub rotation_yaw: f64,
}

impl A9Box3D {
    /// Axis-aligned footprint of the box on the x/y plane.
    pub fn planar_bbox(&self) -> PlanarBox {
        let Location { x, y, .. } = self.location;
        let Dimension { length, width, .. } = self.dimension;

        PlanarBox {
            left: x - length / 2.0,
            top: y - width / 2.0,
            right: x + length / 2.0,
            bottom: y + width / 2.0,
        }
    }

    /// Height of the bottom face center.
    pub fn bottom_center_z(&self) -> f64 {
        self.location.z - self.dimension.height / 2.0
    }
}

/// Axis-aligned rectangle in `left, top, right, bottom` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl PlanarBox {
    pub fn to_ltrb(&self) -> [f64; 4] {
        [self.left, self.top, self.right, self.bottom]
    }
}

/// A point with exactly the fields of an A9 LiDAR scan.
#[derive(Debug, Clone, Copy, PartialEq, PcdDeserialize, PcdSerialize)]
pub struct A9Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SAMPLE: &str = r#"{
        "labels": [{
            "id": "1",
            "category": "CAR",
            "box3d": {
                "location": {"x": 10, "y": 2, "z": 1},
                "dimension": {"length": 4, "width": 2, "height": 1.5},
                "orientation": {"rotationYaw": 0.5}
            },
            "attributes": {"occluded": "NOT_OCCLUDED"}
        }],
        "timestamp": 1646667310
    }"#;

    #[test]
    fn parse_label_file_ignores_unknown_fields() {
        let file: A9LabelFile = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(file.labels.len(), 1);

        let label = &file.labels[0];
        assert_eq!(label.id, "1");
        assert_eq!(label.category, "CAR");
        assert_eq!(label.box3d.orientation.rotation_yaw, 0.5);
    }

    #[test]
    fn missing_nested_field_is_rejected() {
        let text = r#"{"labels": [{"id": "1", "category": "CAR", "box3d": {
            "location": {"y": 2, "z": 1},
            "dimension": {"length": 4, "width": 2, "height": 1.5},
            "orientation": {"rotationYaw": 0.5}}}]}"#;
        assert!(serde_json::from_str::<A9LabelFile>(text).is_err());
    }

    #[test]
    fn planar_bbox_spans_length_and_width() {
        let file: A9LabelFile = serde_json::from_str(SAMPLE).unwrap();
        let box3d = &file.labels[0].box3d;

        let bbox = box3d.planar_bbox();
        assert_eq!(bbox.to_ltrb(), [8.0, 1.0, 12.0, 3.0]);
        assert_abs_diff_eq!(bbox.right - bbox.left, box3d.dimension.length);
        assert_abs_diff_eq!(bbox.bottom - bbox.top, box3d.dimension.width);
        assert_abs_diff_eq!(box3d.bottom_center_z(), 0.25);
    }
}
