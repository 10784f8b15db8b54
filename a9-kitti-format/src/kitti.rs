use crate::PlanarBox;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Number of whitespace separated tokens in a KITTI label line.
pub const KITTI_LABEL_FIELDS: usize = 15;

/// Divisor that maps raw sensor intensity to the KITTI range.
pub const KITTI_INTENSITY_SCALE: f32 = 256.0;

/// Byte size of one point in a KITTI `.bin` scan.
pub const KITTI_POINT_SIZE: usize = 4 * std::mem::size_of::<f32>();

/// One object row of a KITTI label file.
///
/// The [Display] impl produces the on-disk line without the trailing
/// newline. Every float is written with two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KittiObject {
    pub category: String,
    pub truncated: f64,
    pub occluded: u8,
    pub alpha: f64,
    pub bbox: PlanarBox,
    pub height: f64,
    pub width: f64,
    pub length: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub heading: f64,
}

impl fmt::Display for KittiObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            ref category,
            truncated,
            occluded,
            alpha,
            bbox:
                PlanarBox {
                    left,
                    top,
                    right,
                    bottom,
                },
            height,
            width,
            length,
            x,
            y,
            z,
            heading,
        } = *self;

        write!(
            f,
            "{} {} {} {} {} {} {} {} {} {} {} {} {} {} {}",
            category,
            Fixed2(truncated),
            occluded,
            Fixed2(alpha),
            Fixed2(left),
            Fixed2(top),
            Fixed2(right),
            Fixed2(bottom),
            Fixed2(height),
            Fixed2(width),
            Fixed2(length),
            Fixed2(x),
            Fixed2(y),
            Fixed2(z),
            Fixed2(heading),
        )
    }
}

impl FromStr for KittiObject {
    type Err = ParseKittiError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != KITTI_LABEL_FIELDS {
            return Err(ParseKittiError::FieldCount(tokens.len()));
        }

        let float = |idx: usize| -> Result<f64, ParseKittiError> {
            tokens[idx]
                .parse()
                .map_err(|_| ParseKittiError::InvalidValue {
                    index: idx,
                    token: tokens[idx].to_string(),
                })
        };
        let occluded = tokens[2]
            .parse()
            .map_err(|_| ParseKittiError::InvalidValue {
                index: 2,
                token: tokens[2].to_string(),
            })?;

        Ok(Self {
            category: tokens[0].to_string(),
            truncated: float(1)?,
            occluded,
            alpha: float(3)?,
            bbox: PlanarBox {
                left: float(4)?,
                top: float(5)?,
                right: float(6)?,
                bottom: float(7)?,
            },
            height: float(8)?,
            width: float(9)?,
            length: float(10)?,
            x: float(11)?,
            y: float(12)?,
            z: float(13)?,
            heading: float(14)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseKittiError {
    FieldCount(usize),
    InvalidValue { index: usize, token: String },
}

impl fmt::Display for ParseKittiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount(count) => write!(
                f,
                "expect {KITTI_LABEL_FIELDS} fields in a KITTI label line, but get {count}"
            ),
            Self::InvalidValue { index, token } => {
                write!(f, "invalid value '{token}' at field {index}")
            }
        }
    }
}

impl std::error::Error for ParseKittiError {}

/// A point of a KITTI `.bin` scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
}

impl From<[f32; 4]> for BinPoint {
    fn from([x, y, z, intensity]: [f32; 4]) -> Self {
        Self { x, y, z, intensity }
    }
}

impl From<BinPoint> for [f32; 4] {
    fn from(point: BinPoint) -> Self {
        let BinPoint { x, y, z, intensity } = point;
        [x, y, z, intensity]
    }
}

/// Rounds the stored binary value to two decimals and never prints `-0.00`.
struct Fixed2(f64);

impl fmt::Display for Fixed2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = format!("{:.2}", self.0);
        match text.strip_prefix('-') {
            Some("0.00") => f.write_str("0.00"),
            _ => f.write_str(&text),
        }
    }
}
