use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Axis-aligned face bounding box in `(top, right, bottom, left)` pixel order,
/// the order the face datasets store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaceBox {
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
    pub left: i64,
}

impl FaceBox {
    pub fn new(top: i64, right: i64, bottom: i64, left: i64) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Pixel area, integer-inclusive: a box from 0 to 0 covers one pixel.
    pub fn area(&self) -> i64 {
        let w = (self.right - self.left + 1).max(0);
        let h = (self.bottom - self.top + 1).max(0);
        w * h
    }

    /// Intersection-over-union with another box.
    pub fn iou(&self, other: &FaceBox) -> f64 {
        let inter = FaceBox {
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
            left: self.left.max(other.left),
        };
        if inter.right < inter.left || inter.bottom < inter.top {
            return 0.0;
        }
        let inter_area = inter.area() as f64;
        let union = (self.area() + other.area()) as f64 - inter_area;
        if union <= 0.0 {
            0.0
        } else {
            inter_area / union
        }
    }

    /// Rescale every edge by `factor`, rounding to the nearest pixel.
    pub fn scale(&self, factor: f64) -> FaceBox {
        FaceBox {
            top: (self.top as f64 * factor).round() as i64,
            right: (self.right as f64 * factor).round() as i64,
            bottom: (self.bottom as f64 * factor).round() as i64,
            left: (self.left as f64 * factor).round() as i64,
        }
    }

    pub fn width(&self) -> i64 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i64 {
        (self.bottom - self.top).max(0)
    }
}

/// serde `with`-module storing a `FaceBox` as its `"(t, r, b, l)"` text form,
/// the representation the JSON datasets and the comment blob use.
pub mod as_text {
    use super::FaceBox;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(b: &FaceBox, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&b.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<FaceBox, D::Error> {
        let raw = String::deserialize(de)?;
        raw.parse().map_err(de::Error::custom)
    }
}

impl fmt::Display for FaceBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.top, self.right, self.bottom, self.left
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFaceBoxError(pub String);

impl fmt::Display for ParseFaceBoxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid face box: {}", self.0)
    }
}

impl std::error::Error for ParseFaceBoxError {}

impl FromStr for FaceBox {
    type Err = ParseFaceBoxError;

    /// Parses `"(top, right, bottom, left)"`; whitespace is forgiven.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let parts: Vec<i64> = trimmed
            .split(',')
            .map(|p| p.trim().parse::<i64>())
            .collect::<Result<_, _>>()
            .map_err(|_| ParseFaceBoxError(s.to_string()))?;
        if parts.len() != 4 {
            return Err(ParseFaceBoxError(s.to_string()));
        }
        Ok(FaceBox::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_roundtrip() {
        let b = FaceBox::new(10, 100, 100, 10);
        let text = b.to_string();
        assert_eq!(text, "(10, 100, 100, 10)");
        assert_eq!(text.parse::<FaceBox>().unwrap(), b);
        assert_eq!("(1,2,3,4)".parse::<FaceBox>().unwrap(), FaceBox::new(1, 2, 3, 4));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("(1,2,3)".parse::<FaceBox>().is_err());
        assert!("10 100 100 10".parse::<FaceBox>().is_err());
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let b = FaceBox::new(10, 100, 100, 10);
        assert!((b.iou(&b) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = FaceBox::new(0, 10, 10, 0);
        let b = FaceBox::new(100, 110, 110, 100);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn nearly_coincident_boxes_exceed_dedup_threshold() {
        // The S5 pair: (10,100,100,10) vs (12,98,98,12).
        let a = FaceBox::new(10, 100, 100, 10);
        let b = FaceBox::new(12, 98, 98, 12);
        assert!(a.iou(&b) > 0.9);
    }

    #[test]
    fn scale_rounds_to_nearest_pixel() {
        let b = FaceBox::new(10, 100, 100, 10);
        let s = b.scale(0.5);
        assert_eq!(s, FaceBox::new(5, 50, 50, 5));
    }
}
