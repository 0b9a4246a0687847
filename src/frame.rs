//! Per-frame detector output.
//!
//! A [`FrameObservation`] is what the vision collaborators (face landmark
//! detector, object detector, camera capture) hand the domain for one
//! camera frame. Everything downstream works on these plain values.

use serde::{Deserialize, Serialize};

/// A point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned bounding box in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl BoundingBox {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Integer centre, matching how the detector reports box centres.
    pub fn center(&self) -> Point {
        let cx = (i64::from(self.left) + i64::from(self.right)) >> 1;
        let cy = (i64::from(self.top) + i64::from(self.bottom)) >> 1;
        Point::new(cx as f32, cy as f32)
    }
}

/// One detected face.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceObservation {
    /// Bottom-of-mouth landmark, when the detector located it.
    #[serde(default)]
    pub mouth_bottom: Option<Point>,
    /// Head pitch in degrees. Looking up is positive.
    #[serde(default)]
    pub head_euler_x: f32,
}

/// One detected object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectedObject {
    pub bounding_box: BoundingBox,
    /// Highest-confidence classification label, if the detector assigned one.
    #[serde(default)]
    pub label: Option<String>,
}

impl DetectedObject {
    /// Label text, or `"Unknown"` for unclassified objects.
    pub fn label_or_unknown(&self) -> &str {
        self.label.as_deref().unwrap_or("Unknown")
    }
}

/// Encoded still image of a frame, used for the remote confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl FrameImage {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            bytes,
        }
    }
}

/// Everything the detectors reported for one camera frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameObservation {
    /// Capture time in milliseconds (monotonic within a session).
    pub timestamp_ms: u64,
    pub faces: Vec<FaceObservation>,
    pub objects: Vec<DetectedObject>,
    /// Still image of the frame, when capture succeeded.
    pub image: Option<FrameImage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_center_uses_integer_midpoint() {
        let b = BoundingBox::new(10, 20, 31, 41);
        assert_eq!(b.center(), Point::new(20.0, 30.0));
    }

    #[test]
    fn box_center_handles_extreme_coordinates() {
        let b = BoundingBox::new(2_000_000_000, i32::MIN, 2_000_000_000, i32::MAX);
        let c = b.center();
        assert_eq!(c.x, 2_000_000_000.0);
        assert_eq!(c.y, -1.0);
    }

    #[test]
    fn distance_is_euclidean() {
        let d = Point::new(0.0, 0.0).distance_to(Point::new(3.0, 4.0));
        assert!((d - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn unlabelled_object_reports_unknown() {
        let o = DetectedObject::default();
        assert_eq!(o.label_or_unknown(), "Unknown");
    }
}
