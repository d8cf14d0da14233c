//! Observation model shared by perception adapters and the detection core.
//!
//! All coordinates are frame-normalized: `(0, 0)` is the top-left corner and
//! `(1, 1)` the bottom-right, so a smaller `y` is higher on screen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of landmarks in a hand skeleton.
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Landmark indices into [`HandObservation::landmarks`].
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_TIP: usize = 20;

    /// All five fingertips, thumb first.
    pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

    /// (knuckle, fingertip) pairs for the four non-thumb fingers.
    pub const FINGERS: [(usize, usize); 4] = [
        (INDEX_MCP, INDEX_TIP),
        (MIDDLE_MCP, MIDDLE_TIP),
        (RING_MCP, RING_TIP),
        (PINKY_MCP, PINKY_TIP),
    ];
}

/// Normalized 2D point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in normalized space
    pub fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Normalized axis-aligned box (origin is the top-left corner)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Smallest box containing every point. Returns `None` for an empty slice.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    /// Grow by `margin` on every side, clamped to the frame.
    pub fn expand(&self, margin: f32) -> Self {
        let min_x = (self.x - margin).max(0.0);
        let min_y = (self.y - margin).max(0.0);
        let max_x = (self.max_x() + margin).min(1.0);
        let max_y = (self.max_y() + margin).min(1.0);
        Self::new(min_x, min_y, (max_x - min_x).max(0.0), (max_y - min_y).max(0.0))
    }

    /// True when the intersection has positive extent on both axes.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        if !self.is_finite() || !other.is_finite() {
            return false;
        }
        let overlap_x = self.max_x().min(other.max_x()) - self.x.max(other.x);
        let overlap_y = self.max_y().min(other.max_y()) - self.y.max(other.y);
        overlap_x > 0.0 && overlap_y > 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

/// Handedness reported by the hand-landmark estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
    #[default]
    Unknown,
}

/// Which hands the detector should consider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandPreference {
    Left,
    Right,
    Both,
}

impl HandPreference {
    /// `Unknown` handedness carries no information to filter on, so it is accepted.
    pub fn accepts(&self, handedness: Handedness) -> bool {
        match (self, handedness) {
            (HandPreference::Both, _) => true,
            (_, Handedness::Unknown) => true,
            (HandPreference::Left, Handedness::Left) => true,
            (HandPreference::Right, Handedness::Right) => true,
            _ => false,
        }
    }
}

impl std::str::FromStr for HandPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(HandPreference::Left),
            "right" => Ok(HandPreference::Right),
            "both" => Ok(HandPreference::Both),
            other => Err(format!("Unknown hand preference '{}' (expected left, right or both)", other)),
        }
    }
}

/// Drinking vessel classes the detector recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VesselClass {
    Cup,
    Bottle,
    WineGlass,
}

impl VesselClass {
    /// Map an object-detector label to a vessel class.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "cup" => Some(VesselClass::Cup),
            "bottle" => Some(VesselClass::Bottle),
            "wine glass" | "wine_glass" | "wineglass" => Some(VesselClass::WineGlass),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VesselClass::Cup => "cup",
            VesselClass::Bottle => "bottle",
            VesselClass::WineGlass => "wine_glass",
        }
    }
}

impl std::fmt::Display for VesselClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One hand skeleton from the landmark estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandObservation {
    pub landmarks: Vec<Point>,
    #[serde(default)]
    pub handedness: Handedness,
    #[serde(default)]
    pub confidence: f32,
}

impl HandObservation {
    pub fn new(landmarks: Vec<Point>, handedness: Handedness, confidence: f32) -> Self {
        Self { landmarks, handedness, confidence }
    }

    /// Exactly 21 finite landmarks
    pub fn is_well_formed(&self) -> bool {
        self.landmarks.len() == HAND_LANDMARK_COUNT && self.landmarks.iter().all(Point::is_finite)
    }

    /// Landmark at `index`, or the origin when the skeleton is short
    pub fn landmark(&self, index: usize) -> Point {
        self.landmarks.get(index).copied().unwrap_or_default()
    }

    /// Box spanning all landmarks
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.landmarks).unwrap_or_default()
    }
}

/// Face region from the face detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    pub bbox: BoundingBox,
    #[serde(default)]
    pub confidence: f32,
}

impl FaceObservation {
    pub fn new(bbox: BoundingBox) -> Self {
        Self { bbox, confidence: 1.0 }
    }

    pub fn is_well_formed(&self) -> bool {
        self.bbox.is_finite() && self.bbox.width >= 0.0 && self.bbox.height >= 0.0
    }

    /// Approximate mouth position: horizontal center, `height_ratio` of the way down the box.
    pub fn mouth_point(&self, height_ratio: f32) -> Point {
        Point::new(
            self.bbox.x + self.bbox.width / 2.0,
            self.bbox.y + self.bbox.height * height_ratio,
        )
    }
}

/// Drinking vessel candidate from the object detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VesselObservation {
    pub class: VesselClass,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl VesselObservation {
    pub fn new(class: VesselClass, confidence: f32, bbox: BoundingBox) -> Self {
        Self { class, confidence, bbox }
    }

    /// Build from a raw detector result, discarding anything that is not a vessel.
    pub fn from_detection(label: &str, confidence: f32, bbox: BoundingBox) -> Option<Self> {
        let class = VesselClass::from_label(label)?;
        if !bbox.is_finite() {
            return None;
        }
        Some(Self::new(class, confidence, bbox))
    }
}

/// Everything the perception layer produced for one sampling tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerceptionFrame {
    #[serde(default)]
    pub hands: Vec<HandObservation>,
    #[serde(default)]
    pub face: Option<FaceObservation>,
    #[serde(default)]
    pub vessels: Vec<VesselObservation>,
    /// Capture time, when the adapter knows it (replays do)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
}

impl PerceptionFrame {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Sequence number and wall-clock time of one sampling tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameTick {
    pub seq: u64,
    pub at: DateTime<Utc>,
}

impl FrameTick {
    pub fn new(seq: u64, at: DateTime<Utc>) -> Self {
        Self { seq, at }
    }
}

/// Seconds from `earlier` to `later`; negative if the clock went backwards.
pub fn elapsed_seconds(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let delta = later - earlier;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(0.3, 0.4);
        assert!((a.distance(&b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_bbox_from_points() {
        let points = vec![Point::new(0.2, 0.5), Point::new(0.4, 0.1), Point::new(0.3, 0.3)];
        let bbox = BoundingBox::from_points(&points).unwrap();
        assert!((bbox.x - 0.2).abs() < 1e-6);
        assert!((bbox.y - 0.1).abs() < 1e-6);
        assert!((bbox.width - 0.2).abs() < 1e-6);
        assert!((bbox.height - 0.4).abs() < 1e-6);
        assert!(BoundingBox::from_points(&[]).is_none());
    }

    #[test]
    fn test_bbox_expand_clamps_to_frame() {
        let bbox = BoundingBox::new(0.02, 0.5, 0.1, 0.49);
        let grown = bbox.expand(0.05);
        assert_eq!(grown.x, 0.0);
        assert!((grown.max_y() - 1.0).abs() < 1e-6);
        assert!((grown.max_x() - 0.17).abs() < 1e-6);
    }

    #[test]
    fn test_bbox_overlap() {
        let a = BoundingBox::new(0.1, 0.1, 0.2, 0.2);
        let b = BoundingBox::new(0.25, 0.25, 0.2, 0.2);
        let c = BoundingBox::new(0.3, 0.1, 0.2, 0.2);
        assert!(a.overlaps(&b));
        // Touching edges do not count
        assert!(!a.overlaps(&c));
        let nan = BoundingBox::new(f32::NAN, 0.1, 0.2, 0.2);
        assert!(!a.overlaps(&nan));
    }

    #[test]
    fn test_hand_preference_accepts() {
        assert!(HandPreference::Both.accepts(Handedness::Left));
        assert!(HandPreference::Right.accepts(Handedness::Right));
        assert!(!HandPreference::Right.accepts(Handedness::Left));
        assert!(HandPreference::Left.accepts(Handedness::Unknown));
        assert_eq!("BOTH".parse::<HandPreference>().unwrap(), HandPreference::Both);
        assert!("neither".parse::<HandPreference>().is_err());
    }

    #[test]
    fn test_vessel_class_labels() {
        assert_eq!(VesselClass::from_label("Wine Glass"), Some(VesselClass::WineGlass));
        assert_eq!(VesselClass::from_label("bottle"), Some(VesselClass::Bottle));
        assert_eq!(VesselClass::from_label("person"), None);
        assert!(VesselObservation::from_detection("laptop", 0.9, BoundingBox::default()).is_none());
        let json = serde_json::to_string(&VesselClass::WineGlass).unwrap();
        assert_eq!(json, "\"wine_glass\"");
    }

    #[test]
    fn test_hand_well_formed() {
        let hand = HandObservation::new(vec![Point::new(0.5, 0.5); 21], Handedness::Right, 0.9);
        assert!(hand.is_well_formed());

        let short = HandObservation::new(vec![Point::new(0.5, 0.5); 20], Handedness::Right, 0.9);
        assert!(!short.is_well_formed());

        let mut nan = hand.clone();
        nan.landmarks[3].x = f32::NAN;
        assert!(!nan.is_well_formed());
    }

    #[test]
    fn test_short_hand_landmark_reads_origin() {
        let short = HandObservation::new(vec![Point::new(0.5, 0.5); 5], Handedness::Right, 0.9);
        assert_eq!(short.landmark(4), Point::new(0.5, 0.5));
        assert_eq!(short.landmark(20), Point::default());
    }

    #[test]
    fn test_mouth_point() {
        let face = FaceObservation::new(BoundingBox::new(0.4, 0.2, 0.2, 0.4));
        let mouth = face.mouth_point(0.75);
        assert!((mouth.x - 0.5).abs() < 1e-6);
        assert!((mouth.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_elapsed_seconds() {
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::milliseconds(2500);
        assert!((elapsed_seconds(t0, t1) - 2.5).abs() < 1e-9);
        assert!(elapsed_seconds(t1, t0) < 0.0);
    }

    #[test]
    fn test_frame_json_defaults() {
        let frame: PerceptionFrame = serde_json::from_str("{}").unwrap();
        assert!(frame.hands.is_empty());
        assert!(frame.face.is_none());
        assert!(frame.captured_at.is_none());
    }
}
