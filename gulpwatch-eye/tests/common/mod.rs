#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use gulpwatch_core::types::landmarks::*;
use gulpwatch_core::{
    BoundingBox, FaceObservation, FrameTick, HandObservation, Handedness, PerceptionFrame, Point,
    VesselClass, VesselObservation,
};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn tick(t0: DateTime<Utc>, seq: u64, ms: i64) -> FrameTick {
    FrameTick::new(seq, t0 + Duration::milliseconds(ms))
}

/// Gripping, upright hand with its palm center at `(palm_x, palm_y)`.
///
/// Landmarks span 0.12 horizontally and 0.10 vertically around the palm.
pub fn hand_at(palm_x: f32, palm_y: f32, handedness: Handedness) -> HandObservation {
    let mut points = vec![Point::new(0.47, 0.57); 21];
    points[WRIST] = Point::new(0.50, 0.60);
    points[INDEX_MCP] = Point::new(0.47, 0.50);
    points[MIDDLE_MCP] = Point::new(0.50, 0.50);
    points[RING_MCP] = Point::new(0.53, 0.50);
    points[PINKY_MCP] = Point::new(0.56, 0.51);
    points[THUMB_TIP] = Point::new(0.44, 0.55);
    points[INDEX_TIP] = Point::new(0.48, 0.55);
    points[MIDDLE_TIP] = Point::new(0.50, 0.55);
    points[RING_TIP] = Point::new(0.52, 0.55);
    points[PINKY_TIP] = Point::new(0.54, 0.56);
    for (mcp, tip) in FINGERS {
        for j in mcp + 1..tip {
            points[j] = Point::new(
                (points[mcp].x + points[tip].x) / 2.0,
                (points[mcp].y + points[tip].y) / 2.0,
            );
        }
    }

    let (dx, dy) = (palm_x - 0.50, palm_y - 0.55);
    for p in points.iter_mut() {
        p.x += dx;
        p.y += dy;
    }
    HandObservation::new(points, handedness, 0.9)
}

/// Right hand right under the mouth
pub fn drinking_hand() -> HandObservation {
    hand_at(0.50, 0.55, Handedness::Right)
}

/// Face whose mouth point is (0.5, 0.5)
pub fn face() -> FaceObservation {
    FaceObservation::new(BoundingBox::new(0.4, 0.2, 0.2, 0.4))
}

/// Bottle overlapping a hand whose palm is at (0.5, 0.55)
pub fn bottle_in_hand() -> VesselObservation {
    VesselObservation::new(VesselClass::Bottle, 0.8, BoundingBox::new(0.45, 0.50, 0.10, 0.20))
}

pub fn frame(hands: Vec<HandObservation>, with_face: bool, vessels: Vec<VesselObservation>) -> PerceptionFrame {
    PerceptionFrame {
        hands,
        face: with_face.then(face),
        vessels,
        captured_at: None,
    }
}

pub fn drinking_frame() -> PerceptionFrame {
    frame(vec![drinking_hand()], true, vec![])
}
