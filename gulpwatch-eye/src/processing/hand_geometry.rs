//! Stateless scoring of a single hand skeleton
//!
//! Scores are only meaningful for a well-formed hand (see
//! [`HandObservation::is_well_formed`]). Short skeletons read missing
//! landmarks as the origin.

use gulpwatch_core::types::landmarks::{FINGERS, FINGERTIPS, MIDDLE_MCP, WRIST};
use gulpwatch_core::{BoundingBox, GeometryThresholds, HandObservation, Point, VesselObservation};

/// Euclidean distance in normalized coordinates
pub fn distance(a: &Point, b: &Point) -> f32 {
    a.distance(b)
}

/// Midpoint of the wrist and the middle-finger knuckle
pub fn palm_center(hand: &HandObservation) -> Point {
    let wrist = hand.landmark(WRIST);
    let middle_mcp = hand.landmark(MIDDLE_MCP);
    Point::new((wrist.x + middle_mcp.x) / 2.0, (wrist.y + middle_mcp.y) / 2.0)
}

/// Mean position of the five fingertips
pub fn fingertip_centroid(hand: &HandObservation) -> Point {
    let (sum_x, sum_y) = FINGERTIPS.iter().fold((0.0f32, 0.0f32), |(sx, sy), &i| {
        let p = hand.landmark(i);
        (sx + p.x, sy + p.y)
    });
    let n = FINGERTIPS.len() as f32;
    Point::new(sum_x / n, sum_y / n)
}

/// Knuckle-to-wrist over fingertip-to-wrist distance; higher means more curled.
fn curl_ratio(tip: Point, knuckle: Point, wrist: Point, epsilon: f32) -> f32 {
    let knuckle_to_wrist = knuckle.distance(&wrist);
    if knuckle_to_wrist == 0.0 {
        return 0.0;
    }
    knuckle_to_wrist / (tip.distance(&wrist) + epsilon)
}

/// Average curl over the four non-thumb fingers
pub fn average_curl(hand: &HandObservation, epsilon: f32) -> f32 {
    let wrist = hand.landmark(WRIST);
    let total: f32 = FINGERS
        .iter()
        .map(|&(knuckle, tip)| curl_ratio(hand.landmark(tip), hand.landmark(knuckle), wrist, epsilon))
        .sum();
    total / FINGERS.len() as f32
}

/// Horizontal spread of the four non-thumb fingertips
pub fn fingertip_spread(hand: &HandObservation) -> f32 {
    let (min_x, max_x) = FINGERS.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &(_, tip)| {
        let x = hand.landmark(tip).x;
        (lo.min(x), hi.max(x))
    });
    max_x - min_x
}

/// Curled fingers clustered together, as when gripping a cup.
///
/// A single extended finger (nail biting, scratching) spreads the fingertips
/// and lowers the average curl.
pub fn is_holding_pose(hand: &HandObservation, thresholds: &GeometryThresholds) -> bool {
    average_curl(hand, thresholds.curl_epsilon) > thresholds.curl_threshold
        && fingertip_spread(hand) < thresholds.max_fingertip_spread
}

/// Hand tilted up (wrist at or below the fingertips) and approaching from
/// mouth level or below.
pub fn is_drinking_orientation(hand: &HandObservation, mouth_y: f32, thresholds: &GeometryThresholds) -> bool {
    let wrist = hand.landmark(WRIST);
    let tips = fingertip_centroid(hand);
    let wrist_below_fingers = wrist.y > tips.y - thresholds.wrist_tolerance;

    let palm = palm_center(hand);
    let at_or_below_mouth = palm.y >= mouth_y - thresholds.mouth_tolerance;

    wrist_below_fingers && at_or_below_mouth
}

/// Landmark box grown by `margin`, used for vessel overlap tests
pub fn grip_region(hand: &HandObservation, margin: f32) -> BoundingBox {
    hand.bounding_box().expand(margin)
}

/// First vessel, in detector order, overlapping the hand's grip region
pub fn held_vessel<'a>(
    hand: &HandObservation,
    vessels: &'a [VesselObservation],
    margin: f32,
) -> Option<&'a VesselObservation> {
    let region = grip_region(hand, margin);
    vessels.iter().find(|v| region.overlaps(&v.bbox))
}
