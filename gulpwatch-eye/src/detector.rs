//! Criteria aggregation and debouncing
//!
//! One call to [`step`] consumes the detection state and a perception frame
//! and returns the next state together with at most one [`GulpEvent`]. The
//! step is total: malformed or missing observations only ever reset or decay
//! the pending frame count.

use crate::error::EyeError;
use crate::processing::hand_geometry::{
    distance, held_vessel, is_drinking_orientation, is_holding_pose, palm_center,
};
use crate::processing::{MotionTracker, Presence, PresenceTracker, PresenceTransition, VesselMemory};
use crate::report::{DetectionPhase, TickReport};
use chrono::{DateTime, Utc};
use gulpwatch_core::{
    elapsed_seconds, DetectorConfig, FaceObservation, FrameTick, GeometryThresholds, HandObservation,
    Handedness, PerceptionFrame, Point, VesselClass, VesselObservation,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// A confirmed drinking action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GulpEvent {
    pub id: Uuid,
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub hand: Handedness,
    /// Vessel seen in the hand, or remembered near it
    pub vessel: Option<VesselClass>,
    /// Palm-to-mouth distance on the confirming tick
    pub distance: f32,
    pub criteria_met: u8,
}

/// Everything the detector carries from one tick to the next
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionState {
    consecutive_frames: u32,
    last_event_at: Option<DateTime<Utc>>,
    motion: MotionTracker,
    presence: PresenceTracker,
    vessel_cache: VesselMemory,
}

impl DetectionState {
    /// Fresh session; the user counts as present at `started_at`.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            consecutive_frames: 0,
            last_event_at: None,
            motion: MotionTracker::new(),
            presence: PresenceTracker::new(started_at),
            vessel_cache: VesselMemory::new(),
        }
    }

    pub fn consecutive_frames(&self) -> u32 {
        self.consecutive_frames
    }

    pub fn last_event_at(&self) -> Option<DateTime<Utc>> {
        self.last_event_at
    }

    pub fn motion(&self) -> &MotionTracker {
        &self.motion
    }

    pub fn presence(&self) -> Presence {
        self.presence.presence()
    }

    pub fn presence_tracker(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn vessel_cache(&self) -> &VesselMemory {
        &self.vessel_cache
    }

    /// Derived debouncer phase
    pub fn phase(&self, now: DateTime<Utc>, cooldown_seconds: f64) -> DetectionPhase {
        if self.cooldown_remaining(now, cooldown_seconds) > 0.0 {
            DetectionPhase::Cooldown
        } else if self.consecutive_frames == 0 {
            DetectionPhase::Idle
        } else {
            DetectionPhase::Accumulating
        }
    }

    fn cooldown_elapsed(&self, now: DateTime<Utc>, cooldown_seconds: f64) -> bool {
        match self.last_event_at {
            Some(last) => elapsed_seconds(last, now) >= cooldown_seconds,
            None => true,
        }
    }

    fn cooldown_remaining(&self, now: DateTime<Utc>, cooldown_seconds: f64) -> f64 {
        match self.last_event_at {
            Some(last) => (cooldown_seconds - elapsed_seconds(last, now)).max(0.0),
            None => 0.0,
        }
    }

    fn decay(&mut self) {
        self.consecutive_frames = self.consecutive_frames.saturating_sub(1);
    }

    fn reset(&mut self) {
        self.consecutive_frames = 0;
    }
}

/// Result of one [`step`]
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub state: DetectionState,
    pub event: Option<GulpEvent>,
    pub presence: PresenceTransition,
    pub report: TickReport,
}

/// Result of one [`GulpDetector::process`]
#[derive(Debug, Clone, PartialEq)]
pub struct TickDecision {
    pub event: Option<GulpEvent>,
    pub presence: PresenceTransition,
    pub report: TickReport,
}

/// Advance the detection state by one tick
pub fn step(
    config: &DetectorConfig,
    geometry: &GeometryThresholds,
    state: DetectionState,
    tick: FrameTick,
    frame: &PerceptionFrame,
) -> TickOutcome {
    let mut state = state;
    let decision = advance(config, geometry, &mut state, tick, frame);
    TickOutcome {
        state,
        event: decision.event,
        presence: decision.presence,
        report: decision.report,
    }
}

/// Signals of the hand closest to the mouth
struct Candidate<'a> {
    hand: &'a HandObservation,
    palm: Point,
    distance: f32,
    is_holding: bool,
    is_drinking_orientation: bool,
    held: Option<VesselObservation>,
    in_cache_region: bool,
}

fn select_candidate<'a>(
    config: &DetectorConfig,
    geometry: &GeometryThresholds,
    state: &mut DetectionState,
    hands: &[&'a HandObservation],
    face: &FaceObservation,
    vessels: &[VesselObservation],
    now: DateTime<Utc>,
) -> Option<Candidate<'a>> {
    let mouth = face.mouth_point(geometry.mouth_height_ratio);
    let mut best: Option<Candidate<'a>> = None;

    for &hand in hands {
        if !config.target_hand.accepts(hand.handedness) {
            continue;
        }

        let palm = palm_center(hand);
        let dist = distance(&palm, &mouth);

        let held = held_vessel(hand, vessels, geometry.hand_overlap_margin).copied();
        if let Some(vessel) = &held {
            state.vessel_cache.record(vessel, now);
        }
        let in_cache_region = state.vessel_cache.is_valid(now, config.bottle_cache_timeout_seconds)
            && state
                .vessel_cache
                .hand_in_region(&hand.bounding_box(), geometry.cache_region_margin);

        if best.as_ref().map_or(true, |b| dist < b.distance) {
            best = Some(Candidate {
                hand,
                palm,
                distance: dist,
                is_holding: is_holding_pose(hand, geometry),
                is_drinking_orientation: is_drinking_orientation(hand, mouth.y, geometry),
                held,
                in_cache_region,
            });
        }
    }

    best
}

fn advance(
    config: &DetectorConfig,
    geometry: &GeometryThresholds,
    state: &mut DetectionState,
    tick: FrameTick,
    frame: &PerceptionFrame,
) -> TickDecision {
    let now = tick.at;
    let mut report = TickReport::new(tick.seq, now, config);

    let face = frame.face.filter(FaceObservation::is_well_formed);
    let hands: Vec<&HandObservation> = frame.hands.iter().filter(|h| h.is_well_formed()).collect();

    report.hand_detected = !hands.is_empty();
    report.face_detected = face.is_some();
    report.vessel_detected = !frame.vessels.is_empty();

    let presence = state
        .presence
        .update(face.is_some(), now, config.away_timeout_seconds);
    if presence == PresenceTransition::BecameAway {
        state.motion.clear();
    }

    let event = evaluate(config, geometry, state, &hands, face.as_ref(), frame, tick, &mut report);

    report.is_away = state.presence.is_away();
    report.consecutive_frames = state.consecutive_frames;
    report.cooldown_remaining_seconds = state.cooldown_remaining(now, config.cooldown_seconds);
    report.vessel_cache = state.vessel_cache.info(now, config.bottle_cache_timeout_seconds);
    report.phase = state.phase(now, config.cooldown_seconds);
    report.gulp = event.is_some();

    debug!(
        seq = tick.seq,
        consecutive_frames = report.consecutive_frames,
        criteria_met = report.criteria_met,
        has_vessel = report.has_vessel,
        phase = ?report.phase,
        "Tick processed"
    );

    TickDecision { event, presence, report }
}

#[allow(clippy::too_many_arguments)]
fn evaluate(
    config: &DetectorConfig,
    geometry: &GeometryThresholds,
    state: &mut DetectionState,
    hands: &[&HandObservation],
    face: Option<&FaceObservation>,
    frame: &PerceptionFrame,
    tick: FrameTick,
    report: &mut TickReport,
) -> Option<GulpEvent> {
    let now = tick.at;

    if state.presence.is_away() {
        state.reset();
        return None;
    }

    let face = match face {
        Some(face) if !hands.is_empty() => face,
        _ => {
            state.reset();
            return None;
        }
    };

    let Some(candidate) = select_candidate(config, geometry, state, hands, face, &frame.vessels, now) else {
        state.reset();
        return None;
    };

    state.motion.push(candidate.palm);
    let upward_motion = state.motion.is_upward_trend();
    let is_close = candidate.distance < config.proximity_threshold;

    let vessel_held = candidate.held.is_some();
    let has_vessel = vessel_held || candidate.in_cache_region;

    report.distance = Some(candidate.distance);
    report.is_close = is_close;
    report.is_holding = candidate.is_holding;
    report.is_drinking_orientation = candidate.is_drinking_orientation;
    report.upward_motion = upward_motion;
    report.vessel_held = vessel_held;
    report.hand_in_cache_region = candidate.in_cache_region;
    report.has_vessel = has_vessel;

    if config.require_vessel && !has_vessel {
        state.decay();
        return None;
    }

    let criteria_met = [is_close, candidate.is_holding, candidate.is_drinking_orientation, upward_motion]
        .iter()
        .filter(|&&met| met)
        .count() as u8;
    report.criteria_met = criteria_met;

    if criteria_met < config.criteria_required() || !is_close {
        state.decay();
        return None;
    }

    state.consecutive_frames = (state.consecutive_frames + 1).min(config.confirm_threshold);
    if state.consecutive_frames < config.confirm_threshold
        || !state.cooldown_elapsed(now, config.cooldown_seconds)
    {
        return None;
    }

    state.consecutive_frames = 0;
    state.motion.clear();
    state.last_event_at = Some(now);

    let vessel = match candidate.held {
        Some(held) => Some(held.class),
        None if candidate.in_cache_region => state.vessel_cache.entry().map(|e| e.class),
        None => None,
    };

    let event = GulpEvent {
        id: Uuid::new_v4(),
        seq: tick.seq,
        at: now,
        hand: candidate.hand.handedness,
        vessel,
        distance: candidate.distance,
        criteria_met,
    };

    info!(
        seq = event.seq,
        hand = ?event.hand,
        vessel = ?event.vessel,
        distance = event.distance,
        criteria_met,
        "Gulp detected"
    );

    Some(event)
}

/// Owns the configuration and detection state of one session
#[derive(Debug, Clone)]
pub struct GulpDetector {
    config: DetectorConfig,
    geometry: GeometryThresholds,
    state: DetectionState,
}

impl GulpDetector {
    pub fn new(
        config: DetectorConfig,
        geometry: GeometryThresholds,
        started_at: DateTime<Utc>,
    ) -> Result<Self, EyeError> {
        config.validate().map_err(EyeError::Config)?;
        geometry.validate().map_err(EyeError::Config)?;

        Ok(Self {
            config,
            geometry,
            state: DetectionState::new(started_at),
        })
    }

    /// Process one perception frame
    pub fn process(&mut self, tick: FrameTick, frame: &PerceptionFrame) -> TickDecision {
        advance(&self.config, &self.geometry, &mut self.state, tick, frame)
    }

    /// Drop all pending state and start a new session at `at`
    pub fn reset(&mut self, at: DateTime<Utc>) {
        self.state = DetectionState::new(at);
    }

    pub fn state(&self) -> &DetectionState {
        &self.state
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn geometry(&self) -> &GeometryThresholds {
        &self.geometry
    }
}
