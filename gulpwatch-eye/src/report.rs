//! Per-tick diagnostics

use crate::processing::VesselCacheInfo;
use chrono::{DateTime, Utc};
use gulpwatch_core::DetectorConfig;
use serde::{Deserialize, Serialize};

/// Debouncer phase, derived from the detection state after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionPhase {
    /// No qualifying frames pending
    Idle,
    /// Qualifying frames pending confirmation
    Accumulating,
    /// An event fired recently and re-firing is blocked
    Cooldown,
}

/// Every signal the detector looked at for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub hand_detected: bool,
    pub face_detected: bool,
    pub vessel_detected: bool,
    pub vessel_held: bool,
    pub hand_in_cache_region: bool,
    pub has_vessel: bool,
    /// Palm-to-mouth distance of the selected hand
    pub distance: Option<f32>,
    pub is_close: bool,
    pub is_holding: bool,
    pub is_drinking_orientation: bool,
    pub upward_motion: bool,
    pub criteria_met: u8,
    pub criteria_required: u8,
    pub consecutive_frames: u32,
    pub cooldown_remaining_seconds: f64,
    pub is_away: bool,
    pub require_vessel: bool,
    pub vessel_cache: Option<VesselCacheInfo>,
    pub phase: DetectionPhase,
    pub gulp: bool,
}

impl TickReport {
    /// Blank report for a tick; all signals start out false
    pub fn new(seq: u64, at: DateTime<Utc>, config: &DetectorConfig) -> Self {
        Self {
            seq,
            at,
            hand_detected: false,
            face_detected: false,
            vessel_detected: false,
            vessel_held: false,
            hand_in_cache_region: false,
            has_vessel: false,
            distance: None,
            is_close: false,
            is_holding: false,
            is_drinking_orientation: false,
            upward_motion: false,
            criteria_met: 0,
            criteria_required: config.criteria_required(),
            consecutive_frames: 0,
            cooldown_remaining_seconds: 0.0,
            is_away: false,
            require_vessel: config.require_vessel,
            vessel_cache: None,
            phase: DetectionPhase::Idle,
            gulp: false,
        }
    }
}
