//! Configuration for gulpwatch
//!
//! Injected once at pipeline construction and read-only afterwards.

use crate::error::{Error, Result};
use crate::types::HandPreference;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sensitivity preset: how many of the four drinking criteria must hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    /// 2 of 4
    Easy,
    /// 3 of 4
    Medium,
    /// 4 of 4
    Strict,
}

impl Sensitivity {
    pub fn criteria_required(&self) -> u8 {
        match self {
            Sensitivity::Easy => 2,
            Sensitivity::Medium => 3,
            Sensitivity::Strict => 4,
        }
    }
}

impl std::str::FromStr for Sensitivity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Sensitivity::Easy),
            "medium" => Ok(Sensitivity::Medium),
            "strict" => Ok(Sensitivity::Strict),
            other => Err(format!("Unknown sensitivity '{}' (expected easy, medium or strict)", other)),
        }
    }
}

/// Drinking detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Maximum normalized palm-to-mouth distance that counts as "close"
    pub proximity_threshold: f32,
    /// Minimum spacing between two gulp events
    pub cooldown_seconds: f64,
    /// Consecutive qualifying frames needed to confirm a gulp
    pub confirm_threshold: u32,
    /// How many criteria must hold per frame
    pub sensitivity: Sensitivity,
    /// Require a held (or remembered) vessel
    pub require_vessel: bool,
    /// How long a vessel sighting is remembered after it disappears
    pub bottle_cache_timeout_seconds: f64,
    /// Seconds without a face before the user is considered away
    pub away_timeout_seconds: f64,
    /// Hands to track
    pub target_hand: HandPreference,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: 0.20,
            cooldown_seconds: 10.0,
            confirm_threshold: 1,
            sensitivity: Sensitivity::Medium,
            require_vessel: true,
            bottle_cache_timeout_seconds: 5.0,
            away_timeout_seconds: 5.0,
            target_hand: HandPreference::Right,
        }
    }
}

impl DetectorConfig {
    pub fn criteria_required(&self) -> u8 {
        self.sensitivity.criteria_required()
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.proximity_threshold > 0.0 && self.proximity_threshold < 1.0) {
            return Err("proximity_threshold must be between 0 and 1 (exclusive)".to_string());
        }

        if !self.cooldown_seconds.is_finite() || self.cooldown_seconds <= 0.0 {
            return Err("cooldown_seconds must be a positive number".to_string());
        }

        if self.confirm_threshold == 0 {
            return Err("confirm_threshold must be at least 1".to_string());
        }

        if !self.bottle_cache_timeout_seconds.is_finite() || self.bottle_cache_timeout_seconds < 0.0 {
            return Err("bottle_cache_timeout_seconds must be zero or positive".to_string());
        }

        if !self.away_timeout_seconds.is_finite() || self.away_timeout_seconds <= 0.0 {
            return Err("away_timeout_seconds must be a positive number".to_string());
        }

        Ok(())
    }
}

/// Empirically tuned geometry constants.
///
/// These have no documented derivation; they are kept as defaults and are
/// expected to be recalibrated against recorded sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryThresholds {
    /// Average knuckle/fingertip curl ratio above which fingers count as curled
    pub curl_threshold: f32,
    /// Maximum horizontal spread of the four non-thumb fingertips
    pub max_fingertip_spread: f32,
    /// Added to the fingertip-to-wrist distance to avoid dividing by zero
    pub curl_epsilon: f32,
    /// How far the wrist may sit above the fingertip centroid
    pub wrist_tolerance: f32,
    /// How far the palm may sit above the mouth
    pub mouth_tolerance: f32,
    /// Fraction of the face box height where the mouth is assumed to be
    pub mouth_height_ratio: f32,
    /// Margin added around the hand box when testing vessel overlap
    pub hand_overlap_margin: f32,
    /// Per-axis tolerance between hand and remembered vessel centers
    pub cache_region_margin: f32,
}

impl Default for GeometryThresholds {
    fn default() -> Self {
        Self {
            curl_threshold: 0.5,
            max_fingertip_spread: 0.15,
            curl_epsilon: 0.001,
            wrist_tolerance: 0.05,
            mouth_tolerance: 0.1,
            mouth_height_ratio: 0.75,
            hand_overlap_margin: 0.05,
            cache_region_margin: 0.25,
        }
    }
}

impl GeometryThresholds {
    pub fn validate(&self) -> std::result::Result<(), String> {
        let fields = [
            ("curl_threshold", self.curl_threshold),
            ("max_fingertip_spread", self.max_fingertip_spread),
            ("curl_epsilon", self.curl_epsilon),
            ("wrist_tolerance", self.wrist_tolerance),
            ("mouth_tolerance", self.mouth_tolerance),
            ("mouth_height_ratio", self.mouth_height_ratio),
            ("hand_overlap_margin", self.hand_overlap_margin),
            ("cache_region_margin", self.cache_region_margin),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a finite, non-negative number", name));
            }
        }

        if self.mouth_height_ratio > 1.0 {
            return Err("mouth_height_ratio must not exceed 1.0".to_string());
        }

        Ok(())
    }
}

/// Tick loop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Milliseconds between sampling ticks
    pub detection_interval_ms: u64,
    /// Upper bound on one perception sample
    pub sample_timeout_ms: u64,
    /// Capacity of the worker-to-consumer event channel
    pub event_buffer_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detection_interval_ms: 300,
            sample_timeout_ms: 1000,
            event_buffer_size: 64,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.detection_interval_ms == 0 || self.detection_interval_ms > 60_000 {
            return Err("detection_interval_ms must be between 1 and 60000".to_string());
        }

        if self.sample_timeout_ms == 0 || self.sample_timeout_ms > 60_000 {
            return Err("sample_timeout_ms must be between 1 and 60000".to_string());
        }

        if self.event_buffer_size == 0 || self.event_buffer_size > 100_000 {
            return Err("event_buffer_size must be between 1 and 100000".to_string());
        }

        Ok(())
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GulpwatchConfig {
    pub detector: DetectorConfig,
    pub geometry: GeometryThresholds,
    pub pipeline: PipelineConfig,
}

impl GulpwatchConfig {
    /// Load configuration from a JSON, TOML or YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
            .map_err(|e| Error::Configuration(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration; JSON is tried first, then TOML, then YAML
    pub fn from_str(content: &str) -> Result<Self> {
        if let Ok(config) = serde_json::from_str::<GulpwatchConfig>(content) {
            return Ok(config);
        }

        let toml_err = match toml::from_str::<GulpwatchConfig>(content) {
            Ok(config) => return Ok(config),
            Err(e) => e,
        };

        match serde_yaml::from_str::<GulpwatchConfig>(content) {
            Ok(config) => Ok(config),
            Err(_) => Err(Error::Deserialization(format!("Unrecognized configuration format: {}", toml_err))),
        }
    }

    /// Apply `GULPWATCH_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("GULPWATCH_PROXIMITY_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.detector.proximity_threshold = v;
        }
        if let Some(v) = lookup("GULPWATCH_COOLDOWN_SECONDS").and_then(|v| v.parse().ok()) {
            self.detector.cooldown_seconds = v;
        }
        if let Some(v) = lookup("GULPWATCH_CONFIRM_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.detector.confirm_threshold = v;
        }
        if let Some(v) = lookup("GULPWATCH_SENSITIVITY").and_then(|v| v.parse().ok()) {
            self.detector.sensitivity = v;
        }
        if let Some(v) = lookup("GULPWATCH_REQUIRE_VESSEL").and_then(|v| v.parse().ok()) {
            self.detector.require_vessel = v;
        }
        if let Some(v) = lookup("GULPWATCH_TARGET_HAND").and_then(|v| v.parse().ok()) {
            self.detector.target_hand = v;
        }
        if let Some(v) = lookup("GULPWATCH_DETECTION_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.pipeline.detection_interval_ms = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.detector.validate().map_err(Error::Configuration)?;
        self.geometry.validate().map_err(Error::Configuration)?;
        self.pipeline.validate().map_err(Error::Configuration)?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}
