//! gulpwatch-core: observation model, configuration and errors shared by
//! the gulpwatch crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{DetectorConfig, GeometryThresholds, GulpwatchConfig, PipelineConfig, Sensitivity};
pub use error::{Error, Result};
pub use types::{
    elapsed_seconds, BoundingBox, FaceObservation, FrameTick, HandObservation, HandPreference,
    Handedness, PerceptionFrame, Point, VesselClass, VesselObservation, HAND_LANDMARK_COUNT,
};
