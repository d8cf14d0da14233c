//! Per-tick signal extraction

pub mod hand_geometry;
pub mod motion;
pub mod presence;
pub mod vessel_cache;

pub use motion::MotionTracker;
pub use presence::{Presence, PresenceTracker, PresenceTransition};
pub use vessel_cache::{CachedVessel, VesselCacheInfo, VesselMemory};
