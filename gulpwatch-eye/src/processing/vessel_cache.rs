//! Short-lived memory of the last held drinking vessel
//!
//! Object detectors routinely lose a bottle once it is tilted towards the
//! mouth. The cache keeps the last confident sighting for a grace window so
//! an in-progress gulp can still be confirmed.

use chrono::{DateTime, Utc};
use gulpwatch_core::{elapsed_seconds, BoundingBox, VesselClass, VesselObservation};
use serde::{Deserialize, Serialize};

/// A remembered vessel sighting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedVessel {
    pub class: VesselClass,
    pub bbox: BoundingBox,
    pub cached_at: DateTime<Utc>,
}

/// Cache contents as exposed in tick reports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VesselCacheInfo {
    pub class: VesselClass,
    pub remaining_seconds: f64,
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VesselMemory {
    entry: Option<CachedVessel>,
}

impl VesselMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `vessel`, replacing whatever was cached.
    pub fn record(&mut self, vessel: &VesselObservation, now: DateTime<Utc>) {
        self.entry = Some(CachedVessel {
            class: vessel.class,
            bbox: vessel.bbox,
            cached_at: now,
        });
    }

    /// Validity is recomputed on every call; nothing is expired eagerly.
    pub fn is_valid(&self, now: DateTime<Utc>, ttl_seconds: f64) -> bool {
        match &self.entry {
            Some(entry) => elapsed_seconds(entry.cached_at, now) < ttl_seconds,
            None => false,
        }
    }

    /// True when the hand box center lies within `margin` of the cached
    /// vessel center on both axes. Does not check validity.
    pub fn hand_in_region(&self, hand_bbox: &BoundingBox, margin: f32) -> bool {
        let Some(entry) = &self.entry else {
            return false;
        };
        let hand = hand_bbox.center();
        let vessel = entry.bbox.center();
        (hand.x - vessel.x).abs() < margin && (hand.y - vessel.y).abs() < margin
    }

    pub fn entry(&self) -> Option<&CachedVessel> {
        self.entry.as_ref()
    }

    /// Cache contents while still valid
    pub fn info(&self, now: DateTime<Utc>, ttl_seconds: f64) -> Option<VesselCacheInfo> {
        if !self.is_valid(now, ttl_seconds) {
            return None;
        }
        self.entry.map(|entry| VesselCacheInfo {
            class: entry.class,
            remaining_seconds: ttl_seconds - elapsed_seconds(entry.cached_at, now),
            bbox: entry.bbox,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn bottle_at(x: f32, y: f32) -> VesselObservation {
        VesselObservation::new(VesselClass::Bottle, 0.8, BoundingBox::new(x, y, 0.1, 0.2))
    }

    #[test]
    fn test_empty_cache_is_invalid() {
        let cache = VesselMemory::new();
        assert!(!cache.is_valid(Utc::now(), 5.0));
        assert!(!cache.hand_in_region(&BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0.25));
        assert!(cache.info(Utc::now(), 5.0).is_none());
    }

    #[test]
    fn test_validity_window() {
        let t0 = Utc::now();
        let mut cache = VesselMemory::new();
        cache.record(&bottle_at(0.4, 0.6), t0);

        assert!(cache.is_valid(t0, 5.0));
        assert!(cache.is_valid(t0 + Duration::milliseconds(4999), 5.0));
        assert!(!cache.is_valid(t0 + Duration::seconds(5), 5.0));
        // Zero TTL never validates
        assert!(!cache.is_valid(t0, 0.0));
    }

    #[test]
    fn test_record_overwrites() {
        let t0 = Utc::now();
        let mut cache = VesselMemory::new();
        cache.record(&bottle_at(0.1, 0.1), t0);
        let cup = VesselObservation::new(VesselClass::Cup, 0.6, BoundingBox::new(0.7, 0.7, 0.1, 0.1));
        cache.record(&cup, t0 + Duration::seconds(2));

        let entry = cache.entry().unwrap();
        assert_eq!(entry.class, VesselClass::Cup);
        assert_eq!(entry.cached_at, t0 + Duration::seconds(2));
    }

    #[test]
    fn test_hand_in_region_margin() {
        let mut cache = VesselMemory::new();
        // Vessel center at (0.45, 0.7)
        cache.record(&bottle_at(0.4, 0.6), Utc::now());

        // Hand center 0.2 above the vessel, still inside the margin
        let raised = BoundingBox::new(0.4, 0.45, 0.1, 0.1);
        assert!(cache.hand_in_region(&raised, 0.25));

        // Hand center 0.3 to the right
        let aside = BoundingBox::new(0.7, 0.65, 0.1, 0.1);
        assert!(!cache.hand_in_region(&aside, 0.25));
    }

    #[test]
    fn test_info_remaining() {
        let t0 = Utc::now();
        let mut cache = VesselMemory::new();
        cache.record(&bottle_at(0.4, 0.6), t0);

        let info = cache.info(t0 + Duration::seconds(2), 5.0).unwrap();
        assert_eq!(info.class, VesselClass::Bottle);
        assert!((info.remaining_seconds - 3.0).abs() < 1e-6);
    }
}
