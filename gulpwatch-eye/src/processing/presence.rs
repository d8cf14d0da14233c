//! User presence tracking from face-observation recency

use chrono::{DateTime, Utc};
use gulpwatch_core::elapsed_seconds;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Whether someone is in front of the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Present,
    Away,
}

/// Result of one presence update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceTransition {
    None,
    BecamePresent,
    BecameAway,
}

/// Present/Away state with a timeout-based hysteresis
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceTracker {
    presence: Presence,
    last_face_seen: DateTime<Utc>,
}

impl PresenceTracker {
    /// Starts `Present`, as if a face had just been seen at `started_at`.
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            presence: Presence::Present,
            last_face_seen: started_at,
        }
    }

    pub fn update(&mut self, face_seen: bool, now: DateTime<Utc>, away_timeout_seconds: f64) -> PresenceTransition {
        if face_seen {
            self.last_face_seen = now;
            if self.presence == Presence::Away {
                self.presence = Presence::Present;
                info!("User returned, resuming detection");
                return PresenceTransition::BecamePresent;
            }
            return PresenceTransition::None;
        }

        if self.presence == Presence::Present
            && elapsed_seconds(self.last_face_seen, now) > away_timeout_seconds
        {
            self.presence = Presence::Away;
            info!("User away, pausing detection");
            return PresenceTransition::BecameAway;
        }

        PresenceTransition::None
    }

    pub fn presence(&self) -> Presence {
        self.presence
    }

    pub fn is_away(&self) -> bool {
        self.presence == Presence::Away
    }

    pub fn last_face_seen(&self) -> DateTime<Utc> {
        self.last_face_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_starts_present() {
        let t0 = Utc::now();
        let tracker = PresenceTracker::new(t0);
        assert_eq!(tracker.presence(), Presence::Present);
        assert_eq!(tracker.last_face_seen(), t0);
    }

    #[test]
    fn test_goes_away_after_timeout() {
        let t0 = Utc::now();
        let mut tracker = PresenceTracker::new(t0);

        assert_eq!(tracker.update(false, t0 + Duration::seconds(3), 5.0), PresenceTransition::None);
        // Exactly the timeout is not enough
        assert_eq!(tracker.update(false, t0 + Duration::seconds(5), 5.0), PresenceTransition::None);
        assert_eq!(
            tracker.update(false, t0 + Duration::milliseconds(5001), 5.0),
            PresenceTransition::BecameAway
        );
        assert!(tracker.is_away());

        // Only reported once
        assert_eq!(tracker.update(false, t0 + Duration::seconds(9), 5.0), PresenceTransition::None);
    }

    #[test]
    fn test_face_resets_timer() {
        let t0 = Utc::now();
        let mut tracker = PresenceTracker::new(t0);

        tracker.update(true, t0 + Duration::seconds(4), 5.0);
        assert_eq!(tracker.update(false, t0 + Duration::seconds(8), 5.0), PresenceTransition::None);
        assert!(!tracker.is_away());
    }

    #[test]
    fn test_returns_when_face_reappears() {
        let t0 = Utc::now();
        let mut tracker = PresenceTracker::new(t0);
        tracker.update(false, t0 + Duration::seconds(6), 5.0);
        assert!(tracker.is_away());

        let back = t0 + Duration::seconds(7);
        assert_eq!(tracker.update(true, back, 5.0), PresenceTransition::BecamePresent);
        assert_eq!(tracker.presence(), Presence::Present);
        assert_eq!(tracker.last_face_seen(), back);
    }
}
