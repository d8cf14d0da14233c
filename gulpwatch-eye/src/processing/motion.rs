//! Upward-motion trend over a short palm-center history

use gulpwatch_core::Point;
use std::collections::VecDeque;

/// Maximum number of remembered palm centers
pub const HISTORY_CAPACITY: usize = 10;

/// Samples needed before a trend is reported
pub const MIN_SAMPLES: usize = 4;

/// Trailing samples examined by [`MotionTracker::is_upward_trend`]
pub const TREND_WINDOW: usize = 5;

/// Bounded FIFO of one hand's reference point
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MotionTracker {
    history: VecDeque<Point>,
}

impl MotionTracker {
    pub fn new() -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Append a sample, evicting the oldest beyond capacity
    pub fn push(&mut self, point: Point) {
        if self.history.len() >= HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(point);
    }

    /// True when at least half of the recent sample-to-sample steps move up
    /// the screen (decreasing y). Always false with fewer than
    /// [`MIN_SAMPLES`] samples.
    pub fn is_upward_trend(&self) -> bool {
        if self.history.len() < MIN_SAMPLES {
            return false;
        }

        let skip = self.history.len().saturating_sub(TREND_WINDOW);
        let recent: Vec<f32> = self.history.iter().skip(skip).map(|p| p.y).collect();

        let comparisons = recent.len() - 1;
        let upward = recent.windows(2).filter(|w| w[1] < w[0]).count();

        upward * 2 >= comparisons
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn latest(&self) -> Option<Point> {
        self.history.back().copied()
    }
}
