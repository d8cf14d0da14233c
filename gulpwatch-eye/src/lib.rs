//! gulpwatch-eye: drinking-gesture detection
//!
//! Turns a stream of per-frame perception observations (hand skeletons, a
//! face box and drinking-vessel candidates) into debounced gulp events,
//! while tracking whether the user is in front of the camera.
//!
//! Perception itself happens behind [`PerceptionAdapter`]; results leave the
//! worker through an [`EventSink`].

pub mod adapter;
pub mod detector;
pub mod error;
pub mod processing;
pub mod report;
pub mod sink;
pub mod worker;

pub use adapter::{PerceptionAdapter, ReplayAdapter};
pub use detector::{step, DetectionState, GulpDetector, GulpEvent, TickDecision, TickOutcome};
pub use error::EyeError;
pub use processing::{Presence, PresenceTransition};
pub use report::{DetectionPhase, TickReport};
pub use sink::{event_channel, ChannelSink, DetectorEvent, EventSink};
pub use worker::{DetectionWorker, WorkerSummary};
