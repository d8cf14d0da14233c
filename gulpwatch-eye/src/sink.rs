//! Event delivery out of the detection worker

use crate::detector::GulpEvent;
use crate::report::TickReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

/// Notifications published by the detection worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DetectorEvent {
    Gulp(GulpEvent),
    PresenceChanged { present: bool, at: DateTime<Utc> },
    Tick(TickReport),
}

/// Consumer of detector notifications.
///
/// Called from the worker task; implementations must return promptly and
/// never block on the consumer side.
pub trait EventSink: Send + Sync {
    fn on_gulp(&self, event: &GulpEvent);

    fn on_presence_changed(&self, present: bool, at: DateTime<Utc>);

    /// Diagnostics for every tick, after that tick's other notifications
    fn on_tick(&self, _report: &TickReport) {}
}

/// Forwards notifications into a bounded channel without blocking.
///
/// Events that do not fit are dropped with a warning. Tick reports are only
/// forwarded after [`with_reports`](Self::with_reports).
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<DetectorEvent>,
    reports: bool,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<DetectorEvent>) -> Self {
        Self { sender, reports: false }
    }

    pub fn with_reports(mut self) -> Self {
        self.reports = true;
        self
    }

    fn forward(&self, event: DetectorEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping detector event");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Event channel closed, dropping detector event");
            }
        }
    }
}

impl EventSink for ChannelSink {
    fn on_gulp(&self, event: &GulpEvent) {
        self.forward(DetectorEvent::Gulp(event.clone()));
    }

    fn on_presence_changed(&self, present: bool, at: DateTime<Utc>) {
        self.forward(DetectorEvent::PresenceChanged { present, at });
    }

    fn on_tick(&self, report: &TickReport) {
        if self.reports {
            self.forward(DetectorEvent::Tick(report.clone()));
        }
    }
}

/// Bounded channel with a sink on the sending side
pub fn event_channel(capacity: usize) -> (ChannelSink, mpsc::Receiver<DetectorEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ChannelSink::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gulpwatch_core::Handedness;
    use uuid::Uuid;

    fn gulp(seq: u64) -> GulpEvent {
        GulpEvent {
            id: Uuid::new_v4(),
            seq,
            at: Utc::now(),
            hand: Handedness::Right,
            vessel: None,
            distance: 0.05,
            criteria_met: 3,
        }
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_in_order() {
        let (sink, mut rx) = event_channel(8);
        let now = Utc::now();
        sink.on_gulp(&gulp(1));
        sink.on_presence_changed(false, now);

        match rx.recv().await.unwrap() {
            DetectorEvent::Gulp(event) => assert_eq!(event.seq, 1),
            other => panic!("Expected gulp, got {:?}", other),
        }
        assert_eq!(
            rx.recv().await.unwrap(),
            DetectorEvent::PresenceChanged { present: false, at: now }
        );
    }

    #[tokio::test]
    async fn test_full_channel_drops() {
        let (sink, mut rx) = event_channel(1);
        sink.on_gulp(&gulp(1));
        sink.on_gulp(&gulp(2));

        match rx.recv().await.unwrap() {
            DetectorEvent::Gulp(event) => assert_eq!(event.seq, 1),
            other => panic!("Expected gulp, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_tick_reports_only_when_enabled() {
        let config = gulpwatch_core::DetectorConfig::default();
        let report = TickReport::new(3, Utc::now(), &config);

        let (quiet, mut rx) = event_channel(4);
        quiet.on_tick(&report);
        assert!(rx.try_recv().is_err());

        let (sink, mut rx) = event_channel(4);
        let sink = sink.with_reports();
        sink.on_tick(&report);
        match rx.recv().await.unwrap() {
            DetectorEvent::Tick(forwarded) => assert_eq!(forwarded.seq, 3),
            other => panic!("Expected tick report, got {:?}", other),
        }
    }

    #[test]
    fn test_closed_channel_does_not_panic() {
        let (sink, rx) = event_channel(4);
        drop(rx);
        sink.on_presence_changed(true, Utc::now());
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(DetectorEvent::PresenceChanged {
            present: true,
            at: Utc::now(),
        })
        .unwrap();
        assert_eq!(json["type"], "presence_changed");
        assert_eq!(json["present"], true);

        let report = TickReport::new(5, Utc::now(), &gulpwatch_core::DetectorConfig::default());
        let json = serde_json::to_value(DetectorEvent::Tick(report)).unwrap();
        assert_eq!(json["type"], "tick");
        assert_eq!(json["seq"], 5);
    }
}
