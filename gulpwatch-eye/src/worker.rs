//! Fixed-interval detection loop

use crate::adapter::PerceptionAdapter;
use crate::detector::GulpDetector;
use crate::error::EyeError;
use crate::processing::PresenceTransition;
use crate::report::TickReport;
use crate::sink::EventSink;
use chrono::{DateTime, Utc};
use gulpwatch_core::{FrameTick, GulpwatchConfig, PerceptionFrame};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Totals for one worker run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerSummary {
    pub ticks: u64,
    pub gulps: u64,
}

/// Timestamps ticks on one consistent clock per session.
///
/// The first frame decides the source. A recorded session keeps recorded
/// time and advances frames without `captured_at` by the wall time elapsed
/// since the last recorded frame. A live session ignores `captured_at`.
#[derive(Debug, Default)]
pub(crate) struct SessionClock {
    recorded: Option<bool>,
    last_recorded: Option<(DateTime<Utc>, Instant)>,
    warned: bool,
}

impl SessionClock {
    pub(crate) fn timestamp(&mut self, captured_at: Option<DateTime<Utc>>) -> DateTime<Utc> {
        let recorded = *self.recorded.get_or_insert(captured_at.is_some());

        match (recorded, captured_at) {
            (true, Some(at)) => {
                self.last_recorded = Some((at, Instant::now()));
                at
            }
            (true, None) => {
                self.warn_once("Frame without captured_at in a recorded session, extrapolating from the last recorded frame");
                match self.last_recorded {
                    Some((at, seen)) => {
                        at + chrono::Duration::from_std(seen.elapsed()).unwrap_or_else(|_| chrono::Duration::zero())
                    }
                    None => Utc::now(),
                }
            }
            (false, Some(_)) => {
                self.warn_once("Ignoring captured_at in a live session");
                Utc::now()
            }
            (false, None) => Utc::now(),
        }
    }

    fn warn_once(&mut self, message: &str) {
        if !self.warned {
            self.warned = true;
            warn!("{}", message);
        }
    }
}

/// Runs the detector on its own task, one perception sample per tick.
///
/// The detection state never leaves the task; consumers only see what is
/// published through the [`EventSink`] and [`last_report`](Self::last_report).
pub struct DetectionWorker {
    config: Arc<GulpwatchConfig>,
    is_running: Arc<RwLock<bool>>,
    last_report: Arc<RwLock<Option<TickReport>>>,
    handle: Arc<RwLock<Option<JoinHandle<WorkerSummary>>>>,
}

impl DetectionWorker {
    pub fn new(config: GulpwatchConfig) -> Result<Self, EyeError> {
        config.validate()?;

        Ok(Self {
            config: Arc::new(config),
            is_running: Arc::new(RwLock::new(false)),
            last_report: Arc::new(RwLock::new(None)),
            handle: Arc::new(RwLock::new(None)),
        })
    }

    /// Open `adapter` and start ticking
    pub async fn start<A>(&self, mut adapter: A, sink: Arc<dyn EventSink>) -> Result<(), EyeError>
    where
        A: PerceptionAdapter + 'static,
    {
        {
            let mut is_running = self.is_running.write();
            if *is_running {
                return Err(EyeError::Worker("Detection worker already running".to_string()));
            }
            *is_running = true;
        }

        let mut detector = match GulpDetector::new(
            self.config.detector.clone(),
            self.config.geometry.clone(),
            Utc::now(),
        ) {
            Ok(detector) => detector,
            Err(e) => {
                *self.is_running.write() = false;
                return Err(e);
            }
        };

        if let Err(e) = adapter.open().await {
            *self.is_running.write() = false;
            return Err(EyeError::Adapter(format!("Failed to open {} adapter: {}", adapter.name(), e)));
        }

        info!("Starting detection worker with {} adapter", adapter.name());

        let pipeline = self.config.pipeline.clone();
        let is_running = self.is_running.clone();
        let last_report = self.last_report.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(pipeline.detection_interval_ms));
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let sample_timeout = Duration::from_millis(pipeline.sample_timeout_ms);
            let mut summary = WorkerSummary::default();
            let mut clock = SessionClock::default();

            loop {
                interval.tick().await;

                if !*is_running.read() {
                    break;
                }
                if adapter.is_exhausted() {
                    info!("{} adapter exhausted", adapter.name());
                    break;
                }

                let frame = match tokio::time::timeout(sample_timeout, adapter.sample()).await {
                    Ok(Ok(frame)) => frame,
                    Ok(Err(e)) => {
                        warn!("Perception sample failed: {}", e);
                        PerceptionFrame::empty()
                    }
                    Err(_) => {
                        warn!("{}", EyeError::Timeout(pipeline.sample_timeout_ms));
                        PerceptionFrame::empty()
                    }
                };

                summary.ticks += 1;
                let at = clock.timestamp(frame.captured_at);
                if summary.ticks == 1 {
                    // Anchor the session to the first frame's clock
                    detector.reset(at);
                }

                let decision = detector.process(FrameTick::new(summary.ticks, at), &frame);

                match decision.presence {
                    PresenceTransition::BecamePresent => sink.on_presence_changed(true, at),
                    PresenceTransition::BecameAway => sink.on_presence_changed(false, at),
                    PresenceTransition::None => {}
                }

                if let Some(event) = &decision.event {
                    summary.gulps += 1;
                    sink.on_gulp(event);
                }

                sink.on_tick(&decision.report);
                *last_report.write() = Some(decision.report);
            }

            if let Err(e) = adapter.close().await {
                warn!("Failed to close {} adapter: {}", adapter.name(), e);
            }

            *is_running.write() = false;
            info!(ticks = summary.ticks, gulps = summary.gulps, "Detection worker stopped");
            summary
        });

        *self.handle.write() = Some(handle);
        Ok(())
    }

    /// Signal the loop to stop at the next tick boundary and wait for it
    pub async fn stop(&self) -> Result<WorkerSummary, EyeError> {
        *self.is_running.write() = false;

        let Some(mut handle) = self.handle.write().take() else {
            return Ok(WorkerSummary::default());
        };

        let pipeline = &self.config.pipeline;
        let grace = Duration::from_millis(pipeline.detection_interval_ms + pipeline.sample_timeout_ms + 1000);

        match tokio::time::timeout(grace, &mut handle).await {
            Ok(joined) => joined.map_err(|e| EyeError::Worker(format!("Detection task failed: {}", e))),
            Err(_) => {
                handle.abort();
                Err(EyeError::Worker("Detection task did not stop in time".to_string()))
            }
        }
    }

    /// Wait for the loop to finish on its own (adapter exhausted)
    pub async fn wait(&self) -> Result<WorkerSummary, EyeError> {
        let Some(handle) = self.handle.write().take() else {
            debug!("No detection task to wait for");
            return Ok(WorkerSummary::default());
        };

        handle
            .await
            .map_err(|e| EyeError::Worker(format!("Detection task failed: {}", e)))
    }

    pub fn is_running(&self) -> bool {
        *self.is_running.read()
    }

    /// Most recent tick diagnostics
    pub fn last_report(&self) -> Option<TickReport> {
        self.last_report.read().clone()
    }

    pub fn config(&self) -> &GulpwatchConfig {
        &self.config
    }
}
