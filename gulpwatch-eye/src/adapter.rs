//! Perception adapters
//!
//! An adapter produces one [`PerceptionFrame`] per tick. Camera capture and
//! model inference live behind this trait and outside this crate.

use crate::error::EyeError;
use async_trait::async_trait;
use gulpwatch_core::PerceptionFrame;
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Source of per-tick perception observations
#[async_trait]
pub trait PerceptionAdapter: Send {
    fn name(&self) -> &str;

    /// Acquire devices or load data. Called once before the first sample.
    async fn open(&mut self) -> Result<(), EyeError> {
        Ok(())
    }

    /// Observations for the current tick
    async fn sample(&mut self) -> Result<PerceptionFrame, EyeError>;

    /// Release whatever `open` acquired
    async fn close(&mut self) -> Result<(), EyeError> {
        Ok(())
    }

    /// True once the adapter has nothing more to produce
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Parse JSON Lines into frames, skipping blank and malformed lines.
pub fn parse_frames(content: &str) -> Vec<PerceptionFrame> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match serde_json::from_str::<PerceptionFrame>(line) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!("Skipping malformed frame on line {}: {}", idx + 1, e);
                None
            }
        })
        .collect()
}

enum ReplaySource {
    File(PathBuf),
    Frames,
}

/// Replays recorded frames, one per sample
pub struct ReplayAdapter {
    source: ReplaySource,
    frames: VecDeque<PerceptionFrame>,
    loaded: usize,
}

impl ReplayAdapter {
    /// Replay a JSON Lines recording; the file is read on `open`.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ReplaySource::File(path.into()),
            frames: VecDeque::new(),
            loaded: 0,
        }
    }

    pub fn from_frames(frames: Vec<PerceptionFrame>) -> Self {
        let loaded = frames.len();
        Self {
            source: ReplaySource::Frames,
            frames: frames.into(),
            loaded,
        }
    }

    /// Frames available after loading
    pub fn loaded(&self) -> usize {
        self.loaded
    }
}

#[async_trait]
impl PerceptionAdapter for ReplayAdapter {
    fn name(&self) -> &str {
        "replay"
    }

    async fn open(&mut self) -> Result<(), EyeError> {
        if let ReplaySource::File(path) = &self.source {
            let content = tokio::fs::read_to_string(path).await?;
            let frames = parse_frames(&content);
            self.loaded = frames.len();
            self.frames = frames.into();
            info!("Loaded {} frames from {}", self.loaded, path.display());
        }
        Ok(())
    }

    async fn sample(&mut self) -> Result<PerceptionFrame, EyeError> {
        match self.frames.pop_front() {
            Some(frame) => Ok(frame),
            None => {
                debug!("Replay exhausted, returning empty frame");
                Ok(PerceptionFrame::empty())
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frames_skips_malformed() {
        let content = r#"{"hands": [], "face": {"bbox": {"x": 0.4, "y": 0.2, "width": 0.2, "height": 0.4}}}

not json
{"vessels": [{"class": "bottle", "confidence": 0.8, "bbox": {"x": 0.1, "y": 0.1, "width": 0.1, "height": 0.2}}]}
{"vessels": [{"class": "laptop", "confidence": 0.8, "bbox": {"x": 0.1, "y": 0.1, "width": 0.1, "height": 0.2}}]}
"#;
        let frames = parse_frames(content);
        assert_eq!(frames.len(), 2);
        assert!(frames[0].face.is_some());
        assert_eq!(frames[1].vessels.len(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_replay() {
        let mut adapter = ReplayAdapter::from_frames(vec![PerceptionFrame::empty(), PerceptionFrame::empty()]);
        adapter.open().await.unwrap();
        assert_eq!(adapter.name(), "replay");
        assert_eq!(adapter.loaded(), 2);
        assert!(!adapter.is_exhausted());

        adapter.sample().await.unwrap();
        adapter.sample().await.unwrap();
        assert!(adapter.is_exhausted());

        // Past the end the adapter keeps producing empty frames
        let frame = adapter.sample().await.unwrap();
        assert!(frame.hands.is_empty());
    }

    #[test]
    fn test_missing_file_fails_open() {
        let mut adapter = ReplayAdapter::from_path("/nonexistent/frames.jsonl");
        let result = tokio_test::block_on(adapter.open());
        assert!(matches!(result, Err(EyeError::Io(_))));
    }
}
