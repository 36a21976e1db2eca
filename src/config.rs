use clap::Parser;
use serde_derive::Serialize;
use std::path::PathBuf;

use crate::crossing::{CountingLine, EntryDirection, Orientation};
use crate::detection::{DetectionFilter, PERSON_CLASS};
use crate::detector::YoloDetectorConfig;
use crate::error::{Error, Result};
use crate::frame::VideoMeta;
use crate::history::{RetentionPolicy, DEFAULT_HISTORY_LEN};
use crate::tracker::IouTrackerConfig;

/// Counts people crossing a line in a video
#[derive(Parser, Serialize, Debug, Clone)]
#[command(name = "footfall", version)]
pub struct Config {
    /// Input video file
    pub input: PathBuf,

    /// Annotated output video
    #[arg(short, long, default_value = "output.mp4")]
    pub output: PathBuf,

    /// YOLOv8 ONNX model
    #[arg(short, long, default_value = "yolov8n.onnx")]
    pub model: PathBuf,

    #[arg(long, value_enum, default_value_t = Orientation::Horizontal)]
    pub orientation: Orientation,

    /// Line position in pixels along the split axis [default: frame midpoint]
    #[arg(long)]
    pub offset: Option<f32>,

    #[arg(long, value_enum, default_value_t = EntryDirection::Increasing)]
    pub entry_direction: EntryDirection,

    /// Detections must score strictly above this to be tracked
    #[arg(long, default_value_t = 0.5)]
    pub confidence: f32,

    /// Accepted class ids
    #[arg(long, value_delimiter = ',', default_values_t = vec![PERSON_CLASS])]
    pub classes: Vec<i32>,

    #[arg(long, default_value_t = 0.45)]
    pub nms_iou: f32,

    /// Minimum IoU to associate a detection with a track
    #[arg(long, default_value_t = 0.3)]
    pub iou_threshold: f32,

    /// Frames a confirmed track survives without detections
    #[arg(long, default_value_t = 30)]
    pub max_age: u32,

    /// Consecutive hits before a track is confirmed
    #[arg(long, default_value_t = 3)]
    pub n_init: u32,

    /// Centroids kept per identity
    #[arg(long, default_value_t = DEFAULT_HISTORY_LEN)]
    pub history_len: usize,

    /// Frames before an unseen identity's history is dropped [default: max-age]
    #[arg(long)]
    pub history_max_idle: Option<u64>,

    /// Show a live window, `q` or Esc stops the run
    #[arg(long)]
    pub display: bool,

    /// Write the final totals as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Increase log verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    #[serde(skip)]
    pub verbose: u8,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::InvalidConfig(format!(
                "confidence {} outside of [0, 1]",
                self.confidence
            )));
        }

        if self.classes.is_empty() {
            return Err(Error::InvalidConfig("no classes given".into()));
        }

        if !(0.0..=1.0).contains(&self.nms_iou) {
            return Err(Error::InvalidConfig(format!(
                "nms iou {} outside of [0, 1]",
                self.nms_iou
            )));
        }

        if self.n_init == 0 {
            return Err(Error::InvalidConfig("n-init must be at least 1".into()));
        }

        if self.history_len < 2 {
            return Err(Error::InvalidConfig(format!(
                "history length must be at least 2, got {}",
                self.history_len
            )));
        }

        if matches!(self.offset, Some(offset) if !offset.is_finite() || offset < 0.0) {
            return Err(Error::InvalidConfig("line offset must be non-negative".into()));
        }

        Ok(())
    }

    /// Counting line for a stream with the given dimensions.
    pub fn line(&self, meta: &VideoMeta) -> CountingLine {
        let line = match self.offset {
            Some(offset) => CountingLine::new(self.orientation, offset),
            None => CountingLine::midpoint(self.orientation, meta),
        };

        line.with_entry_direction(self.entry_direction)
    }

    pub fn filter(&self) -> Result<DetectionFilter> {
        DetectionFilter::new(self.classes.clone(), self.confidence)
    }

    pub fn detector_config(&self) -> YoloDetectorConfig {
        // keep the detector floor at or below the counting threshold
        YoloDetectorConfig::new(self.confidence.min(0.25), self.nms_iou)
    }

    pub fn tracker_config(&self) -> IouTrackerConfig {
        IouTrackerConfig {
            iou_threshold: self.iou_threshold,
            max_age: self.max_age,
            n_init: self.n_init,
        }
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            capacity: self.history_len,
            max_idle_frames: self.history_max_idle.unwrap_or(self.max_age as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("footfall").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_follow_reference_setup() {
        let config = parse(&["people.mp4"]);

        assert!(config.validate().is_ok());
        assert_eq!(config.output, PathBuf::from("output.mp4"));
        assert_eq!(config.classes, vec![PERSON_CLASS]);
        assert_eq!(config.confidence, 0.5);
        assert_eq!(config.orientation, Orientation::Horizontal);
        assert_eq!(config.retention().capacity, 2);
        assert_eq!(config.retention().max_idle_frames, 30);
    }

    #[test]
    fn line_defaults_to_midpoint() {
        let meta = VideoMeta {
            width: 1080,
            height: 1920,
            fps: 30.0,
        };

        let line = parse(&["in.mp4"]).line(&meta);
        assert_eq!(line.offset, 960.0);

        let line = parse(&["in.mp4", "--orientation", "vertical", "--offset", "100"]).line(&meta);
        assert_eq!(line.orientation, Orientation::Vertical);
        assert_eq!(line.offset, 100.0);
    }

    #[test]
    fn parses_class_list() {
        let config = parse(&["in.mp4", "--classes", "0,1,3"]);

        assert_eq!(config.classes, vec![0, 1, 3]);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse(&["in.mp4", "--confidence", "1.5"]).validate().is_err());
        assert!(parse(&["in.mp4", "--history-len", "1"]).validate().is_err());
        assert!(parse(&["in.mp4", "--n-init", "0"]).validate().is_err());
    }
}
