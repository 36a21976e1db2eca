pub mod bbox;
pub mod circular_queue;
pub mod config;
pub mod counter;
pub mod crossing;
pub mod detection;
pub mod detector;
pub mod error;
pub mod frame;
pub mod history;
pub mod pipeline;
pub mod tracker;

#[cfg(feature = "opencv")]
pub mod drawer;
#[cfg(feature = "opencv")]
pub mod video;

mod track;

pub use counter::Counter;
pub use crossing::{crossing, CountingLine, Crossing, EntryDirection, Orientation};
pub use detection::{Detection, DetectionFilter};
pub use error::{Error, Result};
pub use frame::{CancelToken, FrameSink, FrameSource, VideoMeta};
pub use history::{RetentionPolicy, TrajectoryStore};
pub use pipeline::{CountingContext, CountingEvent, Pipeline, RunReport};
pub use track::Track;
pub use tracker::{IouTracker, IouTrackerConfig};

/// Finds objects in a frame.
pub trait Detecting<F> {
    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>>;
}

/// Associates the current detections with tracks kept across frames.
///
/// Returns the tracks updated in this frame, tentative ones included.
pub trait Tracking<F> {
    fn update(&mut self, frame: &F, detections: &[Detection]) -> Result<Vec<Track>>;
}

/// Annotates frames before they reach the output sink.
pub trait Rendering<F> {
    fn draw_track(&mut self, frame: &mut F, track: &Track) -> Result<()>;

    /// Counting line and running totals.
    fn draw_overlay(&mut self, frame: &mut F, line: &CountingLine, counter: &Counter)
        -> Result<()>;
}
