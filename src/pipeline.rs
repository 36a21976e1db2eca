use log::{debug, info, trace, warn};
use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

use crate::counter::Counter;
use crate::crossing::{crossing, CountingLine, Crossing};
use crate::detection::DetectionFilter;
use crate::error::Result;
use crate::frame::{CancelToken, FrameSink, FrameSource, VideoMeta};
use crate::history::{RetentionPolicy, TrajectoryStore};
use crate::{Detecting, Rendering, Track, Tracking};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CountingEvent {
    pub track_id: u32,
    pub crossing: Crossing,
    pub frame_idx: u64,
    pub from: [f32; 2],
    pub to: [f32; 2],
}

/// Counting state of one run: the line, per-identity history and totals.
#[derive(Debug)]
pub struct CountingContext {
    line: CountingLine,
    store: TrajectoryStore,
    counter: Counter,
    frame_idx: u64,
}

impl CountingContext {
    pub fn new(line: CountingLine, policy: RetentionPolicy) -> Result<Self> {
        Ok(Self {
            line,
            store: TrajectoryStore::new(policy)?,
            counter: Counter::new(),
            frame_idx: 0,
        })
    }

    #[inline]
    pub fn line(&self) -> &CountingLine {
        &self.line
    }

    #[inline]
    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    #[inline]
    pub fn store(&self) -> &TrajectoryStore {
        &self.store
    }

    /// Frames processed so far.
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frame_idx
    }

    /// Feeds one frame worth of tracks.
    ///
    /// Tentative tracks and tracks with a malformed box are ignored entirely.
    /// Returns the crossings counted in this frame.
    pub fn process(&mut self, tracks: &[Track]) -> Vec<CountingEvent> {
        let frame_idx = self.frame_idx;
        let mut events = Vec::new();

        for track in tracks.iter().filter(|t| t.confirmed) {
            if let Err(err) = track.bbox.validate() {
                warn!("skipping track {}: {}", track.track_id, err);
                continue;
            }

            self.store.record(track.track_id, track.centroid(), frame_idx);

            let (prev, curr) = match self.store.last_two(track.track_id) {
                Some(pair) => pair,
                None => continue,
            };

            let event = crossing(&prev, &curr, &self.line);
            self.counter.apply(event);

            if let Some(crossing) = event {
                debug!(
                    "track {} {:?} at frame {}: ({}, {}) -> ({}, {})",
                    track.track_id, crossing, frame_idx, prev.x, prev.y, curr.x, curr.y
                );

                events.push(CountingEvent {
                    track_id: track.track_id,
                    crossing,
                    frame_idx,
                    from: point(&prev),
                    to: point(&curr),
                });
            }
        }

        self.store.evict_idle(frame_idx);
        self.frame_idx += 1;

        events
    }
}

#[inline]
fn point(p: &na::Point2<f32>) -> [f32; 2] {
    [p.x, p.y]
}

/// Totals reported once the run is drained
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub frames: u64,
    pub entries: u64,
    pub exits: u64,
    pub cancelled: bool,
    pub meta: VideoMeta,
    pub line: CountingLine,
}

impl RunReport {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;

        Ok(())
    }
}

/// Sequential detect -> track -> count -> render -> write loop.
pub struct Pipeline<D, T, R> {
    detector: D,
    tracker: T,
    renderer: R,
    filter: DetectionFilter,
    context: CountingContext,
}

impl<D, T, R> Pipeline<D, T, R> {
    pub fn new(
        detector: D,
        tracker: T,
        renderer: R,
        filter: DetectionFilter,
        context: CountingContext,
    ) -> Self {
        Self {
            detector,
            tracker,
            renderer,
            filter,
            context,
        }
    }

    #[inline]
    pub fn context(&self) -> &CountingContext {
        &self.context
    }

    /// Runs one frame through every stage, annotating it in place.
    pub fn step<F>(&mut self, frame: &mut F) -> Result<Vec<CountingEvent>>
    where
        D: Detecting<F>,
        T: Tracking<F>,
        R: Rendering<F>,
    {
        let detections = self.filter.apply(self.detector.detect(frame)?);
        let tracks = self.tracker.update(frame, &detections)?;

        let events = self.context.process(&tracks);

        for track in tracks.iter().filter(|t| t.confirmed && t.bbox.is_valid()) {
            self.renderer.draw_track(frame, track)?;
        }

        self.renderer
            .draw_overlay(frame, &self.context.line, &self.context.counter)?;

        trace!(
            "frame {}: {} detections, {} tracks, {}",
            self.context.frames(),
            detections.len(),
            tracks.len(),
            self.context.counter.summary()
        );

        Ok(events)
    }

    /// Drives the loop until the source is drained or `cancel` fires, then
    /// releases the source and the sink. Stage errors end the run after the
    /// release.
    pub fn run<F, S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        cancel: &CancelToken,
    ) -> Result<RunReport>
    where
        D: Detecting<F>,
        T: Tracking<F>,
        R: Rendering<F>,
        S: FrameSource<F>,
        K: FrameSink<F>,
    {
        let meta = source.meta();
        info!(
            "processing {}x{} @ {:.2} fps, line {:?} at {}",
            meta.width, meta.height, meta.fps, self.context.line.orientation, self.context.line.offset
        );

        let outcome = self.drive(source, sink, cancel);

        let released = source.release().and(sink.release());
        let cancelled = outcome?;
        released?;

        let report = RunReport {
            frames: self.context.frames(),
            entries: self.context.counter.entries(),
            exits: self.context.counter.exits(),
            cancelled,
            meta,
            line: self.context.line,
        };

        info!(
            "finished after {} frames: {} entries, {} exits",
            report.frames, report.entries, report.exits
        );

        Ok(report)
    }

    fn drive<F, S, K>(&mut self, source: &mut S, sink: &mut K, cancel: &CancelToken) -> Result<bool>
    where
        D: Detecting<F>,
        T: Tracking<F>,
        R: Rendering<F>,
        S: FrameSource<F>,
        K: FrameSink<F>,
    {
        while let Some(mut frame) = source.next_frame()? {
            self.step(&mut frame)?;
            sink.write(&frame)?;

            if cancel.is_cancelled() {
                info!("cancelled at frame {}", self.context.frames());
                return Ok(true);
            }
        }

        Ok(false)
    }
}
