use log::warn;
use munkres::{solve_assignment, WeightMatrix};

use crate::bbox::{BBox, Ltrb};
use crate::error::{Error, Result};
use crate::{Detection, Track, Tracking};

const MAX_ASSIGNMENT_SIZE: usize = 256;
const UNMATCHED_COST: f32 = 100000.0;
const VELOCITY_SMOOTHING: f32 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct IouTrackerConfig {
    /// Minimum IoU between predicted track box and detection to associate them
    pub iou_threshold: f32,
    /// Frames a confirmed track survives without a matching detection
    pub max_age: u32,
    /// Consecutive hits before a track is confirmed
    pub n_init: u32,
}

impl Default for IouTrackerConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.3,
            max_age: 30,
            n_init: 3,
        }
    }
}

#[derive(Debug, Clone)]
struct TrackState {
    id: u32,
    bbox: BBox<Ltrb>,
    // per-frame edge displacement
    velocity: [f32; 4],
    class: i32,
    confidence: f32,
    hits: u32,
    time_since_update: u32,
    confirmed: bool,
}

impl TrackState {
    #[inline]
    fn predicted(&self) -> BBox<Ltrb> {
        self.bbox.shifted(&self.velocity)
    }

    fn update(&mut self, det: &Detection, n_init: u32) {
        let (old, new) = (self.bbox.as_slice(), det.bbox.as_slice());
        for i in 0..4 {
            self.velocity[i] =
                self.velocity[i] * VELOCITY_SMOOTHING + (new[i] - old[i]) * (1.0 - VELOCITY_SMOOTHING);
        }

        self.bbox = det.bbox;
        self.class = det.class;
        self.confidence = det.confidence;
        self.hits += 1;
        self.time_since_update = 0;

        if self.hits >= n_init {
            self.confirmed = true;
        }
    }

    fn mark_missed(&mut self) {
        self.bbox = self.predicted();
        self.time_since_update += 1;
    }

    fn to_track(&self) -> Track {
        Track {
            track_id: self.id,
            bbox: self.bbox,
            confirmed: self.confirmed,
            class: self.class,
            confidence: self.confidence,
            hits: self.hits,
            time_since_update: self.time_since_update,
        }
    }
}

/// IoU association tracker solved with the Hungarian algorithm.
///
/// New tracks are tentative until they are matched `n_init` frames in a row;
/// a tentative track that misses a frame is dropped, a confirmed one after
/// `max_age` missed frames. Identities are never reused.
pub struct IouTracker {
    config: IouTrackerConfig,
    tracks: Vec<TrackState>,
    next_id: u32,
}

impl IouTracker {
    pub fn new(config: IouTrackerConfig) -> Result<Self> {
        if config.n_init == 0 {
            return Err(Error::InvalidConfig("n_init must be at least 1".into()));
        }

        if !(config.iou_threshold > 0.0 && config.iou_threshold <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "iou threshold {} outside of (0, 1]",
                config.iou_threshold
            )));
        }

        Ok(Self {
            config,
            tracks: Vec::with_capacity(64),
            next_id: 1,
        })
    }

    #[inline]
    pub fn config(&self) -> &IouTrackerConfig {
        &self.config
    }

    /// Every live track, matched in the last frame or not.
    pub fn tracks(&self) -> Vec<Track> {
        self.tracks.iter().map(TrackState::to_track).collect()
    }

    fn assignment(&self, dets: &[Detection]) -> Vec<(usize, usize)> {
        if self.tracks.is_empty() || dets.is_empty() {
            return Vec::new();
        }

        let predicted: Vec<_> = self.tracks.iter().map(TrackState::predicted).collect();
        let n = predicted.len().max(dets.len());

        if n > MAX_ASSIGNMENT_SIZE {
            warn!("{} candidates exceed the assignment limit, matching greedily", n);
            return self.greedy_assignment(&predicted, dets);
        }

        let mut mat = WeightMatrix::from_fn(n, |(r, c)| {
            if r < predicted.len() && c < dets.len() {
                1.0 - predicted[r].iou(&dets[c].bbox)
            } else {
                UNMATCHED_COST
            }
        });

        match solve_assignment(&mut mat) {
            Ok(positions) => positions
                .into_iter()
                .map(|p| (p.row, p.column))
                .filter(|&(r, c)| r < predicted.len() && c < dets.len())
                .filter(|&(r, c)| predicted[r].iou(&dets[c].bbox) >= self.config.iou_threshold)
                .collect(),

            Err(err) => {
                warn!(
                    "{}, matching greedily",
                    Error::Assignment(format!("{:?}", err))
                );
                self.greedy_assignment(&predicted, dets)
            }
        }
    }

    fn greedy_assignment(&self, predicted: &[BBox<Ltrb>], dets: &[Detection]) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (r, bbox) in predicted.iter().enumerate() {
            for (c, det) in dets.iter().enumerate() {
                let iou = bbox.iou(&det.bbox);
                if iou >= self.config.iou_threshold {
                    pairs.push((iou, r, c));
                }
            }
        }

        pairs.sort_unstable_by(|a, b| b.0.total_cmp(&a.0));

        let mut used_tracks = vec![false; predicted.len()];
        let mut used_dets = vec![false; dets.len()];
        let mut result = Vec::new();

        for (_, r, c) in pairs {
            if !used_tracks[r] && !used_dets[c] {
                used_tracks[r] = true;
                used_dets[c] = true;
                result.push((r, c));
            }
        }

        result
    }
}

impl<F> Tracking<F> for IouTracker {
    fn update(&mut self, _frame: &F, detections: &[Detection]) -> Result<Vec<Track>> {
        let matches = self.assignment(detections);

        let mut track_matched = vec![false; self.tracks.len()];
        let mut det_matched = vec![false; detections.len()];

        for &(r, c) in &matches {
            self.tracks[r].update(&detections[c], self.config.n_init);
            track_matched[r] = true;
            det_matched[c] = true;
        }

        for (track, matched) in self.tracks.iter_mut().zip(&track_matched) {
            if !*matched {
                track.mark_missed();
            }
        }

        let max_age = self.config.max_age;
        self.tracks.retain(|t| {
            t.time_since_update == 0 || (t.confirmed && t.time_since_update <= max_age)
        });

        for (det, matched) in detections.iter().zip(&det_matched) {
            if *matched {
                continue;
            }

            let id = self.next_id;
            self.next_id += 1;

            self.tracks.push(TrackState {
                id,
                bbox: det.bbox,
                velocity: [0.0; 4],
                class: det.class,
                confidence: det.confidence,
                hits: 1,
                time_since_update: 0,
                confirmed: self.config.n_init <= 1,
            });
        }

        Ok(self
            .tracks
            .iter()
            .filter(|t| t.time_since_update == 0)
            .map(TrackState::to_track)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(l: f32, t: f32) -> Detection {
        Detection::new(BBox::ltrb(l, t, l + 40.0, t + 100.0), 0.9, 0).unwrap()
    }

    fn step(tracker: &mut IouTracker, dets: &[Detection]) -> Vec<Track> {
        Tracking::<()>::update(tracker, &(), dets).unwrap()
    }

    #[test]
    fn confirms_after_n_init_hits() {
        let mut tracker = IouTracker::new(IouTrackerConfig::default()).unwrap();

        let first = step(&mut tracker, &[person(100.0, 100.0)]);
        assert_eq!(first.len(), 1);
        assert!(!first[0].confirmed);

        step(&mut tracker, &[person(102.0, 104.0)]);
        let third = step(&mut tracker, &[person(104.0, 108.0)]);

        assert_eq!(third.len(), 1);
        assert!(third[0].confirmed);
        assert_eq!(third[0].track_id, first[0].track_id);
        assert_eq!(third[0].hits, 3);
    }

    fn id_at(tracks: &[Track], x: f32) -> Option<u32> {
        tracks
            .iter()
            .find(|t| (t.bbox.left() - x).abs() < 10.0)
            .map(|t| t.track_id)
    }

    #[test]
    fn keeps_identities_apart() {
        let mut tracker = IouTracker::new(IouTrackerConfig::default()).unwrap();

        let a = step(&mut tracker, &[person(0.0, 0.0), person(400.0, 0.0)]);
        let b = step(&mut tracker, &[person(405.0, 5.0), person(5.0, 5.0)]);

        assert_eq!(id_at(&a, 0.0), id_at(&b, 5.0));
        assert_eq!(id_at(&a, 400.0), id_at(&b, 405.0));
        assert_ne!(id_at(&b, 5.0), id_at(&b, 405.0));
    }

    #[test]
    fn tentative_track_dropped_on_miss() {
        let mut tracker = IouTracker::new(IouTrackerConfig::default()).unwrap();

        let first = step(&mut tracker, &[person(0.0, 0.0)]);
        assert!(step(&mut tracker, &[]).is_empty());

        let again = step(&mut tracker, &[person(0.0, 0.0)]);
        assert_ne!(again[0].track_id, first[0].track_id);
    }

    #[test]
    fn confirmed_track_survives_short_gap() {
        let config = IouTrackerConfig {
            n_init: 1,
            max_age: 2,
            ..Default::default()
        };
        let mut tracker = IouTracker::new(config).unwrap();

        let first = step(&mut tracker, &[person(0.0, 0.0)]);
        assert!(first[0].confirmed);

        assert!(step(&mut tracker, &[]).is_empty());
        assert!(step(&mut tracker, &[]).is_empty());

        let back = step(&mut tracker, &[person(0.0, 0.0)]);
        assert_eq!(back[0].track_id, first[0].track_id);

        for _ in 0..3 {
            step(&mut tracker, &[]);
        }
        assert!(tracker.tracks().is_empty());
    }

    #[test]
    fn rejects_invalid_config() {
        let config = IouTrackerConfig {
            n_init: 0,
            ..Default::default()
        };

        assert!(IouTracker::new(config).is_err());
    }
}
