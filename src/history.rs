//! Per-identity centroid history.
//!
//! Only the last `capacity` samples of each identity are kept, and identities
//! not recorded for more than `max_idle_frames` frames are evicted, so memory
//! stays bounded on long streams.

use log::trace;
use nalgebra as na;
use std::collections::HashMap;

use crate::circular_queue::CircularQueue;
use crate::error::{Error, Result};

pub const DEFAULT_HISTORY_LEN: usize = 2;
pub const DEFAULT_MAX_IDLE_FRAMES: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Samples kept per identity, at least the two the crossing test reads.
    pub capacity: usize,
    pub max_idle_frames: u64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_HISTORY_LEN,
            max_idle_frames: DEFAULT_MAX_IDLE_FRAMES,
        }
    }
}

#[derive(Debug, Clone)]
struct Trajectory {
    points: CircularQueue<na::Point2<f32>>,
    samples: usize,
    last_seen: u64,
}

#[derive(Debug)]
pub struct TrajectoryStore {
    policy: RetentionPolicy,
    trajectories: HashMap<u32, Trajectory>,
}

impl TrajectoryStore {
    pub fn new(policy: RetentionPolicy) -> Result<Self> {
        if policy.capacity < 2 {
            return Err(Error::InvalidConfig(format!(
                "history length must be at least 2, got {}",
                policy.capacity
            )));
        }

        Ok(Self {
            policy,
            trajectories: HashMap::new(),
        })
    }

    #[inline]
    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Appends `centroid` to the identity's history, creating it on first sighting.
    pub fn record(&mut self, track_id: u32, centroid: na::Point2<f32>, frame_idx: u64) {
        let capacity = self.policy.capacity;
        let traj = self
            .trajectories
            .entry(track_id)
            .or_insert_with(|| Trajectory {
                points: CircularQueue::with_capacity(capacity),
                samples: 0,
                last_seen: frame_idx,
            });

        traj.points.push(centroid);
        traj.samples += 1;
        traj.last_seen = frame_idx;
    }

    /// `(previous, current)` centroids, or `None` while history is insufficient.
    pub fn last_two(&self, track_id: u32) -> Option<(na::Point2<f32>, na::Point2<f32>)> {
        let (prev, curr) = self.trajectories.get(&track_id)?.points.last_two()?;

        Some((*prev, *curr))
    }

    /// Number of frames the identity was recorded in, including evicted samples.
    pub fn samples(&self, track_id: u32) -> usize {
        self.trajectories
            .get(&track_id)
            .map(|t| t.samples)
            .unwrap_or(0)
    }

    pub fn points(&self, track_id: u32) -> impl Iterator<Item = &na::Point2<f32>> {
        self.trajectories
            .get(&track_id)
            .into_iter()
            .flat_map(|t| t.points.iter())
    }

    #[inline]
    pub fn contains(&self, track_id: u32) -> bool {
        self.trajectories.contains_key(&track_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Drops identities unseen for more than `max_idle_frames`; returns how many.
    pub fn evict_idle(&mut self, frame_idx: u64) -> usize {
        let max_idle = self.policy.max_idle_frames;
        let before = self.trajectories.len();

        self.trajectories
            .retain(|_, t| frame_idx.saturating_sub(t.last_seen) <= max_idle);

        let evicted = before - self.trajectories.len();
        if evicted > 0 {
            trace!("evicted {} idle trajectories at frame {}", evicted, frame_idx);
        }

        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f32, y: f32) -> na::Point2<f32> {
        na::Point2::new(x, y)
    }

    #[test]
    fn single_sample_is_insufficient() {
        let mut store = TrajectoryStore::new(RetentionPolicy::default()).unwrap();
        store.record(7, pt(100.0, 250.0), 0);

        assert!(store.last_two(7).is_none());
        assert!(store.last_two(8).is_none());
        assert_eq!(store.samples(7), 1);
    }

    #[test]
    fn last_two_follows_frame_order() {
        let mut store = TrajectoryStore::new(RetentionPolicy::default()).unwrap();
        store.record(7, pt(100.0, 250.0), 0);
        store.record(7, pt(100.0, 310.0), 1);
        store.record(7, pt(100.0, 350.0), 2);

        assert_eq!(store.last_two(7), Some((pt(100.0, 310.0), pt(100.0, 350.0))));
        assert_eq!(store.samples(7), 3);
        assert_eq!(store.points(7).count(), 2);
    }

    #[test]
    fn longer_history_is_kept_when_configured() {
        let policy = RetentionPolicy {
            capacity: 8,
            ..Default::default()
        };
        let mut store = TrajectoryStore::new(policy).unwrap();
        for i in 0..5 {
            store.record(1, pt(i as f32, 0.0), i);
        }

        assert_eq!(store.points(1).count(), 5);
    }

    #[test]
    fn idle_identities_are_evicted() {
        let policy = RetentionPolicy {
            capacity: 2,
            max_idle_frames: 3,
        };
        let mut store = TrajectoryStore::new(policy).unwrap();
        store.record(1, pt(0.0, 0.0), 0);
        store.record(2, pt(0.0, 0.0), 2);

        assert_eq!(store.evict_idle(3), 0);
        assert_eq!(store.evict_idle(4), 1);
        assert!(!store.contains(1));
        assert!(store.contains(2));
    }

    #[test]
    fn capacity_below_two_is_rejected() {
        let policy = RetentionPolicy {
            capacity: 1,
            ..Default::default()
        };

        assert!(TrajectoryStore::new(policy).is_err());
    }
}
