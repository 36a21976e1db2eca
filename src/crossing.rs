use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::frame::VideoMeta;

/// Which coordinate the counting line splits the frame by
#[derive(Serialize, Deserialize, clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Line at `y = offset`, spanning the frame width
    Horizontal,
    /// Line at `x = offset`, spanning the frame height
    Vertical,
}

/// Movement along the split axis that counts as an entry
#[derive(Serialize, Deserialize, clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    /// Downward for a horizontal line, rightward for a vertical one
    Increasing,
    Decreasing,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    Entry,
    Exit,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CountingLine {
    pub orientation: Orientation,
    pub offset: f32,
    pub entry: EntryDirection,
}

impl CountingLine {
    pub fn new(orientation: Orientation, offset: f32) -> Self {
        Self {
            orientation,
            offset,
            entry: EntryDirection::Increasing,
        }
    }

    /// Line through the middle of the frame along the split axis.
    pub fn midpoint(orientation: Orientation, meta: &VideoMeta) -> Self {
        let offset = match orientation {
            Orientation::Horizontal => (meta.height / 2) as f32,
            Orientation::Vertical => (meta.width / 2) as f32,
        };

        Self::new(orientation, offset)
    }

    pub fn with_entry_direction(mut self, entry: EntryDirection) -> Self {
        self.entry = entry;
        self
    }

    #[inline(always)]
    pub fn coordinate(&self, p: &na::Point2<f32>) -> f32 {
        match self.orientation {
            Orientation::Horizontal => p.y,
            Orientation::Vertical => p.x,
        }
    }

    /// End points of the line clipped to a `width` x `height` frame.
    pub fn endpoints(&self, width: u32, height: u32) -> (na::Point2<f32>, na::Point2<f32>) {
        match self.orientation {
            Orientation::Horizontal => (
                na::Point2::new(0.0, self.offset),
                na::Point2::new(width as f32, self.offset),
            ),
            Orientation::Vertical => (
                na::Point2::new(self.offset, 0.0),
                na::Point2::new(self.offset, height as f32),
            ),
        }
    }
}

/// Tests one step of a trajectory against the line.
///
/// Moving with increasing coordinate crosses when `prev < offset <= curr`,
/// moving with decreasing coordinate when `prev > offset >= curr`. The two are
/// mutually exclusive, and a point resting on the line produces nothing until it
/// leaves and comes back from a strict side.
pub fn crossing(
    prev: &na::Point2<f32>,
    curr: &na::Point2<f32>,
    line: &CountingLine,
) -> Option<Crossing> {
    let (a, b, l) = (line.coordinate(prev), line.coordinate(curr), line.offset);

    let increasing = a < l && l <= b;
    let decreasing = a > l && l >= b;

    match (increasing, decreasing, line.entry) {
        (true, _, EntryDirection::Increasing) | (_, true, EntryDirection::Decreasing) => {
            Some(Crossing::Entry)
        }
        (true, _, EntryDirection::Decreasing) | (_, true, EntryDirection::Increasing) => {
            Some(Crossing::Exit)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f32, y: f32) -> na::Point2<f32> {
        na::Point2::new(x, y)
    }

    fn horizontal(offset: f32) -> CountingLine {
        CountingLine::new(Orientation::Horizontal, offset)
    }

    #[test]
    fn downward_crossing_is_entry() {
        let line = horizontal(300.0);

        assert_eq!(crossing(&pt(100.0, 250.0), &pt(100.0, 310.0), &line), Some(Crossing::Entry));
        assert_eq!(crossing(&pt(100.0, 310.0), &pt(100.0, 350.0), &line), None);
    }

    #[test]
    fn upward_crossing_is_exit() {
        let line = horizontal(300.0);

        assert_eq!(crossing(&pt(100.0, 350.0), &pt(100.0, 280.0), &line), Some(Crossing::Exit));
    }

    #[test]
    fn same_side_never_crosses() {
        let line = horizontal(300.0);

        assert_eq!(crossing(&pt(0.0, 10.0), &pt(0.0, 290.0), &line), None);
        assert_eq!(crossing(&pt(0.0, 400.0), &pt(0.0, 301.0), &line), None);
    }

    #[test]
    fn landing_on_line_counts_once() {
        let line = horizontal(300.0);
        let steps = [pt(0.0, 290.0), pt(0.0, 300.0), pt(0.0, 300.0), pt(0.0, 300.0), pt(0.0, 320.0)];

        let events: Vec<_> = steps
            .windows(2)
            .filter_map(|w| crossing(&w[0], &w[1], &line))
            .collect();

        assert_eq!(events, vec![Crossing::Entry]);
    }

    #[test]
    fn vertical_line_uses_x() {
        let line = CountingLine::new(Orientation::Vertical, 50.0);

        assert_eq!(crossing(&pt(40.0, 0.0), &pt(60.0, 900.0), &line), Some(Crossing::Entry));
        assert_eq!(crossing(&pt(60.0, 0.0), &pt(50.0, 0.0), &line), Some(Crossing::Exit));
        assert_eq!(crossing(&pt(10.0, 0.0), &pt(10.0, 900.0), &line), None);
    }

    #[test]
    fn entry_direction_can_be_flipped() {
        let line = horizontal(300.0).with_entry_direction(EntryDirection::Decreasing);

        assert_eq!(crossing(&pt(0.0, 250.0), &pt(0.0, 310.0), &line), Some(Crossing::Exit));
        assert_eq!(crossing(&pt(0.0, 350.0), &pt(0.0, 280.0), &line), Some(Crossing::Entry));
    }

    #[test]
    fn midpoint_line_from_meta() {
        let meta = VideoMeta {
            width: 1281,
            height: 721,
            fps: 25.0,
        };

        assert_eq!(CountingLine::midpoint(Orientation::Horizontal, &meta).offset, 360.0);
        assert_eq!(CountingLine::midpoint(Orientation::Vertical, &meta).offset, 640.0);
    }
}
