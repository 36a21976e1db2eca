use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Track {
    pub track_id: u32,
    pub bbox: BBox<Ltrb>,
    pub confirmed: bool,
    pub class: i32,
    pub confidence: f32,

    // consecutive frames matched since creation
    pub hits: u32,
    pub time_since_update: u32,
}

impl Track {
    #[inline]
    pub fn centroid(&self) -> na::Point2<f32> {
        self.bbox.centroid()
    }

    #[inline]
    pub fn label(&self) -> String {
        format!("ID {}", self.track_id)
    }
}
