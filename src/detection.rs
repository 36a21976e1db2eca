use log::warn;
use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb, Ltwh};
use crate::error::{Error, Result};

/// Class id of "person" in the COCO label set
pub const PERSON_CLASS: i32 = 0;

/// Single detector output: box in frame pixels, score and class id
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BBox<Ltrb>,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(rename = "c")]
    pub class: i32,
}

impl Detection {
    pub fn new(bbox: BBox<Ltrb>, confidence: f32, class: i32) -> Result<Self> {
        let det = Self {
            bbox,
            confidence,
            class,
        };
        det.validate()?;

        Ok(det)
    }

    pub fn validate(&self) -> Result<()> {
        self.bbox.validate()?;

        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::MalformedDetection(format!(
                "confidence {} outside of [0, 1]",
                self.confidence
            )));
        }

        Ok(())
    }

    #[inline]
    pub fn iou(&self, other: &Detection) -> f32 {
        self.bbox.iou(&other.bbox)
    }

    #[inline(always)]
    pub fn centroid(&self) -> na::Point2<f32> {
        self.bbox.centroid()
    }

    #[inline(always)]
    pub fn ltwh(&self) -> BBox<Ltwh> {
        self.bbox.as_ltwh()
    }
}

/// Keeps detections of accepted classes scoring above the threshold
#[derive(Debug, Clone)]
pub struct DetectionFilter {
    classes: Vec<i32>,
    confidence_threshold: f32,
}

impl DetectionFilter {
    pub fn new(classes: Vec<i32>, confidence_threshold: f32) -> Result<Self> {
        if classes.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one target class is required".into(),
            ));
        }

        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(Error::InvalidConfig(format!(
                "confidence threshold {} outside of [0, 1]",
                confidence_threshold
            )));
        }

        Ok(Self {
            classes,
            confidence_threshold,
        })
    }

    #[inline]
    pub fn classes(&self) -> &[i32] {
        &self.classes
    }

    #[inline]
    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    #[inline]
    pub fn accepts(&self, det: &Detection) -> bool {
        self.classes.contains(&det.class) && det.confidence > self.confidence_threshold
    }

    pub fn apply(&self, detections: Vec<Detection>) -> Vec<Detection> {
        detections
            .into_iter()
            .filter(|det| self.accepts(det))
            .filter(|det| match det.validate() {
                Ok(()) => true,
                Err(err) => {
                    warn!("skipping detection: {}", err);
                    false
                }
            })
            .collect()
    }
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self {
            classes: vec![PERSON_CLASS],
            confidence_threshold: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(conf: f32, class: i32) -> Detection {
        Detection {
            bbox: BBox::ltrb(0.0, 0.0, 10.0, 20.0),
            confidence: conf,
            class,
        }
    }

    #[test]
    fn new_rejects_bad_confidence() {
        let bbox = BBox::ltrb(0.0, 0.0, 10.0, 20.0);

        assert!(Detection::new(bbox, 1.5, 0).is_err());
        assert!(Detection::new(bbox, 0.7, 0).is_ok());
    }

    #[test]
    fn filter_keeps_people_above_threshold() {
        let filter = DetectionFilter::default();
        let kept = filter.apply(vec![det(0.9, 0), det(0.5, 0), det(0.9, 2), det(0.51, 0)]);

        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|d| d.class == PERSON_CLASS && d.confidence > 0.5));
    }

    #[test]
    fn filter_drops_degenerate_boxes() {
        let filter = DetectionFilter::default();
        let mut flat = det(0.9, 0);
        flat.bbox = BBox::ltrb(5.0, 5.0, 5.0, 30.0);

        assert!(filter.apply(vec![flat]).is_empty());
    }

    #[test]
    fn filter_accepts_configured_class_set() {
        let filter = DetectionFilter::new(vec![0, 1], 0.3).unwrap();
        let kept = filter.apply(vec![det(0.4, 1), det(0.4, 0), det(0.4, 5)]);

        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn filter_config_is_validated() {
        assert!(DetectionFilter::new(vec![], 0.5).is_err());
        assert!(DetectionFilter::new(vec![0], -0.1).is_err());
    }
}
