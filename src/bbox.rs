use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

use crate::error::{Error, Result};

pub trait BBoxFormat: std::fmt::Debug {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// Left-top-width-height format, contains left top corner and width-height
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltwh;
impl BBoxFormat for Ltwh {}

/// X-y-width-height format, contains coordinates of the center of bbox and width-height
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Xywh;
impl BBoxFormat for Xywh {}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(bound = "")]
pub struct BBox<F: BBoxFormat>([f32; 4], PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [f32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }
}

impl BBox<Ltrb> {
    /// Builds a box without checking it; see [`BBox::try_ltrb`].
    #[inline]
    pub fn ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        BBox([left, top, right, bottom], PhantomData)
    }

    /// Builds a box, rejecting non-finite, inverted and zero-area corners.
    pub fn try_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Result<Self> {
        let bbox = Self::ltrb(left, top, right, bottom);
        bbox.validate()?;

        Ok(bbox)
    }

    pub fn validate(&self) -> Result<()> {
        let [x1, y1, x2, y2] = self.0;
        let finite = self.0.iter().all(|v| v.is_finite());

        if !finite || x2 <= x1 || y2 <= y1 {
            return Err(Error::MalformedBox { x1, y1, x2, y2 });
        }

        Ok(())
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2] - self.0[0]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3] - self.0[1]
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Midpoint of the box, the point tested against the counting line.
    #[inline]
    pub fn centroid(&self) -> na::Point2<f32> {
        na::Point2::new(
            (self.0[0] + self.0[2]) / 2.0,
            (self.0[1] + self.0[3]) / 2.0,
        )
    }

    pub fn iou(&self, other: &BBox<Ltrb>) -> f32 {
        let i_left = self.left().max(other.left());
        let i_top = self.top().max(other.top());
        let i_right = self.right().min(other.right());
        let i_bottom = self.bottom().min(other.bottom());
        let i_area = (i_right - i_left).max(0.) * (i_bottom - i_top).max(0.);

        let union = self.area() + other.area() - i_area;
        if union <= 0.0 {
            return 0.0;
        }

        i_area / union
    }

    /// Shifts every edge by the matching delta, used to extrapolate motion.
    #[inline]
    pub fn shifted(&self, delta: &[f32; 4]) -> Self {
        BBox(
            [
                self.0[0] + delta[0],
                self.0[1] + delta[1],
                self.0[2] + delta[2],
                self.0[3] + delta[3],
            ],
            PhantomData,
        )
    }

    #[inline]
    pub fn as_ltwh(&self) -> BBox<Ltwh> {
        self.into()
    }
}

impl BBox<Ltwh> {
    #[inline]
    pub fn ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        BBox([left, top, width, height], PhantomData)
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }
}

impl BBox<Xywh> {
    #[inline]
    pub fn xywh(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        BBox([cx, cy, width, height], PhantomData)
    }

    #[inline(always)]
    pub fn cx(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn cy(&self) -> f32 {
        self.0[1]
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }
}

impl<'a> From<&'a BBox<Ltwh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Ltwh>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[0] + v.0[2], v.0[1] + v.0[3]],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Ltwh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[2] - v.0[0], v.0[3] - v.0[1]],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Xywh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Xywh>) -> Self {
        let (hw, hh) = (v.0[2] / 2.0, v.0[3] / 2.0);

        Self(
            [v.0[0] - hw, v.0[1] - hh, v.0[0] + hw, v.0[1] + hh],
            PhantomData,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn centroid_is_box_midpoint() {
        let bbox = BBox::ltrb(80.0, 200.0, 120.0, 300.0);
        let c = bbox.centroid();

        assert_relative_eq!(c.x, 100.0);
        assert_relative_eq!(c.y, 250.0);
    }

    #[test]
    fn rejects_degenerate_boxes() {
        assert!(BBox::try_ltrb(10.0, 10.0, 10.0, 20.0).is_err());
        assert!(BBox::try_ltrb(10.0, 30.0, 20.0, 20.0).is_err());
        assert!(BBox::try_ltrb(f32::NAN, 0.0, 5.0, 5.0).is_err());
        assert!(BBox::try_ltrb(0.0, 0.0, 5.0, 5.0).is_ok());
    }

    #[test]
    fn iou_of_overlapping_boxes() {
        let a = BBox::ltrb(0.0, 0.0, 10.0, 10.0);
        let b = BBox::ltrb(5.0, 0.0, 15.0, 10.0);

        assert_relative_eq!(a.iou(&a), 1.0);
        assert_relative_eq!(a.iou(&b), 50.0 / 150.0);
        assert_relative_eq!(a.iou(&BBox::ltrb(20.0, 20.0, 30.0, 30.0)), 0.0);
    }

    #[test]
    fn format_conversions() {
        let ltrb = BBox::xywh(50.0, 40.0, 20.0, 10.0).as_ltrb();
        assert_eq!(ltrb.as_slice(), &[40.0, 35.0, 60.0, 45.0]);

        let ltwh = ltrb.as_ltwh();
        assert_eq!(ltwh.as_slice(), &[40.0, 35.0, 20.0, 10.0]);
        assert_eq!(ltwh.as_ltrb(), ltrb);
    }
}
