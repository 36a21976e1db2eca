use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
};

use crate::counter::Counter;
use crate::crossing::CountingLine;
use crate::error::Result;
use crate::{Rendering, Track};

/// Draws boxes, identities, the counting line and the totals banner.
#[derive(Debug, Clone)]
pub struct Drawer {
    pub box_color: core::Scalar,
    pub label_color: core::Scalar,
    pub line_color: core::Scalar,
    pub totals_color: core::Scalar,
}

impl Default for Drawer {
    fn default() -> Self {
        // BGR
        Self {
            box_color: core::Scalar::new(0.0, 255.0, 0.0, 0.0),
            label_color: core::Scalar::new(255.0, 255.0, 255.0, 0.0),
            line_color: core::Scalar::new(0.0, 0.0, 255.0, 0.0),
            totals_color: core::Scalar::new(0.0, 255.0, 255.0, 0.0),
        }
    }
}

impl Rendering<Mat> for Drawer {
    fn draw_track(&mut self, frame: &mut Mat, track: &Track) -> Result<()> {
        let bbox = track.bbox;
        let rect = core::Rect::new(
            bbox.left() as i32,
            bbox.top() as i32,
            bbox.width() as i32,
            bbox.height() as i32,
        );

        imgproc::rectangle(frame, rect, self.box_color, 2, imgproc::LINE_8, 0)?;

        imgproc::put_text(
            frame,
            &track.label(),
            core::Point::new(bbox.left() as i32, bbox.top() as i32 - 5),
            imgproc::FONT_HERSHEY_SIMPLEX,
            0.6,
            self.label_color,
            2,
            imgproc::LINE_AA,
            false,
        )?;

        Ok(())
    }

    fn draw_overlay(&mut self, frame: &mut Mat, line: &CountingLine, counter: &Counter) -> Result<()> {
        let (a, b) = line.endpoints(frame.cols() as u32, frame.rows() as u32);

        imgproc::line(
            frame,
            core::Point::new(a.x as i32, a.y as i32),
            core::Point::new(b.x as i32, b.y as i32),
            self.line_color,
            2,
            imgproc::LINE_8,
            0,
        )?;

        imgproc::put_text(
            frame,
            &counter.summary(),
            core::Point::new(20, 40),
            imgproc::FONT_HERSHEY_SIMPLEX,
            1.0,
            self.totals_color,
            3,
            imgproc::LINE_AA,
            false,
        )?;

        Ok(())
    }
}
