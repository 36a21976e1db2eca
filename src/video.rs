use log::{info, warn};
use opencv::{
    core::{self, Mat},
    highgui,
    prelude::*,
    videoio,
};
use std::path::Path;

use crate::error::{Error, Result};
use crate::frame::{CancelToken, FrameSink, FrameSource, VideoMeta};

const KEY_ESC: i32 = 27;
const KEY_QUIT: i32 = b'q' as i32;

/// Video file opened through OpenCV
pub struct VideoSource {
    cam: videoio::VideoCapture,
    meta: VideoMeta,
}

impl VideoSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().into_owned();

        let cam = videoio::VideoCapture::from_file(&path, videoio::CAP_ANY)
            .map_err(|err| Error::SourceUnavailable(format!("{}: {}", path, err)))?;

        if !cam.is_opened()? {
            return Err(Error::SourceUnavailable(path));
        }

        let meta = VideoMeta {
            width: cam.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32,
            height: cam.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32,
            fps: cam.get(videoio::CAP_PROP_FPS)?,
        };

        info!(
            "opened {}: {}x{} @ {:.2} fps, {} frames",
            path,
            meta.width,
            meta.height,
            meta.fps,
            cam.get(videoio::CAP_PROP_FRAME_COUNT)? as i64
        );

        Ok(Self { cam, meta })
    }
}

impl FrameSource<Mat> for VideoSource {
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    fn next_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.cam.read(&mut frame)? {
            return Ok(None);
        }

        if frame.cols() == 0 || frame.rows() == 0 {
            return Ok(None);
        }

        Ok(Some(frame))
    }

    fn release(&mut self) -> Result<()> {
        self.cam.release()?;
        Ok(())
    }
}

/// `mp4v` encoded output at the source size and frame rate
pub struct VideoWriter {
    writer: Option<videoio::VideoWriter>,
    out_file: String,
}

impl VideoWriter {
    pub fn create<P: AsRef<Path>>(out_file: P, meta: &VideoMeta) -> Result<Self> {
        let out_file = out_file.as_ref().to_string_lossy().into_owned();

        // some containers report 0 fps, fall back to a sane rate
        let fps = if meta.fps > 0.0 { meta.fps } else { 25.0 };

        let writer = videoio::VideoWriter::new(
            &out_file,
            videoio::VideoWriter::fourcc('m', 'p', '4', 'v')?,
            fps,
            core::Size::new(meta.width as i32, meta.height as i32),
            true,
        )
        .map_err(|err| Error::SinkUnavailable(format!("{}: {}", out_file, err)))?;

        if !writer.is_opened()? {
            return Err(Error::SinkUnavailable(out_file));
        }

        Ok(Self {
            writer: Some(writer),
            out_file,
        })
    }
}

impl FrameSink<Mat> for VideoWriter {
    fn write(&mut self, frame: &Mat) -> Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(frame)?,
            None => warn!("frame dropped, {} already released", self.out_file),
        }

        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.release()?;
            info!("saved {}", self.out_file);
        }

        Ok(())
    }
}

/// Live preview window. Polls the keyboard after each frame and fires the
/// cancel token on `q` or Esc.
pub struct Display {
    window: String,
    cancel: CancelToken,
}

impl Display {
    pub fn new<S: ToString>(window: S, cancel: CancelToken) -> Result<Self> {
        let window = window.to_string();
        highgui::named_window(&window, highgui::WINDOW_AUTOSIZE)?;

        Ok(Self { window, cancel })
    }
}

impl FrameSink<Mat> for Display {
    fn write(&mut self, frame: &Mat) -> Result<()> {
        highgui::imshow(&self.window, frame)?;

        let key = highgui::wait_key(1)? & 0xFF;
        if key == KEY_QUIT || key == KEY_ESC {
            self.cancel.cancel();
        }

        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        highgui::destroy_all_windows()?;
        Ok(())
    }
}
