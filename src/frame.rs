use serde_derive::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;

/// Stream properties read once when the source is opened
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct VideoMeta {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

pub trait FrameSource<F> {
    fn meta(&self) -> VideoMeta;

    /// Next frame, or `None` once the stream is drained.
    fn next_frame(&mut self) -> Result<Option<F>>;

    fn release(&mut self) -> Result<()>;
}

pub trait FrameSink<F> {
    fn write(&mut self, frame: &F) -> Result<()>;

    fn release(&mut self) -> Result<()>;
}

impl<F, K: FrameSink<F> + ?Sized> FrameSink<F> for &mut K {
    #[inline]
    fn write(&mut self, frame: &F) -> Result<()> {
        (**self).write(frame)
    }

    #[inline]
    fn release(&mut self) -> Result<()> {
        (**self).release()
    }
}

impl<F, K: FrameSink<F>> FrameSink<F> for Option<K> {
    fn write(&mut self, frame: &F) -> Result<()> {
        match self {
            Some(sink) => sink.write(frame),
            None => Ok(()),
        }
    }

    fn release(&mut self) -> Result<()> {
        match self {
            Some(sink) => sink.release(),
            None => Ok(()),
        }
    }
}

impl<F, A: FrameSink<F>, B: FrameSink<F>> FrameSink<F> for (A, B) {
    fn write(&mut self, frame: &F) -> Result<()> {
        self.0.write(frame)?;
        self.1.write(frame)
    }

    fn release(&mut self) -> Result<()> {
        let first = self.0.release();
        let second = self.1.release();

        first.and(second)
    }
}

/// Cooperative stop flag, checked by the pipeline once per frame
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect(Vec<u8>, bool);

    impl FrameSink<u8> for Collect {
        fn write(&mut self, frame: &u8) -> Result<()> {
            self.0.push(*frame);
            Ok(())
        }

        fn release(&mut self) -> Result<()> {
            self.1 = true;
            Ok(())
        }
    }

    #[test]
    fn paired_sinks_see_every_frame() {
        let mut sink = (Collect::default(), Some(Collect::default()));
        sink.write(&1).unwrap();
        sink.write(&2).unwrap();
        sink.release().unwrap();

        let (a, b) = sink;
        let b = b.unwrap();
        assert_eq!(a.0, vec![1, 2]);
        assert_eq!(b.0, vec![1, 2]);
        assert!(a.1 && b.1);
    }

    #[test]
    fn absent_sink_is_a_no_op() {
        let mut sink: Option<Collect> = None;

        assert!(sink.write(&1).is_ok());
        assert!(sink.release().is_ok());
    }

    #[test]
    fn cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());

        handle.cancel();
        assert!(token.is_cancelled());
    }
}
