//! The boundary between an external detector and the tracking core.

use std::convert::Infallible;

use crossbeam_channel::Receiver;

use crate::tracker::{Detection, Frame};

/// A per-session stream of detector output.
///
/// Implement this to connect any detector (a model running on another
/// thread, a file of precomputed detections, a network feed) to the
/// pipeline. Frames should arrive in non-decreasing index order; `Ok(None)`
/// ends the stream.
///
/// # Example
///
/// ```ignore
/// use trackflow_rs::{DetectionSource, Frame};
///
/// struct CsvDetections {
///     // reader state
/// }
///
/// impl DetectionSource for CsvDetections {
///     type Error = std::io::Error;
///
///     fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
///         // Parse the next frame's rows
///         Ok(None)
///     }
/// }
/// ```
pub trait DetectionSource {
    /// Error type for detector or transport failures.
    type Error;

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error>;
}

/// Helper trait for converting model-specific outputs to `Detection`s.
pub trait IntoDetections {
    fn into_detections(self) -> Vec<Detection>;
}

impl IntoDetections for Vec<Detection> {
    fn into_detections(self) -> Vec<Detection> {
        self
    }
}

/// Replays frames held in memory. Restartable with [`VecSource::rewind`].
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    frames: Vec<Frame>,
    cursor: usize,
}

impl VecSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames, cursor: 0 }
    }

    /// Build frames from per-frame detector output at a constant frame rate.
    pub fn from_detections<I, D>(fps: f64, frames: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: IntoDetections,
    {
        let frames = frames
            .into_iter()
            .enumerate()
            .map(|(i, detections)| Frame::at_rate(i as u64, fps, detections.into_detections()))
            .collect();
        Self::new(frames)
    }

    /// Start again from the first frame.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl DetectionSource for VecSource {
    type Error = Infallible;

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        let frame = self.frames.get(self.cursor).cloned();
        if frame.is_some() {
            self.cursor += 1;
        }
        Ok(frame)
    }
}

/// Frames pushed by a detector running on another thread through a bounded
/// queue. The stream ends once every sender is dropped.
#[derive(Debug, Clone)]
pub struct ChannelSource {
    rx: Receiver<Frame>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<Frame>) -> Self {
        Self { rx }
    }
}

impl DetectionSource for ChannelSource {
    type Error = Infallible;

    fn next_frame(&mut self) -> Result<Option<Frame>, Self::Error> {
        Ok(self.rx.recv().ok())
    }
}
