mod v4l_capture;

pub use v4l_capture::WebcamCapture;

use crate::frame::Frame;
use anyhow::Result;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Capture the next frame, stamped relative to the start of the stream
    fn capture_frame(&mut self) -> Result<Frame>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);
}
