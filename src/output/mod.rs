mod loopback;

pub use loopback::V4L2Output;

use crate::frame::OutputFrame;
use anyhow::Result;

/// Trait for output destinations
pub trait OutputSink {
    /// Write a frame to the output, taking ownership of it
    fn write_frame(&mut self, frame: OutputFrame) -> Result<()>;

    /// Get the expected output resolution
    fn resolution(&self) -> (u32, u32);
}
