use image::{RgbImage, RgbaImage};
use std::time::Duration;

/// A captured camera frame with its logical timestamp (time since the
/// stream started).
pub struct Frame {
    pub image: RgbImage,
    pub timestamp: Duration,
}

impl Frame {
    pub fn new(image: RgbImage, timestamp: Duration) -> Self {
        Self { image, timestamp }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// One produced frame on its way to the sink.
///
/// The pipeline owns it until it is handed to [`crate::output::OutputSink`];
/// the sink consumes it by value so the buffer is released exactly once.
pub struct OutputFrame {
    pub image: RgbaImage,
    pub timestamp: Duration,
}

impl OutputFrame {
    /// Wrap an unmodified input frame, used when the pipeline passes a frame
    /// through after a recoverable failure.
    pub fn passthrough(frame: Frame) -> Self {
        let image = image::DynamicImage::ImageRgb8(frame.image).into_rgba8();
        Self {
            image,
            timestamp: frame.timestamp,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
