use super::CaptureSource;
use crate::frame::Frame;
use anyhow::{Context, Result};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;
use std::time::Instant;

pub struct WebcamCapture {
    camera: Camera,
    started: Instant,
    width: u32,
    height: u32,
}

impl WebcamCapture {
    /// Open the webcam at the closest format to `width`x`height`.
    pub fn new(device_index: u32, width: u32, height: u32) -> Result<Self> {
        tracing::info!(
            "Initializing webcam {} at {}x{}",
            device_index,
            width,
            height
        );

        let index = CameraIndex::Index(device_index);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::HighestResolution(
            Resolution::new(width, height),
        ));

        let mut camera = Camera::new(index, requested).context("Failed to open camera")?;

        camera
            .open_stream()
            .context("Failed to open camera stream")?;

        let negotiated = camera.resolution();
        tracing::info!(
            "Webcam streaming at {}x{}",
            negotiated.width(),
            negotiated.height()
        );

        Ok(Self {
            camera,
            started: Instant::now(),
            width: negotiated.width(),
            height: negotiated.height(),
        })
    }
}

impl CaptureSource for WebcamCapture {
    fn capture_frame(&mut self) -> Result<Frame> {
        let buffer = self.camera.frame().context("Failed to capture frame")?;
        let timestamp = self.started.elapsed();

        let image = buffer
            .decode_image::<RgbFormat>()
            .context("Failed to decode frame")?;

        Ok(Frame::new(image, timestamp))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
