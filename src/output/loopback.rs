use super::OutputSink;
use crate::frame::OutputFrame;
use anyhow::{Context, Result};
use image::RgbaImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

pub struct V4L2Output {
    file: File,
    width: u32,
    height: u32,
    yuyv: Vec<u8>,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        // Announce the frame format so readers see YUYV at our size
        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;
        let requested = Format::new(width, height, FourCC::new(b"YUYV"));
        match Output::set_format(&device, &requested) {
            Ok(format) => tracing::debug!("Output format: {}", format),
            Err(err) => tracing::warn!("Could not set output format, writing anyway: {}", err),
        }

        // v4l2loopback accepts raw frame data written to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            file,
            width,
            height,
            yuyv: Vec::with_capacity((width * height * 2) as usize),
        })
    }
}

/// Convert an RGBA frame to YUV422 (YUYV), ignoring alpha. Odd widths
/// repeat the last pixel.
fn rgba_to_yuyv(image: &RgbaImage, out: &mut Vec<u8>) {
    let (width, height) = image.dimensions();
    out.clear();
    out.reserve((width.div_ceil(2) * 4 * height) as usize);

    for y in 0..height {
        for x in (0..width).step_by(2) {
            let p1 = image.get_pixel(x, y);
            let p2 = if x + 1 < width {
                image.get_pixel(x + 1, y)
            } else {
                p1
            };

            let (y1, u1, v1) = rgb_to_yuv(p1[0], p1[1], p1[2]);
            let (y2, u2, v2) = rgb_to_yuv(p2[0], p2[1], p2[2]);

            // Chroma is shared by the pixel pair
            let u = ((u1 as u16 + u2 as u16) / 2) as u8;
            let v = ((v1 as u16 + v2 as u16) / 2) as u8;

            out.extend_from_slice(&[y1, u, y2, v]);
        }
    }
}

/// BT.601 RGB to YUV
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (r as f32, g as f32, b as f32);

    let y = (0.299 * r + 0.587 * g + 0.114 * b).round().clamp(0.0, 255.0) as u8;
    let u = (-0.147 * r - 0.289 * g + 0.436 * b + 128.0).round().clamp(0.0, 255.0) as u8;
    let v = (0.615 * r - 0.515 * g - 0.100 * b + 128.0).round().clamp(0.0, 255.0) as u8;

    (y, u, v)
}

impl OutputSink for V4L2Output {
    fn write_frame(&mut self, frame: OutputFrame) -> Result<()> {
        let image = if frame.dimensions() != (self.width, self.height) {
            image::imageops::resize(
                &frame.image,
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            )
        } else {
            frame.image
        };

        rgba_to_yuyv(&image, &mut self.yuyv);

        self.file
            .write_all(&self.yuyv)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
