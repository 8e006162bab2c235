use crate::error::InferenceError;
use image::{imageops, Rgba, RgbImage, RgbaImage};
use ndarray::Array4;

/// Preprocessor for converting RGB frames to model input tensors and model
/// outputs back to images
pub struct Preprocessor {
    target_size: Option<(u32, u32)>,
}

impl Preprocessor {
    /// `target_size` of `None` feeds frames at their native resolution.
    pub fn new(target_size: Option<(u32, u32)>) -> Self {
        Self { target_size }
    }

    /// Preprocess an RGB image into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Resize to the target dimensions, if configured
    /// 2. Convert to float and normalize to [0, 1]
    /// 3. Transpose from HWC to NCHW format
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized;
        let source = match self.target_size {
            Some((w, h)) if image.dimensions() != (w, h) => {
                resized = imageops::resize(image, w, h, imageops::FilterType::Triangle);
                &resized
            }
            _ => image,
        };

        let (width, height) = source.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in source.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            tensor[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
            tensor[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
            tensor[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
        }

        tensor
    }

    /// Merge foreground color and alpha into one RGBA image, resized back to
    /// the frame dimensions when the model ran at a different size.
    ///
    /// Every channel is `value * 255` clamped to [0, 255].
    pub fn postprocess(
        &self,
        fgr: &Array4<f32>,
        pha: &Array4<f32>,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<RgbaImage, InferenceError> {
        let _span = tracing::debug_span!("postprocess").entered();

        let fgr_shape = fgr.shape();
        let pha_shape = pha.shape();
        if fgr_shape[1] != 3 || pha_shape[1] != 1 || fgr_shape[2..] != pha_shape[2..] {
            return Err(InferenceError(format!(
                "unexpected output shapes fgr={:?} pha={:?}",
                fgr_shape, pha_shape
            )));
        }

        let height = fgr_shape[2];
        let width = fgr_shape[3];
        let to_u8 = |v: f32| (v * 255.0).clamp(0.0, 255.0) as u8;

        let rgba = RgbaImage::from_fn(width as u32, height as u32, |x, y| {
            let (x, y) = (x as usize, y as usize);
            Rgba([
                to_u8(fgr[[0, 0, y, x]]),
                to_u8(fgr[[0, 1, y, x]]),
                to_u8(fgr[[0, 2, y, x]]),
                to_u8(pha[[0, 0, y, x]]),
            ])
        });

        if rgba.dimensions() == (frame_width, frame_height) {
            Ok(rgba)
        } else {
            Ok(imageops::resize(
                &rgba,
                frame_width,
                frame_height,
                imageops::FilterType::Triangle,
            ))
        }
    }
}
