use crate::error::InferenceError;
use ndarray::Array4;

/// Recurrent memory of the matting model.
///
/// Four buffers fed back into the next inference so temporal context (motion,
/// the previous matte) informs the next frame. Replaced in full after every
/// successful inference.
#[derive(Debug, Clone)]
pub struct HiddenState {
    pub r1: Array4<f32>,
    pub r2: Array4<f32>,
    pub r3: Array4<f32>,
    pub r4: Array4<f32>,
}

impl HiddenState {
    /// Zeroed `[1, 1, 1, 1]` buffers; the model broadcasts them up to its
    /// internal resolution on the first frame.
    pub fn initial() -> Self {
        Self {
            r1: Array4::zeros((1, 1, 1, 1)),
            r2: Array4::zeros((1, 1, 1, 1)),
            r3: Array4::zeros((1, 1, 1, 1)),
            r4: Array4::zeros((1, 1, 1, 1)),
        }
    }
}

impl Default for HiddenState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Result of one model invocation.
pub struct MattingOutput {
    /// Foreground color, shape `[1, 3, H, W]`, values nominally in [0, 1]
    pub fgr: Array4<f32>,
    /// Alpha matte, shape `[1, 1, H, W]`, 0.0 = background, 1.0 = foreground
    pub pha: Array4<f32>,
    /// Updated recurrent state for the next frame
    pub state: HiddenState,
}

/// Trait for recurrent matting models
/// Allows swapping between different backends (RVM over ONNX Runtime, test doubles, ...)
pub trait MattingModel {
    /// Run the model on one frame.
    ///
    /// # Arguments
    /// * `src` - Input frame as an NCHW tensor normalized to [0, 1]
    /// * `state` - Hidden state from the previous inference
    /// * `downsample_ratio` - Internal downsampling applied by the model
    fn infer(
        &mut self,
        src: Array4<f32>,
        state: &HiddenState,
        downsample_ratio: f32,
    ) -> Result<MattingOutput, InferenceError>;

    /// Human readable backend name for logs
    fn name(&self) -> &str {
        "matting-model"
    }
}
