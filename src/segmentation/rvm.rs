use super::types::{HiddenState, MattingModel, MattingOutput};
use crate::error::{InferenceError, ModelLoadError};
use ndarray::{Array4, Ix4};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionOutputs};
use ort::value::Tensor;
use std::fmt::Display;
use std::path::Path;

/// RobustVideoMatting segmentation model
///
/// This model uses recurrent connections to maintain temporal consistency.
/// Hidden states (r1-r4) are owned by the caller and passed in on every
/// frame; the updated states come back in [`MattingOutput`].
///
/// Graph contract:
/// - inputs: `src`, `r1i`..`r4i`, `downsample_ratio`
/// - outputs: `fgr`, `pha`, `r1o`..`r4o`
pub struct RobustVideoMatting {
    session: Session,
}

impl RobustVideoMatting {
    /// Create a new RVM model from an ONNX file
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self, ModelLoadError> {
        let path = model_path.as_ref();

        tracing::info!("Loading RVM model from {}", path.display());

        let builder = Session::builder()
            .map_err(|e| load_error(path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error(path, e))?
            .with_intra_threads(4)
            .map_err(|e| load_error(path, e))?;

        #[cfg(feature = "cuda")]
        let builder = builder
            .with_execution_providers([
                ort::execution_providers::TensorRTExecutionProvider::default().build(),
                ort::execution_providers::CUDAExecutionProvider::default().build(),
            ])
            .map_err(|e| load_error(path, e))?;

        let session = builder
            .commit_from_file(path)
            .map_err(|e| load_error(path, e))?;

        tracing::info!("RVM model loaded successfully");

        Ok(Self { session })
    }
}

fn load_error(path: &Path, err: impl Display) -> ModelLoadError {
    ModelLoadError {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn inference_error(err: impl Display) -> InferenceError {
    InferenceError(err.to_string())
}

fn extract(outputs: &SessionOutputs, name: &str) -> Result<Array4<f32>, InferenceError> {
    let value = outputs
        .get(name)
        .ok_or_else(|| InferenceError(format!("model produced no `{}` output", name)))?;

    value
        .try_extract_array::<f32>()
        .map_err(inference_error)?
        .to_owned()
        .into_dimensionality::<Ix4>()
        .map_err(inference_error)
}

impl MattingModel for RobustVideoMatting {
    fn infer(
        &mut self,
        src: Array4<f32>,
        state: &HiddenState,
        downsample_ratio: f32,
    ) -> Result<MattingOutput, InferenceError> {
        let _span = tracing::debug_span!("inference").entered();

        let inputs = ort::inputs![
            "src" => Tensor::from_array(src).map_err(inference_error)?,
            "r1i" => Tensor::from_array(state.r1.clone()).map_err(inference_error)?,
            "r2i" => Tensor::from_array(state.r2.clone()).map_err(inference_error)?,
            "r3i" => Tensor::from_array(state.r3.clone()).map_err(inference_error)?,
            "r4i" => Tensor::from_array(state.r4.clone()).map_err(inference_error)?,
            "downsample_ratio" => Tensor::from_array(([1usize], vec![downsample_ratio]))
                .map_err(inference_error)?,
        ];

        let outputs = self.session.run(inputs).map_err(inference_error)?;

        Ok(MattingOutput {
            fgr: extract(&outputs, "fgr")?,
            pha: extract(&outputs, "pha")?,
            state: HiddenState {
                r1: extract(&outputs, "r1o")?,
                r2: extract(&outputs, "r2o")?,
                r3: extract(&outputs, "r3o")?,
                r4: extract(&outputs, "r4o")?,
            },
        })
    }

    fn name(&self) -> &str {
        "robust-video-matting"
    }
}
