use super::background::BackgroundStore;
use super::preprocess::Preprocessor;
use super::rvm::RobustVideoMatting;
use super::types::{HiddenState, MattingModel};
use crate::error::{BackgroundLoadError, ModelLoadError, NotReadyError, PipelineError};
use image::{imageops, RgbImage, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Background file polled for changes before each inference.
#[derive(Debug, Clone)]
pub struct BackgroundWatch {
    pub path: PathBuf,
    pub min_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Internal downsampling applied by the model
    pub downsample_ratio: f32,
    /// Run inference on every Nth frame only; 0 disables skipping
    pub frame_skip: u32,
    /// Resize frames to this size before inference; `None` keeps native size
    pub input_size: Option<(u32, u32)>,
    pub background_watch: Option<BackgroundWatch>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            downsample_ratio: 0.4,
            frame_skip: 0,
            input_size: None,
            background_watch: None,
        }
    }
}

/// Stateful matting engine: model, recurrent state, background and the last
/// composited output.
pub struct SegmentationEngine {
    config: EngineConfig,
    model: Option<Box<dyn MattingModel>>,
    preprocessor: Preprocessor,
    state: HiddenState,
    background: BackgroundStore,
    frame_count: u64,
    inference_count: u64,
    last_output: Option<Arc<RgbaImage>>,
}

impl SegmentationEngine {
    pub fn new(config: EngineConfig) -> Self {
        let preprocessor = Preprocessor::new(config.input_size);
        Self {
            config,
            model: None,
            preprocessor,
            state: HiddenState::initial(),
            background: BackgroundStore::new(),
            frame_count: 0,
            inference_count: 0,
            last_output: None,
        }
    }

    /// Load the RVM ONNX graph at `path`.
    pub fn load_model<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ModelLoadError> {
        let model = RobustVideoMatting::new(path)?;
        self.set_model(Box::new(model));
        Ok(())
    }

    /// Install a model, starting from fresh recurrent state.
    pub fn set_model(&mut self, model: Box<dyn MattingModel>) {
        tracing::info!("Matting model ready: {}", model.name());
        self.model = Some(model);
        self.reset_state();
    }

    pub fn set_background<P: AsRef<Path>>(&mut self, path: P) -> Result<(), BackgroundLoadError> {
        self.background.load(path)
    }

    /// Reload the background unless the last reload was less than
    /// `min_interval` ago. Returns whether a decode happened.
    pub fn reload_background<P: AsRef<Path>>(
        &mut self,
        path: P,
        min_interval: Duration,
    ) -> Result<bool, BackgroundLoadError> {
        self.background.reload(path, min_interval, Instant::now())
    }

    pub fn background(&self) -> &BackgroundStore {
        &self.background
    }

    pub fn background_mut(&mut self) -> &mut BackgroundStore {
        &mut self.background
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn hidden_state(&self) -> &HiddenState {
        &self.state
    }

    pub fn inference_count(&self) -> u64 {
        self.inference_count
    }

    pub fn last_output(&self) -> Option<&Arc<RgbaImage>> {
        self.last_output.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.check_ready().is_ok()
    }

    fn check_ready(&self) -> Result<(), NotReadyError> {
        if self.model.is_none() {
            return Err(NotReadyError::ModelMissing);
        }
        if !self.background.is_loaded() {
            return Err(NotReadyError::BackgroundMissing);
        }
        Ok(())
    }

    /// Matte the person out of `frame` and composite them over the
    /// background.
    ///
    /// With a frame skip of N, frames whose 1-based number is not a multiple
    /// of N reuse the previous output (the very same `Arc`) once one exists.
    pub fn predict(&mut self, frame: &RgbImage) -> Result<Arc<RgbaImage>, PipelineError> {
        let _span = tracing::debug_span!("predict").entered();
        self.check_ready()?;

        self.frame_count += 1;
        let skip = u64::from(self.config.frame_skip);
        if skip > 0 && self.frame_count % skip != 0 {
            if let Some(cached) = &self.last_output {
                return Ok(Arc::clone(cached));
            }
        }

        self.refresh_watched_background();

        let model = self.model.as_mut().ok_or(NotReadyError::ModelMissing)?;
        let src = self.preprocessor.preprocess(frame);
        let output = model.infer(src, &self.state, self.config.downsample_ratio)?;

        self.state = output.state;
        self.inference_count += 1;

        let (width, height) = frame.dimensions();
        let foreground = self
            .preprocessor
            .postprocess(&output.fgr, &output.pha, width, height)?;

        let composited = self.composite(&foreground)?;
        let composited = Arc::new(composited);
        self.last_output = Some(Arc::clone(&composited));
        Ok(composited)
    }

    fn composite(&mut self, foreground: &RgbaImage) -> Result<RgbaImage, NotReadyError> {
        let _span = tracing::debug_span!("composite").entered();
        let (width, height) = foreground.dimensions();

        let mut out = self
            .background
            .fitted(width, height)
            .ok_or(NotReadyError::BackgroundMissing)?
            .clone();
        imageops::overlay(&mut out, foreground, 0, 0);
        Ok(out)
    }

    fn refresh_watched_background(&mut self) {
        let Some(watch) = &self.config.background_watch else {
            return;
        };
        match self
            .background
            .reload(&watch.path, watch.min_interval, Instant::now())
        {
            Ok(true) => tracing::debug!("Watched background refreshed"),
            Ok(false) => {}
            Err(err) => tracing::warn!("Keeping previous background: {}", err),
        }
    }

    /// Reset internal state
    ///
    /// Call this when:
    /// - Switching cameras
    /// - Scene cuts detected
    /// - Starting a new video session
    pub fn reset_state(&mut self) {
        tracing::info!("Resetting matting hidden states");
        self.state = HiddenState::initial();
        self.last_output = None;
        self.frame_count = 0;
    }

    /// Release model, hidden state, background and cached output.
    pub fn dispose(&mut self) {
        tracing::info!("Disposing segmentation engine");
        self.model = None;
        self.state = HiddenState::initial();
        self.background.clear();
        self.last_output = None;
        self.frame_count = 0;
    }
}
