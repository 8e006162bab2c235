use crate::error::PipelineError;
use crate::frame::{Frame, OutputFrame};
use crate::overlay::OverlayStore;
use crate::render::{Compositor, FontBook};
use crate::segmentation::SegmentationEngine;
use image::{DynamicImage, RgbaImage};
use std::sync::Arc;

/// One independent frame pipeline: segmentation, overlays and compositing.
///
/// Without a segmentation engine frames run in passthrough mode: overlays
/// are drawn straight over the camera image.
pub struct Pipeline {
    segmenter: Option<SegmentationEngine>,
    overlays: OverlayStore,
    compositor: Compositor,
    fonts: FontBook,
    frames: u64,
    recovered_failures: u64,
}

impl Pipeline {
    pub fn new(segmenter: Option<SegmentationEngine>, fonts: FontBook) -> Self {
        Self {
            segmenter,
            overlays: OverlayStore::new(),
            compositor: Compositor::new(),
            fonts,
            frames: 0,
            recovered_failures: 0,
        }
    }

    pub fn overlays(&self) -> &OverlayStore {
        &self.overlays
    }

    pub fn overlays_mut(&mut self) -> &mut OverlayStore {
        &mut self.overlays
    }

    pub fn fonts(&self) -> &FontBook {
        &self.fonts
    }

    pub fn segmenter(&self) -> Option<&SegmentationEngine> {
        self.segmenter.as_ref()
    }

    pub fn segmenter_mut(&mut self) -> Option<&mut SegmentationEngine> {
        self.segmenter.as_mut()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Frames passed through unmodified because inference failed.
    pub fn recovered_failures(&self) -> u64 {
        self.recovered_failures
    }

    /// Turn one input frame into exactly one output frame carrying the same
    /// timestamp.
    ///
    /// Inference failures are logged and the input is passed through
    /// unmodified so the stream never stalls; other errors are returned.
    pub fn process(&mut self, frame: Frame) -> Result<OutputFrame, PipelineError> {
        let _span = tracing::debug_span!("process", frame = self.frames + 1).entered();

        let base: Arc<RgbaImage> = match self.segmenter.as_mut() {
            Some(engine) => match engine.predict(&frame.image) {
                Ok(output) => output,
                Err(PipelineError::Inference(err)) => {
                    self.frames += 1;
                    self.recovered_failures += 1;
                    tracing::warn!("Passing frame through unmodified: {}", err);
                    return Ok(OutputFrame::passthrough(frame));
                }
                Err(err) => return Err(err),
            },
            None => Arc::new(DynamicImage::ImageRgb8(frame.image).into_rgba8()),
        };

        self.compositor
            .render(&base, &mut self.overlays, &mut self.fonts);
        self.frames += 1;

        Ok(OutputFrame {
            image: self.compositor.surface().clone(),
            timestamp: frame.timestamp,
        })
    }

    /// Release the model, cached bitmaps and hidden state.
    pub fn shutdown(&mut self) {
        if let Some(engine) = self.segmenter.as_mut() {
            engine.dispose();
        }
        self.overlays.clear();
        tracing::info!(
            "Pipeline stopped after {} frames ({} passed through)",
            self.frames,
            self.recovered_failures
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InferenceError, NotReadyError};
    use crate::overlay::{ImageAsset, ImageOverlay, OverlayKind};
    use crate::segmentation::{EngineConfig, HiddenState, MattingModel, MattingOutput};
    use image::{Rgb, RgbImage, Rgba};
    use ndarray::Array4;
    use std::time::Duration;

    /// Fails on the frames listed; otherwise returns an opaque black person.
    struct FlakyModel {
        calls: u32,
        fail_on: Vec<u32>,
    }

    impl MattingModel for FlakyModel {
        fn infer(
            &mut self,
            src: Array4<f32>,
            _state: &HiddenState,
            _ratio: f32,
        ) -> Result<MattingOutput, InferenceError> {
            self.calls += 1;
            if self.fail_on.contains(&self.calls) {
                return Err(InferenceError("device lost".into()));
            }
            let (h, w) = (src.shape()[2], src.shape()[3]);
            Ok(MattingOutput {
                fgr: Array4::zeros((1, 3, h, w)),
                pha: Array4::ones((1, 1, h, w)),
                state: HiddenState::initial(),
            })
        }
    }

    fn camera_frame(ms: u64) -> Frame {
        Frame::new(
            RgbImage::from_pixel(32, 18, Rgb([200, 100, 50])),
            Duration::from_millis(ms),
        )
    }

    fn pipeline_with(fail_on: Vec<u32>) -> Pipeline {
        let mut engine = SegmentationEngine::new(EngineConfig::default());
        engine.set_model(Box::new(FlakyModel { calls: 0, fail_on }));
        engine
            .background_mut()
            .set_image(RgbaImage::from_pixel(64, 36, Rgba([0, 0, 255, 255])));
        Pipeline::new(Some(engine), FontBook::new())
    }

    #[test]
    fn one_output_per_input_with_same_timestamp() {
        let mut pipeline = pipeline_with(vec![]);
        for ms in [0, 33, 66] {
            let out = pipeline.process(camera_frame(ms)).unwrap();
            assert_eq!(out.timestamp, Duration::from_millis(ms));
            assert_eq!(out.dimensions(), (32, 18));
            assert_eq!(out.image.get_pixel(0, 0).0, [0, 0, 0, 255]);
        }
        assert_eq!(pipeline.frames_processed(), 3);
    }

    #[test]
    fn inference_failure_passes_frame_through() {
        let mut pipeline = pipeline_with(vec![2]);
        let asset = ImageAsset::ready(RgbaImage::from_pixel(1, 1, Rgba([0, 255, 0, 255])));
        pipeline
            .overlays_mut()
            .add("logo", OverlayKind::Image(ImageOverlay::new("l", asset, 0.0, 0.0, 4.0)));

        pipeline.process(camera_frame(0)).unwrap();
        let out = pipeline.process(camera_frame(33)).unwrap();

        // unmodified camera pixels, no overlay
        assert_eq!(out.image.get_pixel(0, 0).0, [200, 100, 50, 255]);
        assert_eq!(out.timestamp, Duration::from_millis(33));
        assert_eq!(pipeline.recovered_failures(), 1);

        let out = pipeline.process(camera_frame(66)).unwrap();
        assert_eq!(out.image.get_pixel(0, 0).0, [0, 255, 0, 255]);
    }

    #[test]
    fn not_ready_is_surfaced() {
        let engine = SegmentationEngine::new(EngineConfig::default());
        let mut pipeline = Pipeline::new(Some(engine), FontBook::new());
        assert!(matches!(
            pipeline.process(camera_frame(0)),
            Err(PipelineError::NotReady(NotReadyError::ModelMissing))
        ));
    }

    #[test]
    fn passthrough_mode_draws_overlays_on_camera_image() {
        let mut pipeline = Pipeline::new(None, FontBook::new());
        let asset = ImageAsset::ready(RgbaImage::from_pixel(1, 1, Rgba([0, 255, 0, 255])));
        pipeline
            .overlays_mut()
            .add("custom", OverlayKind::Image(ImageOverlay::new("i", asset, 10.0, 5.0, 4.0)));

        let out = pipeline.process(camera_frame(5)).unwrap();
        assert_eq!(out.image.get_pixel(0, 0).0, [200, 100, 50, 255]);
        assert_eq!(out.image.get_pixel(11, 6).0, [0, 255, 0, 255]);
    }

    #[test]
    fn pipelines_are_independent() {
        let mut a = pipeline_with(vec![]);
        let b = pipeline_with(vec![]);
        a.overlays_mut().add(
            "custom",
            OverlayKind::Image(ImageOverlay::new("i", ImageAsset::pending(), 0.0, 0.0, 4.0)),
        );
        assert_eq!(a.overlays().len(), 1);
        assert!(b.overlays().is_empty());
    }

    #[test]
    fn shutdown_releases_engine() {
        let mut pipeline = pipeline_with(vec![]);
        pipeline.process(camera_frame(0)).unwrap();
        pipeline.shutdown();
        assert!(!pipeline.segmenter().unwrap().is_ready());
    }
}
