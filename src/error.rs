use std::path::PathBuf;
use thiserror::Error;

/// The matting model could not be fetched or parsed. Fatal to the engine
/// until `load_model` is retried.
#[derive(Debug, Error)]
#[error("failed to load matting model from {path}: {reason}")]
pub struct ModelLoadError {
    pub path: PathBuf,
    pub reason: String,
}

/// A background image could not be read or decoded. The engine keeps the
/// previously loaded background.
#[derive(Debug, Error)]
#[error("failed to load background from {path}: {reason}")]
pub struct BackgroundLoadError {
    pub path: PathBuf,
    pub reason: String,
}

/// `predict` was called before both a model and a background were loaded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotReadyError {
    #[error("model not loaded")]
    ModelMissing,
    #[error("background not set")]
    BackgroundMissing,
}

/// The model failed while running on a frame.
#[derive(Debug, Error)]
#[error("inference failed: {0}")]
pub struct InferenceError(pub String);

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),

    #[error(transparent)]
    BackgroundLoad(#[from] BackgroundLoadError),

    #[error(transparent)]
    NotReady(#[from] NotReadyError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Errors from the background file library.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("no image data provided")]
    EmptyPayload,

    #[error("invalid base64 image data: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),

    #[error("preset {0:?} not found")]
    PresetNotFound(String),

    #[error("invalid preset name {0:?}")]
    InvalidPresetName(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
