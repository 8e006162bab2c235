//! Real-time background replacement for webcams, with overlays drawn on top
//! of the composited frame.

pub mod capture;
pub mod error;
pub mod frame;
pub mod output;
pub mod overlay;
pub mod persistence;
pub mod pipeline;
pub mod profile;
pub mod render;
pub mod segmentation;

pub use error::PipelineError;
pub use frame::{Frame, OutputFrame};
pub use pipeline::Pipeline;
