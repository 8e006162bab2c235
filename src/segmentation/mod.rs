mod background;
mod engine;
mod preprocess;
mod rvm;
pub mod types;

pub use background::BackgroundStore;
pub use engine::{BackgroundWatch, EngineConfig, SegmentationEngine};
pub use preprocess::Preprocessor;
pub use rvm::RobustVideoMatting;
pub use types::{HiddenState, MattingModel, MattingOutput};
