mod compositor;
pub mod raster;
mod text;

pub use compositor::Compositor;
pub use text::FontBook;
