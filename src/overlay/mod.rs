mod asset;
mod color;
pub mod geometry;
mod interaction;
pub mod presets;
mod store;
mod types;

pub use asset::{render_qr, AssetStatus, ImageAsset};
pub use color::{Color, ColorParseError};
pub use geometry::{bounds_of, clamp_drag, hit_test, Point, Rect, Viewport};
pub use interaction::{align_to_corner, Corner, DragSession, ALIGN_MARGIN};
pub use store::OverlayStore;
pub use types::{
    ImageOverlay, Overlay, OverlayId, OverlayKind, OverlayPatch, QrOverlay, ScrollingText,
    StaticText,
};
