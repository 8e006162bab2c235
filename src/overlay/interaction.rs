use super::geometry::{bounds_of, clamp_drag, hit_test, Point, Viewport, LOGICAL_HEIGHT, LOGICAL_WIDTH};
use super::store::OverlayStore;
use super::types::{Overlay, OverlayId, OverlayPatch};
use crate::render::FontBook;

/// Default distance from the canvas edge for corner alignment.
pub const ALIGN_MARGIN: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Position patch that places the overlay's box `margin` away from `corner`.
pub fn align_to_corner(overlay: &Overlay, corner: Corner, margin: f32, fonts: &FontBook) -> OverlayPatch {
    let bounds = bounds_of(overlay, fonts);
    let right = LOGICAL_WIDTH - bounds.w - margin;
    let bottom = LOGICAL_HEIGHT - bounds.h - margin;
    let (bx, by) = match corner {
        Corner::TopLeft => (margin, margin),
        Corner::TopRight => (right, margin),
        Corner::BottomLeft => (margin, bottom),
        Corner::BottomRight => (right, bottom),
    };
    let (px, py) = overlay.kind.position();
    OverlayPatch::position(bx - (bounds.x - px), by - (bounds.y - py))
}

/// Pointer-driven selection and dragging of overlays.
///
/// Pointer positions are in display space; the session converts them with
/// the viewport it is given.
#[derive(Debug, Default)]
pub struct DragSession {
    selected: Option<OverlayId>,
    dragging: bool,
    // pointer offset from the box origin, logical units
    grab_offset: (f32, f32),
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<OverlayId> {
        self.selected
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn select(&mut self, id: Option<OverlayId>) {
        self.selected = id;
        self.dragging = false;
    }

    /// Select the topmost overlay under the pointer and start dragging it.
    /// Pressing on empty canvas clears the selection.
    pub fn press(
        &mut self,
        point: Point,
        overlays: &OverlayStore,
        viewport: &Viewport,
        fonts: &FontBook,
    ) -> Option<OverlayId> {
        match hit_test(point, overlays, viewport, fonts) {
            Some(overlay) => {
                let logical = viewport.to_logical(point);
                let bounds = bounds_of(overlay, fonts);
                self.selected = Some(overlay.id());
                self.dragging = true;
                self.grab_offset = (logical.x - bounds.x, logical.y - bounds.y);
                self.selected
            }
            None => {
                self.select(None);
                None
            }
        }
    }

    /// Move the dragged overlay so the grabbed point follows the pointer,
    /// clamped to the canvas.
    pub fn drag(
        &mut self,
        point: Point,
        overlays: &mut OverlayStore,
        viewport: &Viewport,
        fonts: &FontBook,
    ) {
        if !self.dragging {
            return;
        }
        let Some(id) = self.selected else {
            return;
        };
        let Some(overlay) = overlays.get(id) else {
            // removed while dragging
            self.select(None);
            return;
        };

        let logical = viewport.to_logical(point);
        let bounds = bounds_of(overlay, fonts);
        let (px, py) = overlay.kind.position();
        let x = logical.x - self.grab_offset.0 - (bounds.x - px);
        let y = logical.y - self.grab_offset.1 - (bounds.y - py);
        let (x, y) = clamp_drag(overlay, x, y, fonts);

        overlays.update(id, &OverlayPatch::position(x, y));
    }

    pub fn release(&mut self) {
        self.dragging = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::asset::ImageAsset;
    use crate::overlay::types::{ImageOverlay, OverlayKind, QrOverlay, StaticText};

    fn square(store: &mut OverlayStore, x: f32, y: f32, size: f32) -> OverlayId {
        store.add(
            "custom",
            OverlayKind::Image(ImageOverlay::new("img.png", ImageAsset::pending(), x, y, size)),
        )
    }

    #[test]
    fn drag_moves_by_pointer_delta() {
        let mut store = OverlayStore::new();
        let fonts = FontBook::new();
        let view = Viewport::logical();
        let id = square(&mut store, 100.0, 100.0, 50.0);

        let mut session = DragSession::new();
        assert_eq!(session.press(Point::new(110.0, 120.0), &store, &view, &fonts), Some(id));
        session.drag(Point::new(210.0, 170.0), &mut store, &view, &fonts);

        assert_eq!(store.get(id).unwrap().kind.position(), (200.0, 150.0));
        session.release();
        session.drag(Point::new(0.0, 0.0), &mut store, &view, &fonts);
        assert_eq!(store.get(id).unwrap().kind.position(), (200.0, 150.0));
    }

    #[test]
    fn drag_in_display_space_is_clamped() {
        let mut store = OverlayStore::new();
        let fonts = FontBook::new();
        let view = Viewport::new(640.0, 360.0);
        let id = square(&mut store, 100.0, 100.0, 50.0);

        let mut session = DragSession::new();
        session.press(Point::new(60.0, 60.0), &store, &view, &fonts);
        session.drag(Point::new(1000.0, 1000.0), &mut store, &view, &fonts);

        assert_eq!(store.get(id).unwrap().kind.position(), (1230.0, 670.0));
    }

    #[test]
    fn dragging_qr_keeps_margin_inside_canvas() {
        let mut store = OverlayStore::new();
        let fonts = FontBook::new();
        let view = Viewport::logical();
        let id = store.add(
            "custom",
            OverlayKind::Qr(QrOverlay::new("x", 150.0, 150.0, 100.0).unwrap()),
        );

        let mut session = DragSession::new();
        session.press(Point::new(200.0, 200.0), &store, &view, &fonts);
        session.drag(Point::new(-500.0, -500.0), &mut store, &view, &fonts);
        assert_eq!(store.get(id).unwrap().kind.position(), (5.0, 5.0));
    }

    #[test]
    fn press_on_empty_canvas_deselects() {
        let mut store = OverlayStore::new();
        let fonts = FontBook::new();
        let view = Viewport::logical();
        let id = square(&mut store, 0.0, 0.0, 10.0);

        let mut session = DragSession::new();
        session.select(Some(id));
        assert_eq!(session.press(Point::new(500.0, 500.0), &store, &view, &fonts), None);
        assert_eq!(session.selected(), None);
        assert!(!session.is_dragging());
    }

    #[test]
    fn drag_after_removal_clears_selection() {
        let mut store = OverlayStore::new();
        let fonts = FontBook::new();
        let view = Viewport::logical();
        let id = square(&mut store, 0.0, 0.0, 100.0);

        let mut session = DragSession::new();
        session.press(Point::new(50.0, 50.0), &store, &view, &fonts);
        store.remove_by_id(id);
        session.drag(Point::new(60.0, 60.0), &mut store, &view, &fonts);
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn align_places_box_in_corner() {
        let mut store = OverlayStore::new();
        let fonts = FontBook::new();
        let mut label = StaticText::new("abcd", 300.0, 300.0, 20.0);
        label.has_background = true;
        let id = store.add("privacy", OverlayKind::StaticText(label));
        let overlay = store.get(id).unwrap();

        // box is 40 + 8 wide, 20 + 8 high
        let patch = align_to_corner(overlay, Corner::BottomRight, ALIGN_MARGIN, &fonts);
        assert_eq!((patch.x, patch.y), (Some(1212.0), Some(672.0)));

        let patch = align_to_corner(overlay, Corner::TopLeft, ALIGN_MARGIN, &fonts);
        assert_eq!((patch.x, patch.y), (Some(20.0), Some(20.0)));
    }
}
