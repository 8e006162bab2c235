use super::store::OverlayStore;
use super::types::{Overlay, OverlayKind, StaticText};
use crate::render::FontBook;

/// Logical canvas all overlay coordinates live in.
pub const LOGICAL_WIDTH: f32 = 1280.0;
pub const LOGICAL_HEIGHT: f32 = 720.0;

/// White border drawn around QR codes.
pub const QR_MARGIN: f32 = 5.0;

/// Text background padding as a fraction of the font size.
pub const TEXT_PADDING_RATIO: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Strict containment: points on the edge are outside.
    pub fn contains(&self, p: Point) -> bool {
        p.x > self.x && p.x < self.x + self.w && p.y > self.y && p.y < self.y + self.h
    }
}

/// Size at which the frame is shown to the user, used to map pointer
/// positions into logical canvas space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub display_width: f32,
    pub display_height: f32,
}

impl Viewport {
    pub fn new(display_width: f32, display_height: f32) -> Self {
        Self {
            display_width,
            display_height,
        }
    }

    /// A viewport showing the canvas at its logical size.
    pub fn logical() -> Self {
        Self::new(LOGICAL_WIDTH, LOGICAL_HEIGHT)
    }

    pub fn scale(&self) -> (f32, f32) {
        (
            self.display_width / LOGICAL_WIDTH,
            self.display_height / LOGICAL_HEIGHT,
        )
    }

    pub fn to_logical(&self, p: Point) -> Point {
        let (sx, sy) = self.scale();
        if sx <= 0.0 || sy <= 0.0 {
            return p;
        }
        Point::new(p.x / sx, p.y / sy)
    }

    pub fn to_display(&self, p: Point) -> Point {
        let (sx, sy) = self.scale();
        Point::new(p.x * sx, p.y * sy)
    }
}

/// Padding between a text block's background edge and its glyphs.
pub fn text_padding(text: &StaticText) -> f32 {
    if text.has_background {
        text.font_size * TEXT_PADDING_RATIO
    } else {
        0.0
    }
}

/// Box of a static text block: widest line plus padding by line count times
/// font size plus padding.
pub fn text_bounds(text: &StaticText, fonts: &FontBook) -> Rect {
    let padding = text_padding(text);
    let max_width = fonts.max_line_width(text.lines(), &text.font_family, text.font_size);
    Rect::new(
        text.x,
        text.y,
        max_width + padding * 2.0,
        text.line_count() as f32 * text.font_size + padding * 2.0,
    )
}

pub fn bounds_of(overlay: &Overlay, fonts: &FontBook) -> Rect {
    match &overlay.kind {
        OverlayKind::StaticText(t) => text_bounds(t, fonts),
        OverlayKind::ScrollingText(s) => Rect::new(0.0, s.y, LOGICAL_WIDTH, s.band_height()),
        OverlayKind::Qr(q) => Rect::new(
            q.x - QR_MARGIN,
            q.y - QR_MARGIN,
            q.width + QR_MARGIN * 2.0,
            q.height + QR_MARGIN * 2.0,
        ),
        OverlayKind::Image(i) => Rect::new(i.x, i.y, i.width, i.height),
    }
}

/// Topmost draggable overlay under the display-space `point`.
pub fn hit_test<'a>(
    point: Point,
    overlays: &'a OverlayStore,
    viewport: &Viewport,
    fonts: &FontBook,
) -> Option<&'a Overlay> {
    let logical = viewport.to_logical(point);
    overlays
        .iter()
        .rev()
        .filter(|o| o.kind.is_draggable())
        .find(|o| bounds_of(o, fonts).contains(logical))
}

/// Constrain a proposed top-left position so the overlay's bounding box
/// stays inside the logical canvas. Boxes larger than the canvas are pinned
/// to the origin.
pub fn clamp_drag(overlay: &Overlay, x: f32, y: f32, fonts: &FontBook) -> (f32, f32) {
    let bounds = bounds_of(overlay, fonts);
    let (px, py) = overlay.kind.position();
    // the bounding box may start away from the stored position (QR margin)
    let (dx, dy) = (bounds.x - px, bounds.y - py);

    let bx = (x + dx).min(LOGICAL_WIDTH - bounds.w).max(0.0);
    let by = (y + dy).min(LOGICAL_HEIGHT - bounds.h).max(0.0);
    (bx - dx, by - dy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::asset::ImageAsset;
    use crate::overlay::types::{ImageOverlay, QrOverlay, ScrollingText};

    fn image(x: f32, y: f32, w: f32, h: f32) -> OverlayKind {
        let mut overlay = ImageOverlay::new("img.png", ImageAsset::pending(), x, y, w);
        overlay.height = h;
        OverlayKind::Image(overlay)
    }

    #[test]
    fn text_with_background_bounds() {
        let mut store = OverlayStore::new();
        let mut label = StaticText::new("Jane Doe\nEngineer", 20.0, 20.0, 20.0);
        label.has_background = true;
        let id = store.add("privacy", OverlayKind::StaticText(label));

        let bounds = bounds_of(store.get(id).unwrap(), &FontBook::new());
        assert_eq!(bounds.h, 48.0);
        assert_eq!((bounds.x, bounds.y), (20.0, 20.0));
        // 8 chars * 20 * 0.5 + 2 * 4
        assert_eq!(bounds.w, 88.0);
    }

    #[test]
    fn text_without_background_has_no_padding() {
        let label = StaticText::new("a\nb\nc", 0.0, 0.0, 10.0);
        let bounds = text_bounds(&label, &FontBook::new());
        assert_eq!((bounds.w, bounds.h), (5.0, 30.0));
    }

    #[test]
    fn qr_bounds_include_margin() {
        let mut store = OverlayStore::new();
        let id = store.add(
            "custom",
            OverlayKind::Qr(QrOverlay::new("x", 150.0, 150.0, 200.0).unwrap()),
        );
        let bounds = bounds_of(store.get(id).unwrap(), &FontBook::new());
        assert_eq!(bounds, Rect::new(145.0, 145.0, 210.0, 210.0));
    }

    #[test]
    fn topmost_overlay_wins() {
        let mut store = OverlayStore::new();
        let _a = store.add("custom", image(100.0, 100.0, 200.0, 200.0));
        let b = store.add("custom", image(150.0, 150.0, 200.0, 200.0));

        let hit = hit_test(
            Point::new(175.0, 175.0),
            &store,
            &Viewport::logical(),
            &FontBook::new(),
        );
        assert_eq!(hit.map(|o| o.id()), Some(b));
    }

    #[test]
    fn hit_test_maps_display_space() {
        let mut store = OverlayStore::new();
        let id = store.add("custom", image(640.0, 360.0, 100.0, 100.0));
        let viewport = Viewport::new(640.0, 360.0);
        let fonts = FontBook::new();

        // (330, 190) on a half-size display is (660, 380) logically
        let hit = hit_test(Point::new(330.0, 190.0), &store, &viewport, &fonts);
        assert_eq!(hit.map(|o| o.id()), Some(id));
        assert!(hit_test(Point::new(660.0, 380.0), &store, &viewport, &fonts).is_none());
    }

    #[test]
    fn hit_test_misses_and_skips_tickers() {
        let mut store = OverlayStore::new();
        let fonts = FontBook::new();
        store.add(
            "custom",
            OverlayKind::ScrollingText(ScrollingText::new("news", 50.0, 48.0)),
        );
        let view = Viewport::logical();
        assert!(hit_test(Point::new(10.0, 60.0), &store, &view, &fonts).is_none());
        assert!(hit_test(Point::new(10.0, 60.0), &OverlayStore::new(), &view, &fonts).is_none());
    }

    #[test]
    fn hit_test_edges_are_exclusive() {
        let mut store = OverlayStore::new();
        store.add("custom", image(10.0, 10.0, 10.0, 10.0));
        let view = Viewport::logical();
        let fonts = FontBook::new();
        assert!(hit_test(Point::new(10.0, 15.0), &store, &view, &fonts).is_none());
        assert!(hit_test(Point::new(11.0, 15.0), &store, &view, &fonts).is_some());
    }

    #[test]
    fn clamp_keeps_box_inside_canvas() {
        let mut store = OverlayStore::new();
        let fonts = FontBook::new();
        let id = store.add("custom", image(0.0, 0.0, 200.0, 100.0));
        let overlay = store.get(id).unwrap();

        assert_eq!(clamp_drag(overlay, -50.0, 900.0, &fonts), (0.0, 620.0));
        assert_eq!(clamp_drag(overlay, 1200.0, -3.0, &fonts), (1080.0, 0.0));
        assert_eq!(clamp_drag(overlay, 300.0, 200.0, &fonts), (300.0, 200.0));
    }

    #[test]
    fn clamp_accounts_for_qr_margin() {
        let mut store = OverlayStore::new();
        let fonts = FontBook::new();
        let id = store.add(
            "custom",
            OverlayKind::Qr(QrOverlay::new("x", 150.0, 150.0, 200.0).unwrap()),
        );
        let overlay = store.get(id).unwrap();
        assert_eq!(clamp_drag(overlay, 0.0, 0.0, &fonts), (5.0, 5.0));
        assert_eq!(clamp_drag(overlay, 5000.0, 5000.0, &fonts), (1075.0, 515.0));
    }

    #[test]
    fn clamp_is_idempotent() {
        let mut store = OverlayStore::new();
        let fonts = FontBook::new();
        let ids = [
            store.add("custom", image(0.0, 0.0, 200.0, 100.0)),
            store.add("custom", image(0.0, 0.0, 2000.0, 1000.0)),
            store.add(
                "custom",
                OverlayKind::Qr(QrOverlay::new("x", 0.0, 0.0, 120.0).unwrap()),
            ),
        ];
        let proposals = [(-40.0, -40.0), (10.0, 700.0), (1279.0, 3.5), (600.0, 300.0)];

        for id in ids {
            let overlay = store.get(id).unwrap();
            for (x, y) in proposals {
                let (cx, cy) = clamp_drag(overlay, x, y, &fonts);
                assert_eq!(clamp_drag(overlay, cx, cy, &fonts), (cx, cy));
            }
        }
    }
}
