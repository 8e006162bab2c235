use super::raster::{draw_image, fill_rect};
use super::text::FontBook;
use crate::overlay::geometry::{text_bounds, text_padding, QR_MARGIN};
use crate::overlay::{
    Color, ImageOverlay, OverlayKind, OverlayStore, QrOverlay, ScrollingText, StaticText,
};
use image::RgbaImage;

/// Family used for ticker text.
const TICKER_FONT: &str = "Arial";

/// Draws overlays over processed frames.
///
/// Owns one drawing surface that is reused between frames and resized when
/// the frame size changes.
pub struct Compositor {
    surface: RgbaImage,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    pub fn new() -> Self {
        Self {
            surface: RgbaImage::new(1, 1),
        }
    }

    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    /// Advance animated overlays, copy `base` onto the surface and draw every
    /// overlay bottom to top.
    pub fn render(
        &mut self,
        base: &RgbaImage,
        overlays: &mut OverlayStore,
        fonts: &mut FontBook,
    ) {
        let _span = tracing::debug_span!("compositor").entered();

        let frame_width = base.width() as f32;
        self.advance(overlays, frame_width, fonts);

        if self.surface.dimensions() == base.dimensions() {
            self.surface.copy_from_slice(base.as_raw());
        } else {
            self.surface = base.clone();
        }

        for overlay in overlays.iter() {
            match &overlay.kind {
                OverlayKind::StaticText(text) => self.draw_static_text(text, fonts),
                OverlayKind::ScrollingText(ticker) => self.draw_ticker(ticker, fonts),
                OverlayKind::Qr(qr) => self.draw_qr(qr),
                OverlayKind::Image(image) => self.draw_image(image),
            }
        }
    }

    fn advance(&self, overlays: &mut OverlayStore, frame_width: f32, fonts: &FontBook) {
        for overlay in overlays.iter_mut() {
            match &mut overlay.kind {
                OverlayKind::ScrollingText(ticker) => {
                    let x = ticker.x.unwrap_or(frame_width) - ticker.speed;
                    let width = fonts.line_width(&ticker.text, TICKER_FONT, ticker.font_size);
                    ticker.x = Some(if x < -width { frame_width } else { x });
                }
                OverlayKind::Image(image) => image.settle_aspect(),
                OverlayKind::StaticText(_) | OverlayKind::Qr(_) => {}
            }
        }
    }

    fn draw_static_text(&mut self, text: &StaticText, fonts: &mut FontBook) {
        let padding = text_padding(text);
        if text.has_background {
            let bounds = text_bounds(text, fonts);
            let fill = text.background_color.with_opacity(text.background_opacity);
            fill_rect(&mut self.surface, bounds.x, bounds.y, bounds.w, bounds.h, fill);
        }
        for (i, line) in text.lines().enumerate() {
            fonts.draw_line(
                &mut self.surface,
                line,
                &text.font_family,
                text.font_size,
                text.x + padding,
                text.y + padding + i as f32 * text.font_size,
                text.text_color,
            );
        }
    }

    fn draw_ticker(&mut self, ticker: &ScrollingText, fonts: &mut FontBook) {
        let band = ticker.band_height();
        let width = self.surface.width() as f32;
        fill_rect(&mut self.surface, 0.0, ticker.y, width, band, ticker.background_color);
        fonts.draw_line_centered(
            &mut self.surface,
            &ticker.text,
            TICKER_FONT,
            ticker.font_size,
            ticker.x.unwrap_or(width),
            ticker.y + band / 2.0,
            ticker.text_color,
        );
    }

    fn draw_qr(&mut self, qr: &QrOverlay) {
        fill_rect(
            &mut self.surface,
            qr.x - QR_MARGIN,
            qr.y - QR_MARGIN,
            qr.width + QR_MARGIN * 2.0,
            qr.height + QR_MARGIN * 2.0,
            Color::WHITE,
        );
        draw_image(&mut self.surface, &qr.bitmap, qr.x, qr.y, qr.width, qr.height);
    }

    fn draw_image(&mut self, image: &ImageOverlay) {
        // still loading (or failed): nothing to draw this frame
        let Some(bitmap) = image.asset.image() else {
            return;
        };
        draw_image(&mut self.surface, bitmap, image.x, image.y, image.width, image.height);
    }
}
