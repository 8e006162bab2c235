// Software drawing primitives on RGBA surfaces.

use crate::overlay::Color;
use image::{imageops, Rgba, RgbaImage};

/// Source-over blend of `color` at `coverage` (0..=1) into `dst`.
#[inline]
pub fn blend_pixel(dst: &mut Rgba<u8>, color: Color, coverage: f32) {
    let alpha = (color.a * coverage).clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let mix = |d: u8, s: u8| (s as f32 * alpha + d as f32 * (1.0 - alpha)).round() as u8;
    let dst_a = dst[3] as f32 / 255.0;
    dst[0] = mix(dst[0], color.r);
    dst[1] = mix(dst[1], color.g);
    dst[2] = mix(dst[2], color.b);
    dst[3] = ((alpha + dst_a * (1.0 - alpha)) * 255.0).round() as u8;
}

/// Fill the axis-aligned rectangle, clipped to the surface.
pub fn fill_rect(surface: &mut RgbaImage, x: f32, y: f32, w: f32, h: f32, color: Color) {
    if color.is_transparent() || w <= 0.0 || h <= 0.0 {
        return;
    }
    let (sw, sh) = surface.dimensions();
    let x0 = x.round().max(0.0) as u32;
    let y0 = y.round().max(0.0) as u32;
    let x1 = ((x + w).round().max(0.0) as u32).min(sw);
    let y1 = ((y + h).round().max(0.0) as u32).min(sh);

    for py in y0..y1 {
        for px in x0..x1 {
            blend_pixel(surface.get_pixel_mut(px, py), color, 1.0);
        }
    }
}

/// Draw `image` scaled to `w`x`h` with its top-left corner at `(x, y)`,
/// alpha-blended over the surface.
pub fn draw_image(surface: &mut RgbaImage, image: &RgbaImage, x: f32, y: f32, w: f32, h: f32) {
    let w = w.round();
    let h = h.round();
    if w < 1.0 || h < 1.0 {
        return;
    }
    let (w, h) = (w as u32, h as u32);
    let left = x.round() as i64;
    let top = y.round() as i64;

    if image.dimensions() == (w, h) {
        imageops::overlay(surface, image, left, top);
    } else {
        let scaled = imageops::resize(image, w, h, imageops::FilterType::Triangle);
        imageops::overlay(surface, &scaled, left, top);
    }
}
