use super::raster::blend_pixel;
use crate::overlay::Color;
use anyhow::{anyhow, Context, Result};
use fontdue::layout::{CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};
use image::RgbaImage;
use std::collections::HashMap;
use std::path::Path;

/// Advance per character, in ems, used when no font is loaded.
const FALLBACK_ADVANCE_EM: f32 = 0.5;
/// Ascent, in ems, used when no font is loaded.
const FALLBACK_ASCENT_EM: f32 = 0.8;

#[derive(Debug, Clone)]
struct GlyphBitmap {
    width: usize,
    height: usize,
    coverage: Vec<u8>,
}

/// Fonts keyed by family name, with a cache of rasterized glyphs.
///
/// Unknown families fall back to the first font registered. With no fonts at
/// all, text is measured with a fixed advance and not rasterized.
#[derive(Default)]
pub struct FontBook {
    fonts: HashMap<String, Font>,
    default_family: Option<String>,
    glyph_cache: HashMap<GlyphRasterConfig, GlyphBitmap>,
}

fn resolve<'a>(
    fonts: &'a HashMap<String, Font>,
    default_family: Option<&String>,
    family: &str,
) -> Option<&'a Font> {
    fonts
        .get(family)
        .or_else(|| default_family.and_then(|name| fonts.get(name)))
}

impl FontBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TTF/OTF file and register it under `family`.
    pub fn load_file<P: AsRef<Path>>(&mut self, family: &str, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read font file {}", path.display()))?;
        self.add_bytes(family, &bytes)
            .with_context(|| format!("Failed to parse font file {}", path.display()))?;
        tracing::info!("Loaded font {:?} from {}", family, path.display());
        Ok(())
    }

    pub fn add_bytes(&mut self, family: &str, bytes: &[u8]) -> Result<()> {
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| anyhow!(e))?;
        if self.default_family.is_none() {
            self.default_family = Some(family.to_string());
        }
        self.fonts.insert(family.to_string(), font);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Number of distinct glyph bitmaps rasterized so far.
    pub fn cached_glyphs(&self) -> usize {
        self.glyph_cache.len()
    }

    fn font(&self, family: &str) -> Option<&Font> {
        resolve(&self.fonts, self.default_family.as_ref(), family)
    }

    /// Rendered width of a single line of `text`, kerning included.
    pub fn line_width(&self, text: &str, family: &str, size: f32) -> f32 {
        let Some(font) = self.font(family) else {
            return text.chars().count() as f32 * size * FALLBACK_ADVANCE_EM;
        };
        let mut width = 0.0;
        let mut previous = None;
        for ch in text.chars() {
            if let Some(prev) = previous {
                width += font.horizontal_kern(prev, ch, size).unwrap_or(0.0);
            }
            width += font.metrics(ch, size).advance_width;
            previous = Some(ch);
        }
        width
    }

    /// Width of the widest line.
    pub fn max_line_width<'a>(
        &self,
        lines: impl IntoIterator<Item = &'a str>,
        family: &str,
        size: f32,
    ) -> f32 {
        lines
            .into_iter()
            .map(|line| self.line_width(line, family, size))
            .fold(0.0, f32::max)
    }

    /// Rasterize one line with its top edge at `top`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_line(
        &mut self,
        surface: &mut RgbaImage,
        text: &str,
        family: &str,
        size: f32,
        x: f32,
        top: f32,
        color: Color,
    ) {
        let Some(font) = resolve(&self.fonts, self.default_family.as_ref(), family) else {
            return;
        };

        let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            x,
            y: top,
            ..LayoutSettings::default()
        });
        layout.append(&[font], &TextStyle::new(text, size, 0));

        let (sw, sh) = (surface.width() as i32, surface.height() as i32);
        for glyph in layout.glyphs() {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let bitmap = self.glyph_cache.entry(glyph.key).or_insert_with(|| {
                let (metrics, coverage) = font.rasterize_config(glyph.key);
                GlyphBitmap {
                    width: metrics.width,
                    height: metrics.height,
                    coverage,
                }
            });

            let left = glyph.x.round() as i32;
            let glyph_top = glyph.y.round() as i32;
            for gy in 0..bitmap.height {
                let py = glyph_top + gy as i32;
                if py < 0 || py >= sh {
                    continue;
                }
                for gx in 0..bitmap.width {
                    let px = left + gx as i32;
                    if px < 0 || px >= sw {
                        continue;
                    }
                    let c = bitmap.coverage[gy * bitmap.width + gx];
                    if c == 0 {
                        continue;
                    }
                    blend_pixel(
                        surface.get_pixel_mut(px as u32, py as u32),
                        color,
                        c as f32 / 255.0,
                    );
                }
            }
        }
    }

    /// Rasterize one line vertically centered on `center_y`.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_line_centered(
        &mut self,
        surface: &mut RgbaImage,
        text: &str,
        family: &str,
        size: f32,
        x: f32,
        center_y: f32,
        color: Color,
    ) {
        let (ascent, descent) = match self
            .font(family)
            .and_then(|f| f.horizontal_line_metrics(size))
        {
            Some(m) => (m.ascent, -m.descent),
            None => (size * FALLBACK_ASCENT_EM, size * (1.0 - FALLBACK_ASCENT_EM)),
        };
        let top = center_y - (ascent + descent) / 2.0;
        self.draw_line(surface, text, family, size, x, top, color);
    }
}
