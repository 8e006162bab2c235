use super::asset::{render_qr, ImageAsset};
use super::color::Color;
use image::RgbaImage;
use std::fmt;

/// Unique, immutable overlay identifier, issued by
/// [`crate::overlay::OverlayStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(pub(crate) u64);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "overlay-{}", self.0)
    }
}

/// A positioned piece of content drawn over the processed frame.
#[derive(Debug, Clone)]
pub struct Overlay {
    id: OverlayId,
    /// Free-form tag used for bulk removal ("privacy", "logo", "custom", ...)
    pub group: String,
    pub kind: OverlayKind,
}

impl Overlay {
    pub(crate) fn new(id: OverlayId, group: String, kind: OverlayKind) -> Self {
        Self { id, group, kind }
    }

    pub fn id(&self) -> OverlayId {
        self.id
    }
}

#[derive(Debug, Clone)]
pub enum OverlayKind {
    StaticText(StaticText),
    ScrollingText(ScrollingText),
    Qr(QrOverlay),
    Image(ImageOverlay),
}

/// Multi-line label drawn top-left aligned at `(x, y)`.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticText {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub font_family: String,
    pub text_color: Color,
    pub has_background: bool,
    pub background_color: Color,
    pub background_opacity: f32,
}

impl StaticText {
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            font_size,
            font_family: "Arial".to_string(),
            text_color: Color::BLACK,
            has_background: false,
            background_color: Color::WHITE,
            background_opacity: 1.0,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    pub fn line_count(&self) -> usize {
        self.lines().count()
    }
}

/// Announcement ticker: a full-width band at `y` with text moving left.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollingText {
    pub text: String,
    pub y: f32,
    /// Horizontal position; starts at the right edge on the first frame.
    pub x: Option<f32>,
    pub speed: f32,
    pub font_size: f32,
    pub text_color: Color,
    pub background_color: Color,
    pub padding: f32,
}

impl ScrollingText {
    pub fn new(text: impl Into<String>, y: f32, font_size: f32) -> Self {
        Self {
            text: text.into(),
            y,
            x: None,
            speed: 2.0,
            font_size,
            text_color: Color::WHITE,
            background_color: Color::rgba(8, 185, 166, 0.8),
            padding: 10.0,
        }
    }

    pub fn band_height(&self) -> f32 {
        self.font_size + self.padding * 2.0
    }
}

#[derive(Debug, Clone)]
pub struct QrOverlay {
    pub link: String,
    pub bitmap: RgbaImage,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl QrOverlay {
    pub fn new(
        link: impl Into<String>,
        x: f32,
        y: f32,
        size: f32,
    ) -> Result<Self, qrcode::types::QrError> {
        let link = link.into();
        let bitmap = render_qr(&link, size.round().max(1.0) as u32)?;
        Ok(Self {
            link,
            bitmap,
            x,
            y,
            width: size,
            height: size,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ImageOverlay {
    pub source: String,
    pub asset: ImageAsset,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Known once the asset has loaded; resizing keeps it.
    pub aspect_ratio: Option<f32>,
    /// Bottom edge to keep when the height settles after loading. Cleared
    /// once the overlay is moved.
    pub bottom_anchor: Option<f32>,
}

impl ImageOverlay {
    /// Height follows `width` and the asset's aspect ratio when the asset is
    /// already decoded; otherwise it is provisional until the first frame
    /// after loading completes.
    pub fn new(source: impl Into<String>, asset: ImageAsset, x: f32, y: f32, width: f32) -> Self {
        let aspect_ratio = asset.aspect_ratio();
        let height = aspect_ratio.map_or(width, |ratio| width / ratio);
        Self {
            source: source.into(),
            asset,
            x,
            y,
            width,
            height,
            aspect_ratio,
            bottom_anchor: None,
        }
    }

    /// Keep the bottom edge at `bottom`, now and after the asset loads.
    pub fn anchor_bottom(&mut self, bottom: f32) {
        self.bottom_anchor = Some(bottom);
        self.y = bottom - self.height;
    }

    /// Pick up the aspect ratio of a freshly loaded asset.
    pub(crate) fn settle_aspect(&mut self) {
        if self.aspect_ratio.is_some() {
            return;
        }
        if let Some(ratio) = self.asset.aspect_ratio() {
            self.aspect_ratio = Some(ratio);
            self.height = self.width / ratio;
            if let Some(bottom) = self.bottom_anchor {
                self.y = bottom - self.height;
            }
        }
    }
}

impl OverlayKind {
    /// Top-left position as stored in the payload.
    pub fn position(&self) -> (f32, f32) {
        match self {
            OverlayKind::StaticText(t) => (t.x, t.y),
            OverlayKind::ScrollingText(s) => (s.x.unwrap_or(0.0), s.y),
            OverlayKind::Qr(q) => (q.x, q.y),
            OverlayKind::Image(i) => (i.x, i.y),
        }
    }

    /// Whether the user may drag this overlay around.
    pub fn is_draggable(&self) -> bool {
        !matches!(self, OverlayKind::ScrollingText(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            OverlayKind::StaticText(_) => "static-text",
            OverlayKind::ScrollingText(_) => "scrolling-text",
            OverlayKind::Qr(_) => "qr",
            OverlayKind::Image(_) => "image",
        }
    }

    /// Shallow-merge `patch` into the payload. Fields that do not exist on
    /// this kind are ignored. Everything that can fail is computed before
    /// the first field is written.
    pub fn apply(&mut self, patch: &OverlayPatch) {
        match self {
            OverlayKind::StaticText(t) => {
                set(&mut t.x, patch.x);
                set(&mut t.y, patch.y);
                set_cloned(&mut t.text, &patch.text);
                set(&mut t.font_size, patch.font_size);
                set_cloned(&mut t.font_family, &patch.font_family);
                set(&mut t.text_color, patch.text_color);
                set(&mut t.has_background, patch.has_background);
                set(&mut t.background_color, patch.background_color);
                set(&mut t.background_opacity, patch.background_opacity);
            }
            OverlayKind::ScrollingText(s) => {
                if let Some(x) = patch.x {
                    s.x = Some(x);
                }
                set(&mut s.y, patch.y);
                set_cloned(&mut s.text, &patch.text);
                set(&mut s.speed, patch.speed);
                set(&mut s.font_size, patch.font_size);
                set(&mut s.text_color, patch.text_color);
                set(&mut s.background_color, patch.background_color);
                set(&mut s.padding, patch.padding);
            }
            OverlayKind::Qr(q) => {
                let new_size = patch.width.or(patch.height);
                let relink = patch.link.as_ref().filter(|link| **link != q.link);
                if relink.is_some() || new_size.is_some_and(|size| size != q.width) {
                    let link = relink.unwrap_or(&q.link);
                    let size = new_size.unwrap_or(q.width);
                    match QrOverlay::new(link.clone(), q.x, q.y, size) {
                        Ok(fresh) => {
                            q.link = fresh.link;
                            q.bitmap = fresh.bitmap;
                            q.width = fresh.width;
                            q.height = fresh.height;
                        }
                        Err(err) => tracing::warn!("Keeping previous QR code: {}", err),
                    }
                }
                set(&mut q.x, patch.x);
                set(&mut q.y, patch.y);
            }
            OverlayKind::Image(i) => {
                if patch.x.is_some() || patch.y.is_some() {
                    i.bottom_anchor = None;
                }
                set(&mut i.x, patch.x);
                set(&mut i.y, patch.y);
                match (patch.width, patch.height, i.aspect_ratio) {
                    (Some(w), None, Some(ratio)) => {
                        i.width = w;
                        i.height = w / ratio;
                    }
                    (w, h, _) => {
                        set(&mut i.width, w);
                        set(&mut i.height, h);
                    }
                }
            }
        }
    }
}

fn set<T>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn set_cloned<T: Clone>(field: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *field = value.clone();
    }
}

/// Partial update for [`OverlayKind::apply`]; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub text: Option<String>,
    pub font_size: Option<f32>,
    pub font_family: Option<String>,
    pub text_color: Option<Color>,
    pub has_background: Option<bool>,
    pub background_color: Option<Color>,
    pub background_opacity: Option<f32>,
    pub speed: Option<f32>,
    pub padding: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub link: Option<String>,
}

impl OverlayPatch {
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_merges_only_given_fields() {
        let mut kind = OverlayKind::StaticText(StaticText::new("a\nb", 10.0, 20.0, 20.0));
        kind.apply(&OverlayPatch {
            font_size: Some(32.0),
            has_background: Some(true),
            ..OverlayPatch::default()
        });

        let OverlayKind::StaticText(t) = &kind else {
            panic!("kind changed");
        };
        assert_eq!((t.x, t.y), (10.0, 20.0));
        assert_eq!(t.font_size, 32.0);
        assert!(t.has_background);
        assert_eq!(t.text, "a\nb");
    }

    #[test]
    fn patch_ignores_foreign_fields() {
        let mut kind = OverlayKind::ScrollingText(ScrollingText::new("news", 50.0, 48.0));
        kind.apply(&OverlayPatch {
            link: Some("https://example.com".into()),
            width: Some(10.0),
            speed: Some(5.0),
            ..OverlayPatch::default()
        });
        let OverlayKind::ScrollingText(s) = &kind else {
            panic!("kind changed");
        };
        assert_eq!(s.speed, 5.0);
        assert_eq!(s.x, None);
    }

    #[test]
    fn image_width_keeps_aspect_ratio() {
        let asset = ImageAsset::ready(RgbaImage::new(200, 100));
        let mut kind = OverlayKind::Image(ImageOverlay::new("logo.png", asset, 0.0, 0.0, 100.0));
        kind.apply(&OverlayPatch {
            width: Some(300.0),
            ..OverlayPatch::default()
        });
        let OverlayKind::Image(i) = &kind else {
            panic!("kind changed");
        };
        assert_eq!((i.width, i.height), (300.0, 150.0));
    }

    #[test]
    fn pending_image_settles_height_after_load() {
        let asset = ImageAsset::pending();
        let mut overlay = ImageOverlay::new("logo.png", asset.clone(), 0.0, 0.0, 100.0);
        assert_eq!(overlay.height, 100.0);

        asset.complete(Ok(RgbaImage::new(40, 10)));
        overlay.settle_aspect();
        assert_eq!(overlay.aspect_ratio, Some(4.0));
        assert_eq!(overlay.height, 25.0);
    }

    #[test]
    fn qr_relink_rerenders_bitmap() {
        let mut kind = OverlayKind::Qr(QrOverlay::new("a", 150.0, 150.0, 100.0).unwrap());
        let before = match &kind {
            OverlayKind::Qr(q) => q.bitmap.clone(),
            _ => unreachable!(),
        };
        kind.apply(&OverlayPatch {
            link: Some("https://example.com/a/much/longer/link".into()),
            x: Some(10.0),
            ..OverlayPatch::default()
        });
        let OverlayKind::Qr(q) = &kind else {
            panic!("kind changed");
        };
        assert_eq!(q.link, "https://example.com/a/much/longer/link");
        assert_eq!(q.x, 10.0);
        assert_ne!(q.bitmap, before);
    }
}
