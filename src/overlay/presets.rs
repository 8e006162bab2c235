// Stock overlays and the groups they live in.

use super::asset::ImageAsset;
use super::color::Color;
use super::geometry::{LOGICAL_HEIGHT, LOGICAL_WIDTH};
use super::store::OverlayStore;
use super::types::{ImageOverlay, OverlayId, OverlayKind, QrOverlay, ScrollingText, StaticText};

pub const GROUP_PRIVACY: &str = "privacy";
pub const GROUP_LOGO: &str = "logo";
pub const GROUP_CUSTOM: &str = "custom";
pub const GROUP_CUSTOM_IMAGE: &str = "custom-image";

const LOGO_WIDTH: f32 = 100.0;
const IMAGE_WIDTH: f32 = 200.0;
const EDGE_MARGIN: f32 = 20.0;

/// Replace the privacy label with `text`. An empty text just removes it.
pub fn set_privacy_label(store: &mut OverlayStore, text: &str) -> Option<OverlayId> {
    store.remove_by_group(GROUP_PRIVACY);
    if text.is_empty() {
        return None;
    }
    let label = StaticText {
        text_color: Color::BLACK,
        has_background: true,
        background_color: Color::WHITE,
        background_opacity: 0.75,
        ..StaticText::new(text, 20.0, 20.0, 20.0)
    };
    Some(store.add(GROUP_PRIVACY, OverlayKind::StaticText(label)))
}

/// Custom announcement, either a ticker band or a static label.
pub fn add_announcement(store: &mut OverlayStore, text: &str, scrolling: bool) -> Option<OverlayId> {
    if text.is_empty() {
        return None;
    }
    let kind = if scrolling {
        OverlayKind::ScrollingText(ScrollingText {
            speed: 3.0,
            ..ScrollingText::new(text, 50.0, 48.0)
        })
    } else {
        OverlayKind::StaticText(StaticText {
            has_background: true,
            background_opacity: 0.75,
            ..StaticText::new(text, 100.0, 100.0, 48.0)
        })
    };
    Some(store.add(GROUP_CUSTOM, kind))
}

pub fn add_qr(
    store: &mut OverlayStore,
    link: &str,
    group: &str,
) -> Result<Option<OverlayId>, qrcode::types::QrError> {
    if link.is_empty() {
        return Ok(None);
    }
    let qr = QrOverlay::new(link, 150.0, 150.0, 200.0)?;
    Ok(Some(store.add(group, OverlayKind::Qr(qr))))
}

/// Add an image overlay. Logos replace any existing logo and sit in the
/// bottom-right corner; other images start at (200, 200).
pub fn add_image(store: &mut OverlayStore, source: &str, asset: ImageAsset, group: &str) -> OverlayId {
    if group == GROUP_LOGO {
        store.remove_by_group(GROUP_LOGO);
        let mut logo = ImageOverlay::new(source, asset, 0.0, 0.0, LOGO_WIDTH);
        logo.x = LOGICAL_WIDTH - LOGO_WIDTH - EDGE_MARGIN;
        logo.anchor_bottom(LOGICAL_HEIGHT - EDGE_MARGIN);
        store.add(group, OverlayKind::Image(logo))
    } else {
        let image = ImageOverlay::new(source, asset, 200.0, 200.0, IMAGE_WIDTH);
        store.add(group, OverlayKind::Image(image))
    }
}
