use image::{imageops, Rgba, RgbaImage};
use qrcode::{Color as Module, QrCode};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Loading state of an [`ImageAsset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    Pending,
    Ready,
    Failed,
}

/// A decoded image that may still be loading.
///
/// The result is published once through a write-once cell: readers see
/// either nothing or the complete bitmap. Clones share the same cell.
#[derive(Clone, Default)]
pub struct ImageAsset {
    cell: Arc<OnceLock<Result<RgbaImage, String>>>,
}

impl ImageAsset {
    /// An asset with no result yet; complete it with [`ImageAsset::complete`].
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn ready(image: RgbaImage) -> Self {
        let asset = Self::pending();
        asset.complete(Ok(image));
        asset
    }

    /// Decode on the calling thread.
    pub fn decode<P: AsRef<Path>>(path: P) -> Self {
        let asset = Self::pending();
        asset.complete(decode(path.as_ref()));
        asset
    }

    /// Decode on a helper thread; the asset is pending until it finishes.
    pub fn load(path: PathBuf) -> Self {
        let asset = Self::pending();
        let slot = asset.clone();
        std::thread::spawn(move || {
            let result = decode(&path);
            if let Err(err) = &result {
                tracing::warn!("Image overlay {} failed to load: {}", path.display(), err);
            }
            slot.complete(result);
        });
        asset
    }

    /// Publish the load result. Later calls are ignored.
    pub fn complete(&self, result: Result<RgbaImage, String>) {
        let _ = self.cell.set(result);
    }

    pub fn status(&self) -> AssetStatus {
        match self.cell.get() {
            None => AssetStatus::Pending,
            Some(Ok(_)) => AssetStatus::Ready,
            Some(Err(_)) => AssetStatus::Failed,
        }
    }

    /// The bitmap, once loading has succeeded.
    pub fn image(&self) -> Option<&RgbaImage> {
        match self.cell.get() {
            Some(Ok(image)) => Some(image),
            _ => None,
        }
    }

    /// Natural width / height of the loaded image.
    pub fn aspect_ratio(&self) -> Option<f32> {
        self.image()
            .filter(|img| img.height() > 0)
            .map(|img| img.width() as f32 / img.height() as f32)
    }
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("status", &self.status())
            .finish()
    }
}

fn decode(path: &Path) -> Result<RgbaImage, String> {
    image::open(path)
        .map(|img| img.into_rgba8())
        .map_err(|e| format!("{}: {}", path.display(), e))
}

/// Render `link` as a black-on-white QR code of `size`x`size` pixels.
pub fn render_qr(link: &str, size: u32) -> Result<RgbaImage, qrcode::types::QrError> {
    let code = QrCode::new(link.as_bytes())?;
    let modules = code.width() as u32;
    let colors = code.to_colors();

    let grid = RgbaImage::from_fn(modules, modules, |x, y| {
        match colors[(y * modules + x) as usize] {
            Module::Dark => Rgba([0, 0, 0, 255]),
            Module::Light => Rgba([255, 255, 255, 255]),
        }
    });

    Ok(imageops::resize(
        &grid,
        size.max(1),
        size.max(1),
        imageops::FilterType::Nearest,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_until_completed() {
        let asset = ImageAsset::pending();
        let shared = asset.clone();
        assert_eq!(asset.status(), AssetStatus::Pending);
        assert!(asset.image().is_none());

        shared.complete(Ok(RgbaImage::new(40, 20)));
        assert_eq!(asset.status(), AssetStatus::Ready);
        assert_eq!(asset.aspect_ratio(), Some(2.0));

        // first result wins
        shared.complete(Err("late".into()));
        assert_eq!(asset.status(), AssetStatus::Ready);
    }

    #[test]
    fn missing_file_fails() {
        let asset = ImageAsset::decode("/nonexistent/logo.png");
        assert_eq!(asset.status(), AssetStatus::Failed);
        assert!(asset.image().is_none());
    }

    #[test]
    fn background_load_eventually_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        RgbaImage::new(10, 5).save(&path).unwrap();

        let asset = ImageAsset::load(path);
        for _ in 0..200 {
            if asset.status() != AssetStatus::Pending {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(asset.status(), AssetStatus::Ready);
    }

    #[test]
    fn qr_has_requested_size_and_both_colors() {
        let qr = render_qr("https://t.me/example", 200).unwrap();
        assert_eq!(qr.dimensions(), (200, 200));
        assert!(qr.pixels().any(|p| p.0 == [0, 0, 0, 255]));
        assert!(qr.pixels().any(|p| p.0 == [255, 255, 255, 255]));
    }
}
