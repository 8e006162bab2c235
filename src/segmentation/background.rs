use crate::error::BackgroundLoadError;
use image::{imageops, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Holds the current replacement background.
///
/// A load either completes and swaps in the new bitmap or fails and leaves the
/// previous one in place; readers never see a partially decoded image.
#[derive(Default)]
pub struct BackgroundStore {
    bitmap: Option<Arc<RgbaImage>>,
    source: Option<PathBuf>,
    last_reload: Option<Instant>,
    // background scaled to the last requested frame size
    fitted: Option<RgbaImage>,
}

impl BackgroundStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `path` and make it the current background.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), BackgroundLoadError> {
        let path = path.as_ref();
        let _span = tracing::debug_span!("background_load").entered();

        let decoded = decode(path)?;
        tracing::info!(
            "Background loaded from {} ({}x{})",
            path.display(),
            decoded.width(),
            decoded.height()
        );
        self.replace(decoded, Some(path.to_path_buf()));
        Ok(())
    }

    /// Install an already decoded bitmap.
    pub fn set_image(&mut self, image: RgbaImage) {
        self.replace(image, None);
    }

    fn replace(&mut self, image: RgbaImage, source: Option<PathBuf>) {
        self.bitmap = Some(Arc::new(image));
        self.source = source;
        self.fitted = None;
    }

    /// Reload `path` unless the previous reload happened less than
    /// `min_interval` before `now`.
    ///
    /// Returns `Ok(true)` when a decode happened. The reload timestamp is
    /// taken before decoding, so failed attempts are debounced too.
    pub fn reload<P: AsRef<Path>>(
        &mut self,
        path: P,
        min_interval: Duration,
        now: Instant,
    ) -> Result<bool, BackgroundLoadError> {
        if let Some(last) = self.last_reload {
            if now.saturating_duration_since(last) < min_interval {
                return Ok(false);
            }
        }
        self.last_reload = Some(now);
        self.load(path)?;
        Ok(true)
    }

    pub fn bitmap(&self) -> Option<&Arc<RgbaImage>> {
        self.bitmap.as_ref()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn last_reload(&self) -> Option<Instant> {
        self.last_reload
    }

    pub fn is_loaded(&self) -> bool {
        self.bitmap.is_some()
    }

    /// The background scaled to `width`x`height`, cached until the next
    /// size change or load.
    pub fn fitted(&mut self, width: u32, height: u32) -> Option<&RgbaImage> {
        let bitmap = self.bitmap.as_ref()?;

        let stale = self
            .fitted
            .as_ref()
            .map_or(true, |f| f.dimensions() != (width, height));
        if stale {
            let scaled = if bitmap.dimensions() == (width, height) {
                bitmap.as_ref().clone()
            } else {
                imageops::resize(
                    bitmap.as_ref(),
                    width,
                    height,
                    imageops::FilterType::Triangle,
                )
            };
            self.fitted = Some(scaled);
        }

        self.fitted.as_ref()
    }

    /// Drop the bitmap and everything derived from it.
    pub fn clear(&mut self) {
        self.bitmap = None;
        self.source = None;
        self.fitted = None;
        self.last_reload = None;
    }
}

fn decode(path: &Path) -> Result<RgbaImage, BackgroundLoadError> {
    image::open(path)
        .map(|img| img.into_rgba8())
        .map_err(|e| BackgroundLoadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn write_png(dir: &Path, name: &str, w: u32, h: u32, color: [u8; 4]) -> PathBuf {
        let path = dir.join(name);
        RgbaImage::from_pixel(w, h, Rgba(color)).save(&path).unwrap();
        path
    }

    #[test]
    fn load_replaces_bitmap() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(dir.path(), "a.png", 4, 2, [255, 0, 0, 255]);
        let b = write_png(dir.path(), "b.png", 8, 4, [0, 255, 0, 255]);

        let mut store = BackgroundStore::new();
        store.load(&a).unwrap();
        assert_eq!(store.bitmap().unwrap().dimensions(), (4, 2));

        store.load(&b).unwrap();
        assert_eq!(store.bitmap().unwrap().dimensions(), (8, 4));
        assert_eq!(store.source(), Some(b.as_path()));
    }

    #[test]
    fn failed_load_keeps_previous_bitmap() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_png(dir.path(), "good.png", 4, 2, [1, 2, 3, 255]);
        let broken = dir.path().join("broken.png");
        std::fs::write(&broken, b"not a png").unwrap();

        let mut store = BackgroundStore::new();
        store.load(&good).unwrap();
        let before = Arc::clone(store.bitmap().unwrap());

        let err = store.load(&broken).unwrap_err();
        assert_eq!(err.path, broken);
        assert!(Arc::ptr_eq(&before, store.bitmap().unwrap()));
    }

    #[test]
    fn reload_within_interval_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "wallpaper.png", 4, 2, [9, 9, 9, 255]);

        let mut store = BackgroundStore::new();
        let t0 = Instant::now();
        assert!(store.reload(&path, Duration::from_millis(1500), t0).unwrap());
        let first = Arc::clone(store.bitmap().unwrap());

        // overwrite the file; a second decode would notice the new size
        write_png(dir.path(), "wallpaper.png", 6, 6, [1, 1, 1, 255]);
        let t1 = t0 + Duration::from_millis(1000);
        assert!(!store.reload(&path, Duration::from_millis(1500), t1).unwrap());
        assert!(Arc::ptr_eq(&first, store.bitmap().unwrap()));

        let t2 = t0 + Duration::from_millis(1600);
        assert!(store.reload(&path, Duration::from_millis(1500), t2).unwrap());
        assert_eq!(store.bitmap().unwrap().dimensions(), (6, 6));
    }

    #[test]
    fn fitted_scales_and_caches() {
        let mut store = BackgroundStore::new();
        store.set_image(RgbaImage::from_pixel(200, 100, Rgba([10, 20, 30, 255])));

        let fitted = store.fitted(20, 10).unwrap();
        assert_eq!(fitted.dimensions(), (20, 10));
        assert_eq!(fitted.get_pixel(5, 5).0, [10, 20, 30, 255]);

        assert_eq!(store.fitted(200, 100).unwrap().dimensions(), (200, 100));
    }

    #[test]
    fn clear_drops_everything() {
        let mut store = BackgroundStore::new();
        store.set_image(RgbaImage::new(2, 2));
        store.clear();
        assert!(!store.is_loaded());
        assert!(store.fitted(2, 2).is_none());
    }
}
