use crate::error::PersistenceError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fs;
use std::path::{Path, PathBuf};

const DATA_URL_PREFIX: &str = "data:image/png;base64,";
const PRESET_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Background images on disk: a directory of presets and the single active
/// background file the segmentation engine watches.
#[derive(Debug, Clone)]
pub struct BackgroundLibrary {
    presets_dir: PathBuf,
    active_path: PathBuf,
}

impl BackgroundLibrary {
    pub fn new(presets_dir: impl Into<PathBuf>, active_path: impl Into<PathBuf>) -> Self {
        Self {
            presets_dir: presets_dir.into(),
            active_path: active_path.into(),
        }
    }

    pub fn presets_dir(&self) -> &Path {
        &self.presets_dir
    }

    pub fn active_path(&self) -> &Path {
        &self.active_path
    }

    /// Image file names in the presets directory, sorted. The directory is
    /// created when missing.
    pub fn list_presets(&self) -> Result<Vec<String>, PersistenceError> {
        fs::create_dir_all(&self.presets_dir).map_err(|source| self.io_error(&self.presets_dir, source))?;

        let entries =
            fs::read_dir(&self.presets_dir).map_err(|source| self.io_error(&self.presets_dir, source))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| self.io_error(&self.presets_dir, source))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_image_name(&name) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Decode a base64 PNG (optionally a `data:` URL) and write it as the
    /// active background.
    pub fn save_encoded(&self, data: &str) -> Result<(), PersistenceError> {
        let payload = data.trim();
        let payload = payload.strip_prefix(DATA_URL_PREFIX).unwrap_or(payload);
        if payload.is_empty() {
            return Err(PersistenceError::EmptyPayload);
        }

        let bytes = STANDARD.decode(payload)?;
        self.write_active(&bytes)?;
        tracing::info!(
            "Saved background ({} bytes) to {}",
            bytes.len(),
            self.active_path.display()
        );
        Ok(())
    }

    /// Copy the named preset over the active background.
    pub fn apply_preset(&self, name: &str) -> Result<(), PersistenceError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." || name == "." {
            return Err(PersistenceError::InvalidPresetName(name.to_string()));
        }

        let source = self.presets_dir.join(name);
        if !source.is_file() {
            return Err(PersistenceError::PresetNotFound(name.to_string()));
        }

        let bytes = fs::read(&source).map_err(|err| self.io_error(&source, err))?;
        self.write_active(&bytes)?;
        tracing::info!("Applied preset {} to {}", name, self.active_path.display());
        Ok(())
    }

    /// Write to a sibling file and rename it over the active background, so
    /// a reader polling the active path sees either the old or the new file.
    fn write_active(&self, bytes: &[u8]) -> Result<(), PersistenceError> {
        self.ensure_active_dir()?;
        let staging = self.staging_path();
        fs::write(&staging, bytes).map_err(|source| self.io_error(&staging, source))?;
        fs::rename(&staging, &self.active_path).map_err(|source| {
            let _ = fs::remove_file(&staging);
            self.io_error(&self.active_path, source)
        })
    }

    fn staging_path(&self) -> PathBuf {
        let name = self
            .active_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "background".to_string());
        self.active_path.with_file_name(format!(".{}.partial", name))
    }

    fn ensure_active_dir(&self) -> Result<(), PersistenceError> {
        match self.active_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                fs::create_dir_all(dir).map_err(|source| self.io_error(dir, source))
            }
            _ => Ok(()),
        }
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn is_image_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            PRESET_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}
