//! Input resolution: turn user-supplied paths into in-memory [`RawImage`]s.
//!
//! The library itself only ever sees `RawImage` values, whatever front-end
//! produced them. This module is the on-disk front-end used by the CLI:
//! files are read as-is, directories are expanded (non-recursively) to the
//! image files they contain.

use crate::error::ReaderError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extensions accepted as tag photos (case-insensitive).
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// A tag photo as supplied by the caller: opaque bytes plus a display name.
#[derive(Clone, PartialEq, Eq)]
pub struct RawImage {
    /// Name shown in the report, usually the file name.
    pub name: String,
    /// Undecoded image bytes.
    pub bytes: Vec<u8>,
    /// MIME type declared by the uploader, if any.
    pub mime_type: Option<String>,
}

impl std::fmt::Debug for RawImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawImage")
            .field("name", &self.name)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl RawImage {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Read an image file. The MIME type is inferred from the extension.
    pub fn from_path(path: &Path) -> Result<Self, ReaderError> {
        if !path.is_file() {
            return Err(ReaderError::ImageNotFound {
                path: path.to_path_buf(),
            });
        }
        if !has_accepted_extension(path) {
            return Err(ReaderError::UnsupportedImage {
                path: path.to_path_buf(),
            });
        }

        let bytes = std::fs::read(path).map_err(|source| ReaderError::ImageReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        debug!("Loaded {} ({} bytes)", path.display(), bytes.len());
        Ok(Self {
            name,
            bytes,
            mime_type: mime_from_extension(path).map(str::to_string),
        })
    }
}

/// Expand a list of files and directories into the images they denote.
///
/// Files keep their argument order. Each directory contributes its accepted
/// image files sorted by name; other entries are skipped silently.
/// Inputs that expand to no image at all are a [`ReaderError::NoImages`].
pub fn collect_images<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<RawImage>, ReaderError> {
    let mut images = Vec::new();
    for input in inputs {
        let path = input.as_ref();
        if path.is_dir() {
            for file in list_image_files(path)? {
                images.push(RawImage::from_path(&file)?);
            }
        } else {
            images.push(RawImage::from_path(path)?);
        }
    }
    if images.is_empty() {
        return Err(ReaderError::NoImages);
    }
    Ok(images)
}

fn list_image_files(dir: &Path) -> Result<Vec<PathBuf>, ReaderError> {
    let entries = std::fs::read_dir(dir).map_err(|source| ReaderError::ImageReadFailed {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_accepted_extension(p))
        .collect();
    files.sort();
    debug!("{}: {} image files", dir.display(), files.len());
    Ok(files)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

fn has_accepted_extension(path: &Path) -> bool {
    extension(path).is_some_and(|e| ACCEPTED_EXTENSIONS.contains(&e.as_str()))
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    match extension(path)?.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
