//! Filesystem-backed media store for uploaded ad files

use outdoor_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Maximum accepted upload size: 50 MB
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Accepted MIME types with their canonical file extensions
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
];

/// Stores uploaded files under collision-resistant names and serves them back
#[derive(Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Store a file, returning the generated filename reference.
    ///
    /// Rejects unsupported MIME types and oversized payloads before anything
    /// is written, so a rejected upload never leaves a file behind.
    pub async fn store(
        &self,
        data: &[u8],
        mime: &str,
        original_name: Option<&str>,
    ) -> Result<String> {
        let canonical_ext = ALLOWED_TYPES
            .iter()
            .find(|(allowed, _)| *allowed == mime)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| Error::UnsupportedMediaType(mime.to_string()))?;

        if data.len() > MAX_UPLOAD_BYTES {
            return Err(Error::PayloadTooLarge);
        }

        // Keep the original extension when it looks sane, otherwise fall
        // back to the one implied by the MIME type.
        let ext = original_name
            .and_then(sane_extension)
            .unwrap_or_else(|| canonical_ext.to_string());

        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        let path = self.root.join(&filename);

        tokio::fs::write(&path, data).await?;
        info!("Stored media file {} ({} bytes)", filename, data.len());

        Ok(filename)
    }

    /// Read a stored file back, with the content type implied by its extension
    pub async fn retrieve(&self, reference: &str) -> Result<(Vec<u8>, &'static str)> {
        let path = self.resolve(reference)?;

        let data = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("file not found: {}", reference))
            } else {
                Error::Io(e)
            }
        })?;

        Ok((data, content_type_for(reference)))
    }

    /// Delete a stored file; a no-op if it is already gone
    pub async fn delete(&self, reference: &str) -> Result<()> {
        let path = self.resolve(reference)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted media file {}", reference);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Resolve a reference to a path inside the store root.
    ///
    /// References are bare filenames; anything that could escape the root
    /// is rejected outright.
    fn resolve(&self, reference: &str) -> Result<PathBuf> {
        if reference.is_empty()
            || reference.contains('/')
            || reference.contains('\\')
            || reference.contains("..")
        {
            return Err(Error::NotFound(format!("file not found: {}", reference)));
        }

        Ok(self.root.join(reference))
    }
}

/// Extract a short alphanumeric extension from an uploaded filename
fn sane_extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?;
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Content type for a stored filename, by extension
fn content_type_for(reference: &str) -> &'static str {
    let ext = Path::new(reference)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}
