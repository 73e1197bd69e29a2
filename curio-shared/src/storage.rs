/// Image file storage
///
/// Uploaded collection images are validated by decoding them, then
/// written under `uploads/collection/` inside the configured media
/// root. The stored filename is a fresh UUID v4 plus the extension of
/// the *detected* format; nothing from the client-supplied filename is
/// ever used, so stored paths are unique per upload and cannot collide
/// or traverse.
///
/// The store also owns the cleanup contract: callers delete the
/// previous file when an image is replaced and when the owning
/// collection is deleted.
///
/// # Example
///
/// ```no_run
/// use curio_shared::storage::ImageStore;
///
/// # fn example(png_bytes: &[u8]) -> Result<(), curio_shared::storage::StorageError> {
/// let store = ImageStore::new("media");
/// let reference = store.save_collection_image(png_bytes)?;
/// assert!(reference.starts_with("uploads/collection/"));
/// store.delete(&reference)?;
/// # Ok(())
/// # }
/// ```

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Directory (relative to the media root) for collection images
pub const COLLECTION_UPLOAD_DIR: &str = "uploads/collection";

/// Error type for image storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Payload could not be decoded as an image
    #[error("payload is not a valid image: {0}")]
    InvalidImage(String),

    /// A stored reference escapes the media root
    #[error("invalid image reference: {0:?}")]
    InvalidReference(String),

    /// Underlying filesystem failure
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Filesystem-backed image store rooted at a media directory
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Creates a store rooted at `root`
    ///
    /// The directory tree is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Validates and stores a collection image payload
    ///
    /// The payload must fully decode as an image; anything else is
    /// rejected before any file is written. Returns the relative
    /// reference to persist on the collection.
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidImage` if the payload does not decode
    /// - `StorageError::Io` if the file cannot be written
    pub fn save_collection_image(&self, payload: &[u8]) -> Result<String, StorageError> {
        if payload.is_empty() {
            return Err(StorageError::InvalidImage("empty payload".to_string()));
        }

        let format = image::guess_format(payload)
            .map_err(|e| StorageError::InvalidImage(e.to_string()))?;

        // A recognizable magic number is not enough; the payload must
        // actually decode.
        image::load_from_memory(payload).map_err(|e| StorageError::InvalidImage(e.to_string()))?;

        let extension = format.extensions_str().first().copied().unwrap_or("img");
        let reference = format!("{}/{}.{}", COLLECTION_UPLOAD_DIR, Uuid::new_v4(), extension);

        let path = self.root.join(&reference);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, payload)?;

        debug!(reference = %reference, bytes = payload.len(), "Stored collection image");
        Ok(reference)
    }

    /// Deletes a stored image by its reference
    ///
    /// A reference pointing at an already-missing file is not an error;
    /// the outcome (file absent) is what the caller asked for.
    ///
    /// # Errors
    ///
    /// - `StorageError::InvalidReference` for absolute or traversing
    ///   references
    /// - `StorageError::Io` for filesystem failures other than
    ///   not-found
    pub fn delete(&self, reference: &str) -> Result<(), StorageError> {
        let path = self.resolve(reference)?;

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(reference = %reference, "Deleted stored image");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(reference = %reference, "Stored image already missing");
                Ok(())
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Absolute path of a stored reference
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidReference` for absolute paths or
    /// references containing parent-directory components.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(reference);

        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir));
        if escapes {
            return Err(StorageError::InvalidReference(reference.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Builds a tiny but fully valid PNG payload
    fn sample_png() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(2, 2, image::Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encoding a known-good image should succeed");
        bytes
    }

    fn temp_store() -> ImageStore {
        let dir = std::env::temp_dir().join(format!("curio-storage-test-{}", Uuid::new_v4()));
        ImageStore::new(dir)
    }

    #[test]
    fn test_save_and_delete_roundtrip() {
        let store = temp_store();
        let reference = store
            .save_collection_image(&sample_png())
            .expect("valid PNG should store");

        assert!(reference.starts_with("uploads/collection/"));
        assert!(reference.ends_with(".png"));

        let path = store.resolve(&reference).expect("reference should resolve");
        assert!(path.exists());

        store.delete(&reference).expect("delete should succeed");
        assert!(!path.exists());
    }

    #[test]
    fn test_generated_references_are_unique() {
        let store = temp_store();
        let payload = sample_png();

        let first = store.save_collection_image(&payload).unwrap();
        let second = store.save_collection_image(&payload).unwrap();
        assert_ne!(first, second);

        store.delete(&first).unwrap();
        store.delete(&second).unwrap();
    }

    #[test]
    fn test_rejects_non_image_payload() {
        let store = temp_store();

        let result = store.save_collection_image(b"definitely not an image");
        assert!(matches!(result, Err(StorageError::InvalidImage(_))));
    }

    #[test]
    fn test_rejects_empty_payload() {
        let store = temp_store();

        let result = store.save_collection_image(&[]);
        assert!(matches!(result, Err(StorageError::InvalidImage(_))));
    }

    #[test]
    fn test_rejects_truncated_image() {
        let store = temp_store();
        let mut payload = sample_png();
        payload.truncate(payload.len() / 2);

        let result = store.save_collection_image(&payload);
        assert!(matches!(result, Err(StorageError::InvalidImage(_))));
    }

    #[test]
    fn test_delete_missing_file_is_ok() {
        let store = temp_store();
        store
            .delete("uploads/collection/00000000-0000-0000-0000-000000000000.png")
            .expect("missing file should not be an error");
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let store = temp_store();

        assert!(matches!(
            store.resolve("../outside.png"),
            Err(StorageError::InvalidReference(_))
        ));
        assert!(matches!(
            store.resolve("/etc/passwd"),
            Err(StorageError::InvalidReference(_))
        ));
    }
}
