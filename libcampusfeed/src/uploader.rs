//! Asset uploader
//!
//! Turns one locally staged file into a durable public URL. Each call
//! creates at most one object; a stored object is never rolled back, so a
//! submission that fails after some uploads leaves those objects orphaned
//! (accepted at-most-once-per-asset semantics).

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::debug;

use crate::backend::ObjectStore;
use crate::error::Result;
use crate::types::{AttachmentKind, LocalFile};

const TOKEN_LEN: usize = 12;

pub struct AssetUploader<'a> {
    store: &'a dyn ObjectStore,
}

impl<'a> AssetUploader<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self { store }
    }

    /// Upload one file under its category prefix and return its public URL
    ///
    /// # Errors
    ///
    /// Returns `UploadError` if the object store rejects the write. Size,
    /// type, and quota limits are the store's concern and are not checked
    /// here.
    pub async fn upload(&self, file: &LocalFile, kind: AttachmentKind) -> Result<String> {
        let path = storage_path(file, kind);
        debug!(path = %path, bytes = file.bytes.len(), "uploading asset");

        self.store.put(&path, &file.bytes).await?;
        Ok(self.store.public_url(&path))
    }
}

/// Collision-resistant storage path: random token plus submission
/// timestamp under the category prefix, keeping the original extension
fn storage_path(file: &LocalFile, kind: AttachmentKind) -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect();
    let timestamp = chrono::Utc::now().timestamp_millis();

    match file.extension() {
        Some(ext) => format!("{}/{}-{}.{}", kind.prefix(), token, timestamp, ext),
        None => format!("{}/{}-{}", kind.prefix(), token, timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::MockBackend;

    #[test]
    fn test_storage_path_shape() {
        let file = LocalFile::new("holiday.png", vec![]);
        let path = storage_path(&file, AttachmentKind::Image);

        assert!(path.starts_with("images/"));
        assert!(path.ends_with(".png"));
        // prefix + slash + token + dash + timestamp + extension
        let name = path.strip_prefix("images/").unwrap();
        let (token, rest) = name.split_once('-').unwrap();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(rest.trim_end_matches(".png").parse::<i64>().is_ok());
    }

    #[test]
    fn test_storage_path_without_extension() {
        let file = LocalFile::new("README", vec![]);
        let path = storage_path(&file, AttachmentKind::File);
        assert!(path.starts_with("files/"));
        assert!(!path.contains('.'));
    }

    #[test]
    fn test_storage_paths_do_not_collide() {
        let file = LocalFile::new("a.png", vec![]);
        let first = storage_path(&file, AttachmentKind::Image);
        let second = storage_path(&file, AttachmentKind::Image);
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_upload_stores_object_and_returns_url() {
        let backend = MockBackend::new();
        let uploader = AssetUploader::new(&backend);

        let url = uploader
            .upload(
                &LocalFile::new("clip.mp4", vec![0, 1, 2]),
                AttachmentKind::Video,
            )
            .await
            .unwrap();

        assert!(url.starts_with("mock://media/videos/"));
        assert_eq!(backend.object_count(), 1);
        assert!(backend.object_paths()[0].starts_with("videos/"));
    }

    #[tokio::test]
    async fn test_upload_failure_surfaces_store_error() {
        let backend = MockBackend::put_failure_on(1);
        let uploader = AssetUploader::new(&backend);

        let result = uploader
            .upload(&LocalFile::new("a.png", vec![1]), AttachmentKind::Image)
            .await;

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("rejected the write"));
        assert_eq!(backend.object_count(), 0);
    }
}
