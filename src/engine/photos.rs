use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::AppError;

const FALLBACK_EXTENSION: &str = "bin";
const MAX_EXTENSION_LEN: usize = 8;

/// Proof-of-delivery photos on local disk, served back under `url_prefix`.
#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
    url_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPhoto {
    pub path: PathBuf,
    pub url: String,
}

impl PhotoStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self { root, url_prefix }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub async fn ensure_root(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|err| {
            AppError::Internal(format!(
                "failed to create upload dir {}: {err}",
                self.root.display()
            ))
        })
    }

    /// Writes `bytes` under a fresh name. Never overwrites an existing file.
    pub async fn save(
        &self,
        tracking_number: &str,
        filename_hint: Option<&str>,
        bytes: &[u8],
        at: DateTime<Utc>,
    ) -> Result<StoredPhoto, AppError> {
        let file_name = photo_file_name(tracking_number, filename_hint, at);
        let path = self.root.join(&file_name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await?;
        write_or_discard(&path, &mut file, bytes).await?;

        Ok(StoredPhoto {
            path,
            url: format!("{}/{}", self.url_prefix, file_name),
        })
    }

    pub async fn remove(&self, photo: &StoredPhoto) {
        if let Err(err) = tokio::fs::remove_file(&photo.path).await {
            tracing::warn!(
                path = %photo.path.display(),
                error = %err,
                "failed to remove uncommitted photo"
            );
        }
    }
}

/// Writes and syncs `bytes` into an already-created `file` at `path`. On any
/// failure the partial file is removed before the error is returned.
async fn write_or_discard(
    path: &Path,
    file: &mut tokio::fs::File,
    bytes: &[u8],
) -> Result<(), AppError> {
    let written = async {
        file.write_all(bytes).await?;
        // tokio's File defers write errors until the next write or flush.
        file.flush().await?;
        file.sync_all().await
    }
    .await;

    if let Err(err) = written {
        if let Err(remove_err) = tokio::fs::remove_file(path).await {
            tracing::warn!(
                path = %path.display(),
                error = %remove_err,
                "failed to remove partial photo"
            );
        }
        return Err(AppError::Internal(format!(
            "failed to write photo {}: {err}",
            path.display()
        )));
    }

    Ok(())
}

/// `delivery_<tracking>_<millis>_<random>.<ext>`
pub fn photo_file_name(
    tracking_number: &str,
    filename_hint: Option<&str>,
    at: DateTime<Utc>,
) -> String {
    let tracking: String = tracking_number
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    let suffix = Uuid::new_v4().simple().to_string();

    format!(
        "delivery_{}_{}_{}.{}",
        tracking,
        at.timestamp_millis(),
        &suffix[..8],
        extension_from_hint(filename_hint)
    )
}

fn extension_from_hint(filename_hint: Option<&str>) -> String {
    filename_hint
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_comes_from_hint() {
        assert_eq!(extension_from_hint(Some("photo.JPG")), "jpg");
        assert_eq!(extension_from_hint(Some("archive.tar.gz")), "gz");
    }

    #[test]
    fn suspicious_extensions_fall_back() {
        assert_eq!(extension_from_hint(None), "bin");
        assert_eq!(extension_from_hint(Some("noext")), "bin");
        assert_eq!(extension_from_hint(Some("evil./../x")), "bin");
        assert_eq!(extension_from_hint(Some("x.verylongextension")), "bin");
    }

    #[test]
    fn file_name_strips_path_characters_from_tracking() {
        let at = Utc::now();
        let name = photo_file_name("../TRK/1", Some("p.png"), at);

        assert!(name.starts_with(&format!("delivery_TRK1_{}_", at.timestamp_millis())));
        assert!(name.ends_with(".png"));
        assert!(!name.contains('/'));
    }

    #[test]
    fn names_differ_within_the_same_millisecond() {
        let at = Utc::now();
        assert_ne!(
            photo_file_name("TRK1", None, at),
            photo_file_name("TRK1", None, at)
        );
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn failed_write_is_reported_and_partial_file_removed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("delivery_TRK1_0_deadbeef.jpg");
        tokio::fs::write(&path, b"").await.unwrap();

        // /dev/full accepts the open but fails every write with ENOSPC.
        let mut full = tokio::fs::OpenOptions::new()
            .write(true)
            .open("/dev/full")
            .await
            .unwrap();

        let err = write_or_discard(&path, &mut full, &vec![0u8; 200_000])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn save_writes_bytes_and_builds_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::new(dir.path().to_path_buf(), "/static".to_string());

        let photo = store
            .save("TRK1", Some("door.jpg"), b"jpeg-bytes", Utc::now())
            .await
            .unwrap();

        assert!(photo.url.starts_with("/static/delivery_TRK1_"));
        assert_eq!(tokio::fs::read(&photo.path).await.unwrap(), b"jpeg-bytes");

        store.remove(&photo).await;
        assert!(!photo.path.exists());
    }
}
