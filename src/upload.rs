//! Local file store for uploaded image bytes.

use crate::config::Config;
use crate::error::ApiError;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

const FALLBACK_FILE_NAME: &str = "upload";

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    url_prefix: String,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.upload_dir.clone(), cfg.upload_url_prefix.clone())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn url_for(&self, stored_name: &str) -> String {
        format!("{}/{}", self.url_prefix.trim_end_matches('/'), stored_name)
    }

    /// Write `bytes` under a freshly generated name. The returned guard deletes
    /// the file again unless [`StoredFile::keep`] is called.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<StoredFile, ApiError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(ApiError::UploadDir)?;

        let name = stored_name(original_name);
        let path = self.dir.join(&name);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(ApiError::FileSave)?;

        // From here on a failed write must not leave a truncated file behind.
        let stored = StoredFile {
            url: self.url_for(&name),
            name,
            path,
            kept: false,
        };
        file.write_all(bytes).await.map_err(ApiError::FileSave)?;
        file.flush().await.map_err(ApiError::FileSave)?;

        debug!(path = %stored.path.display(), size = bytes.len(), "stored upload");
        Ok(stored)
    }
}

/// A file written by [`UploadStore::save`], removed on drop unless kept.
#[derive(Debug)]
pub struct StoredFile {
    name: String,
    path: PathBuf,
    url: String,
    kept: bool,
}

impl StoredFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Commit the file: it outlives the guard. Returns its path.
    pub fn keep(mut self) -> PathBuf {
        self.kept = true;
        std::mem::take(&mut self.path)
    }
}

impl Drop for StoredFile {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        // Blocking unlink on the current thread; a single small syscall, and
        // it must finish before the caller observes the failure.
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!(path = %self.path.display(), "removed orphaned upload"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove orphaned upload"
            ),
        }
    }
}

/// `<random token>_<sanitized original name>`; independent of clock resolution.
pub fn stored_name(original_name: &str) -> String {
    format!(
        "{}_{}",
        Uuid::new_v4().simple(),
        sanitize_file_name(original_name)
    )
}

/// Keep only the final path component and a conservative character set.
pub fn sanitize_file_name(original_name: &str) -> String {
    let base = original_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
