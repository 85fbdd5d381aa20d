//! Scoped local staging files for synthesized copies.
//!
//! FTP has no server-side copy, so a copy is download-then-upload through
//! a local temp file. The file is uniquely named and removed when the
//! handle drops, whichever leg failed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::fs::File;

/// Per-process allocation counter so same-instant allocations cannot
/// collide on coarse clocks.
static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// A staging file slot. Allocating reserves a unique path; the file
/// itself appears when the download leg creates it.
pub struct StagingFile {
    path: PathBuf,
}

impl StagingFile {
    /// Reserve a uniquely named path under the system temp directory.
    pub fn allocate() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
        let name = format!("ftpbox-copy-{}-{}-{}", std::process::id(), timestamp, seq);
        Self {
            path: std::env::temp_dir().join(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open for writing (download leg), truncating anything stale.
    pub async fn create(&self) -> std::io::Result<File> {
        File::create(&self.path).await
    }

    /// Reopen for reading (upload leg).
    pub async fn open(&self) -> std::io::Result<File> {
        File::open(&self.path).await
    }

    fn cleanup(&mut self) {
        if self.path.exists() {
            if let Err(err) = std::fs::remove_file(&self.path) {
                log::warn!(
                    "failed to remove staging file {}: {}",
                    self.path.display(),
                    err
                );
            }
        }
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn allocations_get_distinct_paths() {
        let a = StagingFile::allocate();
        let b = StagingFile::allocate();
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn file_is_removed_on_drop() {
        let staging = StagingFile::allocate();
        let path = staging.path().to_path_buf();
        {
            let mut file = staging.create().await.unwrap();
            file.write_all(b"staged bytes").await.unwrap();
            file.flush().await.unwrap();
        }
        assert!(path.exists());
        drop(staging);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn drop_without_create_is_quiet() {
        let staging = StagingFile::allocate();
        let path = staging.path().to_path_buf();
        drop(staging);
        assert!(!path.exists());
    }
}
