//! Destination path planning for package installs.
//!
//! Every presentation gets its own directory under the packages root:
//!
//! ```text
//! <root>/<id>/package.zip.part   while downloading
//! <root>/<id>/package.zip        downloaded, not yet unpacked
//! <root>/<id>/content.staging/   unpacking
//! <root>/<id>/content/           installed content
//! <root>/<id>/installed.json     install manifest
//! ```

use std::path::{Path, PathBuf};

use smartlib_core::{PresentationId, SyncError, SyncResult};

const PARTIAL_FILE: &str = "package.zip.part";
const ARCHIVE_FILE: &str = "package.zip";
const STAGING_DIR: &str = "content.staging";
const CONTENT_DIR: &str = "content";
const BACKUP_DIR: &str = "content.old";
const MANIFEST_FILE: &str = "installed.json";

/// A planned install destination for one presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDestination {
    /// `<root>/<id>`.
    pub presentation_dir: PathBuf,
}

impl PackageDestination {
    pub fn plan(packages_directory: &Path, id: PresentationId) -> Self {
        Self {
            presentation_dir: packages_directory.join(id.to_string()),
        }
    }

    /// Ensure the presentation directory exists, creating it if necessary.
    pub async fn ensure_dir(&self) -> SyncResult<()> {
        tokio::fs::create_dir_all(&self.presentation_dir)
            .await
            .map_err(|e| SyncError::from_io_error(&e))
    }

    pub fn partial_path(&self) -> PathBuf {
        self.presentation_dir.join(PARTIAL_FILE)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.presentation_dir.join(ARCHIVE_FILE)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.presentation_dir.join(STAGING_DIR)
    }

    pub fn content_dir(&self) -> PathBuf {
        self.presentation_dir.join(CONTENT_DIR)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.presentation_dir.join(BACKUP_DIR)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.presentation_dir.join(MANIFEST_FILE)
    }

    /// Remove leftovers of an unfinished install. Installed content stays.
    pub async fn discard_partial(&self) {
        for file in [self.partial_path(), self.archive_path()] {
            if let Err(e) = tokio::fs::remove_file(&file).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(target: "smartlib.download", path = %file.display(), error = %e, "Failed to remove partial file");
                }
            }
        }
        if let Err(e) = tokio::fs::remove_dir_all(self.staging_dir()).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(target: "smartlib.download", error = %e, "Failed to remove staging directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_uses_id_as_directory() {
        let dest = PackageDestination::plan(Path::new("/packages"), PresentationId::new(42));

        assert_eq!(dest.presentation_dir, PathBuf::from("/packages/42"));
        assert_eq!(dest.content_dir(), PathBuf::from("/packages/42/content"));
        assert_eq!(
            dest.manifest_path(),
            PathBuf::from("/packages/42/installed.json")
        );
    }

    #[test]
    fn partial_and_archive_differ() {
        let dest = PackageDestination::plan(Path::new("/packages"), PresentationId::new(1));
        assert_eq!(
            dest.partial_path(),
            PathBuf::from("/packages/1/package.zip.part")
        );
        assert_ne!(dest.partial_path(), dest.archive_path());
    }

    #[tokio::test]
    async fn discard_partial_keeps_content() {
        let root = tempfile::tempdir().unwrap();
        let dest = PackageDestination::plan(root.path(), PresentationId::new(5));
        dest.ensure_dir().await.unwrap();

        std::fs::write(dest.partial_path(), b"half").unwrap();
        std::fs::create_dir_all(dest.staging_dir()).unwrap();
        std::fs::create_dir_all(dest.content_dir()).unwrap();

        dest.discard_partial().await;

        assert!(!dest.partial_path().exists());
        assert!(!dest.staging_dir().exists());
        assert!(dest.content_dir().exists());
    }
}
