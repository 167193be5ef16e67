//! Archive unpacking and content swap.

use std::fs::{self, File};
use std::path::Path;

use smartlib_core::{SyncError, SyncResult};

use super::paths::PackageDestination;

fn io_err(e: &std::io::Error) -> SyncError {
    SyncError::from_io_error(e)
}

/// Extract `archive` into a fresh `staging` directory.
///
/// Blocking; run on the blocking pool.
pub fn unpack_archive(archive: &Path, staging: &Path) -> SyncResult<()> {
    if staging.exists() {
        fs::remove_dir_all(staging).map_err(|e| io_err(&e))?;
    }
    fs::create_dir_all(staging).map_err(|e| io_err(&e))?;

    let file = File::open(archive).map_err(|e| io_err(&e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| SyncError::unpack(e.to_string()))?;
    zip.extract(staging)
        .map_err(|e| SyncError::unpack(e.to_string()))?;

    tracing::debug!(
        target: "smartlib.download",
        archive = %archive.display(),
        entries = zip.len(),
        "Package unpacked"
    );
    Ok(())
}

/// Replace installed content with the staging directory.
///
/// Blocking. The previous content is moved aside first and restored if the
/// swap fails.
pub fn swap_in_content(destination: &PackageDestination) -> SyncResult<()> {
    let content = destination.content_dir();
    let backup = destination.backup_dir();
    let staging = destination.staging_dir();

    if backup.exists() {
        fs::remove_dir_all(&backup).map_err(|e| io_err(&e))?;
    }

    let had_content = content.exists();
    if had_content {
        fs::rename(&content, &backup).map_err(|e| io_err(&e))?;
    }

    if let Err(e) = fs::rename(&staging, &content) {
        if had_content {
            if let Err(restore) = fs::rename(&backup, &content) {
                tracing::warn!(
                    target: "smartlib.download",
                    backup = %backup.display(),
                    error = %restore,
                    "Failed to restore previous content after a failed swap"
                );
            }
        }
        return Err(io_err(&e));
    }

    if had_content {
        if let Err(e) = fs::remove_dir_all(&backup) {
            tracing::debug!(target: "smartlib.download", error = %e, "Failed to remove previous content");
        }
    }
    Ok(())
}
