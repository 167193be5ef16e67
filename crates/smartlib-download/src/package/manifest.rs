//! Install manifest (`installed.json`).

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use smartlib_core::{SyncError, SyncResult};

/// Record of the package version installed for one presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallManifest {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<DateTime<Utc>>,
}

impl InstallManifest {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            installed_at: Some(Utc::now()),
        }
    }

    /// Read a manifest; `Ok(None)` if none has been written.
    pub async fn read(path: &Path) -> SyncResult<Option<Self>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SyncError::from_io_error(&e)),
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| SyncError::other(format!("Invalid install manifest: {e}")))
    }

    pub async fn write(&self, path: &Path) -> SyncResult<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| SyncError::other(format!("Failed to encode install manifest: {e}")))?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| SyncError::from_io_error(&e))
    }
}
