//! HTTP content-package synchronizer.
//!
//! Downloads a presentation's content package, unpacks it and records the
//! installed version. Progress goes to the `watch::Sender` handed in by the
//! batch loader; this module never emits batch events.

mod manifest;
mod paths;
mod unpack;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::{OwnedMutexGuard, watch};
use tokio_util::sync::CancellationToken;

use smartlib_core::{
    ContentPackage, Presentation, PresentationId, PresentationSynchronizerPort, SettingsError,
    SyncError, SyncProgress, SyncResult, SyncSettings, validate_settings,
};

pub use manifest::InstallManifest;
pub use paths::PackageDestination;

const USER_AGENT: &str = concat!("smartlib/", env!("CARGO_PKG_VERSION"));

/// Configuration for [`HttpPackageSynchronizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSyncConfig {
    /// Root directory holding one sub-directory per presentation.
    pub packages_directory: PathBuf,
    /// Longest wait for a connection, the response headers or the next
    /// body chunk. A transfer that keeps receiving data never times out.
    pub request_timeout: Duration,
}

impl PackageSyncConfig {
    pub fn new(packages_directory: impl Into<PathBuf>) -> Self {
        Self {
            packages_directory: packages_directory.into(),
            request_timeout: SyncSettings::with_defaults().effective_request_timeout(),
        }
    }

    /// Build from validated settings; `fallback_dir` is used when no
    /// packages directory is configured.
    pub fn from_settings(
        settings: &SyncSettings,
        fallback_dir: &Path,
    ) -> Result<Self, SettingsError> {
        validate_settings(settings)?;

        let packages_directory = settings
            .packages_directory
            .as_ref()
            .map_or_else(|| fallback_dir.to_path_buf(), PathBuf::from);

        Ok(Self {
            packages_directory,
            request_timeout: settings.effective_request_timeout(),
        })
    }
}

fn stalled(idle: Duration) -> SyncError {
    SyncError::network(format!("Transfer stalled: no data for {idle:?}"))
}

fn network_error(err: &reqwest::Error) -> SyncError {
    if err.is_timeout() {
        return SyncError::network(format!("Request timed out: {err}"));
    }
    err.status().map_or_else(
        || SyncError::network(err.to_string()),
        |status| SyncError::network_with_status(err.to_string(), status.as_u16()),
    )
}

/// Cancel handle of the newest transfer registered for a presentation.
struct Transfer {
    generation: u64,
    cancel: CancellationToken,
}

/// Removes this transfer's in-flight entry when it ends, including when the
/// caller drops the `synchronize` future. A newer transfer's entry is kept.
struct InflightGuard<'a> {
    sync: &'a HttpPackageSynchronizer,
    id: PresentationId,
    generation: u64,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        let mut inflight = self
            .sync
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if inflight
            .get(&self.id)
            .is_some_and(|t| t.generation == self.generation)
        {
            inflight.remove(&self.id);
        }
    }
}

/// Synchronizes presentations by downloading and unpacking their packages.
pub struct HttpPackageSynchronizer {
    client: reqwest::Client,
    config: PackageSyncConfig,
    /// Cancellation handles for transfers in flight.
    inflight: Mutex<HashMap<PresentationId, Transfer>>,
    /// One install at a time per presentation directory.
    install_locks: Mutex<HashMap<PresentationId, Arc<tokio::sync::Mutex<()>>>>,
    generations: AtomicU64,
}

impl HttpPackageSynchronizer {
    pub fn new(config: PackageSyncConfig) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| network_error(&e))?;

        Ok(Self {
            client,
            config,
            inflight: Mutex::new(HashMap::new()),
            install_locks: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
        })
    }

    pub const fn config(&self) -> &PackageSyncConfig {
        &self.config
    }

    pub fn destination(&self, id: PresentationId) -> PackageDestination {
        PackageDestination::plan(&self.config.packages_directory, id)
    }

    /// Version recorded by the last successful install, if any.
    pub async fn installed_version(&self, id: PresentationId) -> SyncResult<Option<u32>> {
        let manifest = InstallManifest::read(&self.destination(id).manifest_path()).await?;
        Ok(manifest.map(|m| m.version))
    }

    /// Whether a transfer for `id` is running.
    pub fn is_syncing(&self, id: &PresentationId) -> bool {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Make this transfer the one `cancel(id)` reaches, superseding (and
    /// cancelling) any earlier transfer for the same presentation.
    fn register(&self, id: PresentationId) -> (CancellationToken, InflightGuard<'_>) {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Transfer {
                    generation,
                    cancel: token.clone(),
                },
            );
        if let Some(previous) = previous {
            tracing::debug!(target: "smartlib.download", id = %id, "Superseding running package sync");
            previous.cancel.cancel();
        }
        (
            token,
            InflightGuard {
                sync: self,
                id,
                generation,
            },
        )
    }

    /// Wait until no other transfer is using the presentation directory.
    ///
    /// Returns `None` if `cancel` fires first.
    async fn acquire_install(
        &self,
        id: PresentationId,
        cancel: &CancellationToken,
    ) -> Option<OwnedMutexGuard<()>> {
        let lock = Arc::clone(
            self.install_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(id)
                .or_default(),
        );

        tokio::select! {
            biased;

            () = cancel.cancelled() => None,

            permit = lock.lock_owned() => Some(permit),
        }
    }

    async fn install(
        &self,
        id: PresentationId,
        package: &ContentPackage,
        progress: &watch::Sender<SyncProgress>,
        cancel: &CancellationToken,
    ) -> SyncResult<()> {
        let destination = self.destination(id);
        destination.ensure_dir().await?;

        tokio::select! {
            biased;

            () = cancel.cancelled() => return Err(SyncError::Cancelled),

            result = self.download(package, &destination, progress) => result?,
        }

        // Unpacking is not interruptible; a cancel is honoured before and
        // after it, leaving installed content untouched.
        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let archive = destination.archive_path();
        let staging = destination.staging_dir();
        tokio::task::spawn_blocking(move || unpack::unpack_archive(&archive, &staging))
            .await
            .map_err(|e| SyncError::other(format!("Unpack task failed: {e}")))??;

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        let swap_target = destination.clone();
        tokio::task::spawn_blocking(move || unpack::swap_in_content(&swap_target))
            .await
            .map_err(|e| SyncError::other(format!("Install task failed: {e}")))??;

        InstallManifest::new(package.version)
            .write(&destination.manifest_path())
            .await?;

        if let Err(e) = tokio::fs::remove_file(destination.archive_path()).await {
            tracing::debug!(target: "smartlib.download", id = %id, error = %e, "Failed to remove package archive");
        }

        Ok(())
    }

    /// Stream the package to `package.zip.part`, then move it into place.
    async fn download(
        &self,
        package: &ContentPackage,
        destination: &PackageDestination,
        progress: &watch::Sender<SyncProgress>,
    ) -> SyncResult<()> {
        let idle = self.config.request_timeout;
        let response = tokio::time::timeout(idle, self.client.get(&package.url).send())
            .await
            .map_err(|_| stalled(idle))?
            .map_err(|e| network_error(&e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(SyncError::not_found(format!(
                "{}: HTTP {status}",
                package.url
            )));
        }
        if !status.is_success() {
            return Err(SyncError::network_with_status(
                format!("Package download failed: HTTP {status}"),
                status.as_u16(),
            ));
        }

        let total = response.content_length().or(package.size).unwrap_or(0);
        let partial = destination.partial_path();
        let mut file = tokio::fs::File::create(&partial)
            .await
            .map_err(|e| SyncError::from_io_error(&e))?;

        let mut completed: u64 = 0;
        let mut seq: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = tokio::time::timeout(idle, stream.next())
            .await
            .map_err(|_| stalled(idle))?
        {
            let chunk = chunk.map_err(|e| network_error(&e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| SyncError::from_io_error(&e))?;

            completed += chunk.len() as u64;
            seq += 1;
            progress.send_modify(|state| {
                state.completed = completed;
                state.total = total;
                state.seq = seq;
            });
        }

        file.flush().await.map_err(|e| SyncError::from_io_error(&e))?;
        drop(file);

        tokio::fs::rename(&partial, destination.archive_path())
            .await
            .map_err(|e| SyncError::from_io_error(&e))
    }
}

#[async_trait]
impl PresentationSynchronizerPort for HttpPackageSynchronizer {
    async fn synchronize(
        &self,
        presentation: &Presentation,
        progress: watch::Sender<SyncProgress>,
    ) -> Result<(), SyncError> {
        let id = presentation.id;
        let package = presentation
            .content_package
            .as_ref()
            .ok_or_else(|| SyncError::no_content_package(id.get()))?;

        tracing::info!(
            target: "smartlib.download",
            id = %id,
            version = package.version,
            url = %package.url,
            "Syncing presentation package"
        );

        let (cancel, guard) = self.register(id);

        // A superseded transfer releases the directory once it has cleaned up.
        let Some(_permit) = self.acquire_install(id, &cancel).await else {
            drop(guard);
            tracing::info!(target: "smartlib.download", id = %id, "Package sync cancelled");
            return Err(SyncError::Cancelled);
        };

        let result = self.install(id, package, &progress, &cancel).await;

        if let Err(e) = &result {
            self.destination(id).discard_partial().await;
            if e.is_cancelled() {
                tracing::info!(target: "smartlib.download", id = %id, "Package sync cancelled");
            }
        }
        drop(guard);

        result
    }

    fn cancel(&self, id: &PresentationId) {
        let token = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|t| t.cancel.clone());
        if let Some(token) = token {
            tracing::debug!(target: "smartlib.download", id = %id, "Cancelling package sync");
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_settings_prefers_configured_dir() {
        let settings = SyncSettings {
            packages_directory: Some("/data/packages".to_string()),
            request_timeout_secs: Some(5),
            ..Default::default()
        };

        let config =
            PackageSyncConfig::from_settings(&settings, Path::new("/tmp/fallback")).unwrap();
        assert_eq!(config.packages_directory, PathBuf::from("/data/packages"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));

        let config =
            PackageSyncConfig::from_settings(&SyncSettings::default(), Path::new("/tmp/fallback"))
                .unwrap();
        assert_eq!(config.packages_directory, PathBuf::from("/tmp/fallback"));
    }

    #[test]
    fn config_from_settings_rejects_zero_timeout() {
        let settings = SyncSettings::from_lookup(|key| {
            (key == "SMARTLIB_REQUEST_TIMEOUT_SECS").then(|| "0".to_string())
        });

        assert_eq!(
            PackageSyncConfig::from_settings(&settings, Path::new("/tmp/fallback")),
            Err(SettingsError::InvalidRequestTimeout(0))
        );
    }

    #[tokio::test]
    async fn missing_package_fails_fast() {
        let root = tempfile::tempdir().unwrap();
        let sync = HttpPackageSynchronizer::new(PackageSyncConfig::new(root.path())).unwrap();
        let (tx, _rx) = watch::channel(SyncProgress::default());

        let err = sync
            .synchronize(&Presentation::new(4), tx)
            .await
            .unwrap_err();

        assert_eq!(err, SyncError::no_content_package(4));
        assert!(!sync.is_syncing(&PresentationId::new(4)));
    }

    #[test]
    fn cancel_unknown_id_is_harmless() {
        let root = tempfile::tempdir().unwrap();
        let sync = HttpPackageSynchronizer::new(PackageSyncConfig::new(root.path())).unwrap();
        sync.cancel(&PresentationId::new(1));
    }
}
