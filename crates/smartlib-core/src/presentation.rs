//! Presentation domain types and sync-status predicates.
//!
//! A presentation is a versioned bundle of web content backed by a
//! downloadable content package. The predicates here are read-only inputs
//! for deciding which presentations a batch should synchronize.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of a presentation on the remote service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresentationId(i64);

impl PresentationId {
    /// Wrap a raw service identifier.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw service identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PresentationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PresentationId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// The downloadable archive backing one presentation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPackage {
    /// Where the archive is fetched from.
    pub url: String,
    /// Version published by the service.
    pub version: u32,
    /// Archive size in bytes, if the catalog reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl ContentPackage {
    pub fn new(url: impl Into<String>, version: u32) -> Self {
        Self {
            url: url.into(),
            version,
            size: None,
        }
    }

    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

/// Whether a presentation is currently involved in a transfer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    /// Not queued and not downloading.
    #[default]
    Idle,
    /// Queued behind another transfer.
    Waiting,
    /// Downloading or unpacking right now.
    Syncing,
}

/// Folded sync status of a presentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Never downloaded.
    Ready,
    /// Waiting for its turn.
    Waiting,
    /// Mid-download.
    Syncing,
    /// Installed, but the service has a newer package.
    UpdateAvailable,
    /// Installed and current.
    Done,
}

/// UI-facing availability derived from [`SyncStatus`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Offer a download (or update) action.
    ToDownload,
    /// A transfer is queued or running.
    InProgress,
    /// Content is on device and current.
    Downloaded,
}

/// A presentation as known to the local catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    pub id: PresentationId,
    /// Display name; the service allows it to be missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Package currently published by the service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_package: Option<ContentPackage>,
    /// Version of the package installed on device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<u32>,
    #[serde(default)]
    pub transfer: TransferState,
}

impl Presentation {
    /// Create a presentation with no package and nothing installed.
    pub fn new(id: impl Into<PresentationId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            content_package: None,
            installed_version: None,
            transfer: TransferState::Idle,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_package(mut self, package: ContentPackage) -> Self {
        self.content_package = Some(package);
        self
    }

    #[must_use]
    pub const fn with_installed_version(mut self, version: u32) -> Self {
        self.installed_version = Some(version);
        self
    }

    #[must_use]
    pub const fn with_transfer(mut self, transfer: TransferState) -> Self {
        self.transfer = transfer;
        self
    }

    /// Name for logs and progress text.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Untitled presentation {}", self.id))
    }

    /// Never downloaded.
    pub const fn is_sync_ready(&self) -> bool {
        matches!(self.transfer, TransferState::Idle) && self.installed_version.is_none()
    }

    /// Installed, with a newer package published.
    pub fn is_update_available(&self) -> bool {
        if !matches!(self.transfer, TransferState::Idle) {
            return false;
        }
        match (self.installed_version, &self.content_package) {
            (Some(installed), Some(package)) => package.version > installed,
            _ => false,
        }
    }

    pub const fn is_sync_now(&self) -> bool {
        matches!(self.transfer, TransferState::Syncing)
    }

    pub const fn is_sync_wait(&self) -> bool {
        matches!(self.transfer, TransferState::Waiting)
    }

    /// Installed and current.
    pub fn is_sync_done(&self) -> bool {
        matches!(self.transfer, TransferState::Idle)
            && self.installed_version.is_some()
            && !self.is_update_available()
    }

    pub const fn is_content_exists(&self) -> bool {
        self.installed_version.is_some()
    }

    pub fn status(&self) -> SyncStatus {
        match self.transfer {
            TransferState::Syncing => SyncStatus::Syncing,
            TransferState::Waiting => SyncStatus::Waiting,
            TransferState::Idle if self.installed_version.is_none() => SyncStatus::Ready,
            TransferState::Idle if self.is_update_available() => SyncStatus::UpdateAvailable,
            TransferState::Idle => SyncStatus::Done,
        }
    }

    pub fn availability(&self) -> Availability {
        match self.status() {
            SyncStatus::Ready | SyncStatus::UpdateAvailable => Availability::ToDownload,
            SyncStatus::Waiting | SyncStatus::Syncing => Availability::InProgress,
            SyncStatus::Done => Availability::Downloaded,
        }
    }

    /// Whether this presentation belongs in a sync batch.
    pub fn needs_sync(&self) -> bool {
        self.content_package.is_some() && (self.is_sync_ready() || self.is_update_available())
    }
}

/// Pick the presentations a batch should synchronize, preserving input order.
///
/// Presentations without a content package are skipped even when they
/// have never been downloaded: there is nothing to fetch for them.
pub fn select_for_sync<'a, I>(presentations: I) -> Vec<Presentation>
where
    I: IntoIterator<Item = &'a Presentation>,
{
    presentations
        .into_iter()
        .filter(|p| p.needs_sync())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packaged(id: i64, version: u32) -> Presentation {
        Presentation::new(id).with_package(ContentPackage::new(
            format!("https://cdn.example.test/{id}.zip"),
            version,
        ))
    }

    #[test]
    fn never_downloaded_is_sync_ready() {
        let p = packaged(1, 3);
        assert!(p.is_sync_ready());
        assert!(!p.is_update_available());
        assert!(!p.is_sync_done());
        assert_eq!(p.status(), SyncStatus::Ready);
        assert_eq!(p.availability(), Availability::ToDownload);
    }

    #[test]
    fn newer_package_is_update_available() {
        let p = packaged(1, 3).with_installed_version(2);
        assert!(p.is_update_available());
        assert!(!p.is_sync_ready());
        assert!(p.is_content_exists());
        assert_eq!(p.status(), SyncStatus::UpdateAvailable);
    }

    #[test]
    fn current_package_is_done() {
        let p = packaged(1, 3).with_installed_version(3);
        assert!(p.is_sync_done());
        assert!(!p.needs_sync());
        assert_eq!(p.availability(), Availability::Downloaded);
    }

    #[test]
    fn transfer_state_overrides_install_state() {
        let syncing = packaged(1, 3).with_transfer(TransferState::Syncing);
        assert!(syncing.is_sync_now());
        assert!(!syncing.is_sync_ready());
        assert_eq!(syncing.status(), SyncStatus::Syncing);

        let waiting = packaged(2, 3)
            .with_installed_version(1)
            .with_transfer(TransferState::Waiting);
        assert!(waiting.is_sync_wait());
        assert!(!waiting.is_update_available());
        assert_eq!(waiting.availability(), Availability::InProgress);
    }

    #[test]
    fn select_for_sync_keeps_stale_in_order() {
        let catalog = vec![
            packaged(1, 1).with_installed_version(1),
            packaged(2, 2).with_installed_version(1),
            Presentation::new(3),
            packaged(4, 1),
            packaged(5, 1).with_transfer(TransferState::Syncing),
        ];

        let ids: Vec<_> = select_for_sync(&catalog).iter().map(|p| p.id.get()).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn display_name_falls_back_to_id() {
        assert_eq!(Presentation::new(7).display_name(), "Untitled presentation 7");
        assert_eq!(Presentation::new(7).with_name("Intro").display_name(), "Intro");
    }

    #[test]
    fn presentation_id_is_transparent_in_json() {
        let json = serde_json::to_string(&PresentationId::new(42)).unwrap();
        assert_eq!(json, "42");
    }
}
