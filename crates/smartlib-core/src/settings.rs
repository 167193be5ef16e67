//! Sync settings and validation.
//!
//! All fields are optional so a partially filled settings file (or a bare
//! environment) falls back to defaults field by field.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Attempts per presentation before a batch abandons it.
pub const DEFAULT_MAX_FAIL_COUNT: u32 = 2;

/// Minimum gap between forwarded progress events.
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 100;

/// Per-request timeout for package downloads.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

const ENV_MAX_FAIL_COUNT: &str = "SMARTLIB_MAX_FAIL_COUNT";
const ENV_PROGRESS_INTERVAL_MS: &str = "SMARTLIB_PROGRESS_INTERVAL_MS";
const ENV_PACKAGES_DIR: &str = "SMARTLIB_PACKAGES_DIR";
const ENV_REQUEST_TIMEOUT_SECS: &str = "SMARTLIB_REQUEST_TIMEOUT_SECS";

/// Batch sync settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncSettings {
    /// Failed attempts per presentation before it is abandoned (1-20).
    pub max_fail_count: Option<u32>,

    /// Minimum milliseconds between progress events (0-10000).
    pub progress_interval_ms: Option<u64>,

    /// Directory holding one sub-directory per installed presentation.
    pub packages_directory: Option<String>,

    /// Per-request timeout in seconds (1-3600).
    pub request_timeout_secs: Option<u64>,
}

impl SyncSettings {
    /// Create settings with every default filled in.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            max_fail_count: Some(DEFAULT_MAX_FAIL_COUNT),
            progress_interval_ms: Some(DEFAULT_PROGRESS_INTERVAL_MS),
            packages_directory: None,
            request_timeout_secs: Some(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Read overrides from `SMARTLIB_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read overrides through `lookup`; unparsable values are logged and ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            max_fail_count: parse_var(&lookup, ENV_MAX_FAIL_COUNT),
            progress_interval_ms: parse_var(&lookup, ENV_PROGRESS_INTERVAL_MS),
            packages_directory: lookup(ENV_PACKAGES_DIR).filter(|v| !v.trim().is_empty()),
            request_timeout_secs: parse_var(&lookup, ENV_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Overlay `other` onto `self`, keeping fields `other` leaves unset.
    #[must_use]
    pub fn merged_with(mut self, other: &Self) -> Self {
        if other.max_fail_count.is_some() {
            self.max_fail_count = other.max_fail_count;
        }
        if other.progress_interval_ms.is_some() {
            self.progress_interval_ms = other.progress_interval_ms;
        }
        if other.packages_directory.is_some() {
            self.packages_directory.clone_from(&other.packages_directory);
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
        self
    }

    #[must_use]
    pub const fn effective_max_fail_count(&self) -> u32 {
        match self.max_fail_count {
            Some(count) => count,
            None => DEFAULT_MAX_FAIL_COUNT,
        }
    }

    #[must_use]
    pub const fn effective_progress_interval(&self) -> Duration {
        match self.progress_interval_ms {
            Some(ms) => Duration::from_millis(ms),
            None => Duration::from_millis(DEFAULT_PROGRESS_INTERVAL_MS),
        }
    }

    #[must_use]
    pub const fn effective_request_timeout(&self) -> Duration {
        match self.request_timeout_secs {
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(target: "smartlib.download", key, value = %raw, "Ignoring unparsable setting");
            None
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Max fail count must be between 1 and 20, got {0}")]
    InvalidMaxFailCount(u32),

    #[error("Progress interval must be at most 10000 ms, got {0}")]
    InvalidProgressInterval(u64),

    #[error("Request timeout must be between 1 and 3600 seconds, got {0}")]
    InvalidRequestTimeout(u64),

    #[error("Packages directory cannot be empty")]
    EmptyPackagesDirectory,
}

/// Validate settings values.
pub fn validate_settings(settings: &SyncSettings) -> Result<(), SettingsError> {
    if let Some(count) = settings.max_fail_count {
        if !(1..=20).contains(&count) {
            return Err(SettingsError::InvalidMaxFailCount(count));
        }
    }

    if let Some(ms) = settings.progress_interval_ms {
        if ms > 10_000 {
            return Err(SettingsError::InvalidProgressInterval(ms));
        }
    }

    if let Some(secs) = settings.request_timeout_secs {
        if !(1..=3600).contains(&secs) {
            return Err(SettingsError::InvalidRequestTimeout(secs));
        }
    }

    if settings
        .packages_directory
        .as_ref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(SettingsError::EmptyPackagesDirectory);
    }

    Ok(())
}
