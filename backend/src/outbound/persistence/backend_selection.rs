//! One-shot startup selection between the primary and fallback backends.
//!
//! Selection runs once before any request is served. The chosen gateway is
//! kept for the life of the process; a later primary outage surfaces as
//! per-call connection failures rather than a re-route.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use super::mongo_gateway::{MongoConfig, MongoGateway};
use super::sqlite_gateway::SqliteGateway;
use crate::domain::ports::{BackendKind, StorageGateway};
use crate::settings::StorageSettings;

const LOCAL_REQUESTED: &str = "local database requested";

/// The only fatal startup failure: the fallback itself could not open.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendInitError {
    /// The embedded database file could not be opened or migrated.
    #[error("failed to open fallback database at {path}: {message}")]
    Fallback { path: PathBuf, message: String },
}

/// Outcome of backend selection.
#[derive(Clone)]
pub struct StorageSelection {
    backend: BackendKind,
    gateway: Arc<dyn StorageGateway>,
    fallback_reason: Option<String>,
}

impl StorageSelection {
    /// Backend that won selection.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Shared handle to the active gateway.
    pub fn gateway(&self) -> Arc<dyn StorageGateway> {
        Arc::clone(&self.gateway)
    }

    /// Why the fallback was chosen, when it was.
    pub fn fallback_reason(&self) -> Option<&str> {
        self.fallback_reason.as_deref()
    }
}

impl std::fmt::Debug for StorageSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSelection")
            .field("backend", &self.backend)
            .field("fallback_reason", &self.fallback_reason)
            .finish_non_exhaustive()
    }
}

/// Choose the backend for this process.
///
/// With `use_local_db` set the primary is never contacted. Otherwise the
/// primary is tried within the configured timeouts and any failure opens the
/// fallback instead.
///
/// # Errors
///
/// Returns [`BackendInitError`] only when the fallback cannot be opened.
pub async fn select_backend(
    settings: &StorageSettings,
) -> Result<StorageSelection, BackendInitError> {
    if settings.use_local_db {
        return open_fallback(settings, LOCAL_REQUESTED.to_owned()).await;
    }

    let config = MongoConfig::new(settings.mongodb_url(), settings.database_name())
        .with_connect_timeout(settings.connect_timeout())
        .with_server_selection_timeout(settings.server_selection_timeout());
    match MongoGateway::connect(&config).await {
        Ok(gateway) => {
            info!(backend = %BackendKind::Primary, database = %config.database(), "storage backend selected");
            Ok(StorageSelection {
                backend: BackendKind::Primary,
                gateway: Arc::new(gateway),
                fallback_reason: None,
            })
        }
        Err(error) => {
            warn!(error = %error, "primary storage unavailable; using fallback");
            open_fallback(settings, error.to_string()).await
        }
    }
}

async fn open_fallback(
    settings: &StorageSettings,
    reason: String,
) -> Result<StorageSelection, BackendInitError> {
    let path = settings.sqlite_path();
    let target = path.clone();
    let opened = tokio::task::spawn_blocking(move || SqliteGateway::open(&target))
        .await
        .map_err(|error| BackendInitError::Fallback {
            path: path.clone(),
            message: error.to_string(),
        })?;
    let gateway = opened.map_err(|error| BackendInitError::Fallback {
        path: path.clone(),
        message: error.to_string(),
    })?;

    info!(backend = %BackendKind::Fallback, path = %path.display(), reason = %reason, "storage backend selected");
    Ok(StorageSelection {
        backend: BackendKind::Fallback,
        gateway: Arc::new(gateway),
        fallback_reason: Some(reason),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_flag_skips_the_primary() {
        let dir = tempfile::tempdir().expect("temp dir");
        let settings = StorageSettings::local(dir.path().join("local.db"));

        let selection = select_backend(&settings).await.expect("fallback opens");

        assert_eq!(selection.backend(), BackendKind::Fallback);
        assert_eq!(selection.fallback_reason(), Some(LOCAL_REQUESTED));
        assert_eq!(selection.gateway().backend(), BackendKind::Fallback);
    }

    #[tokio::test]
    async fn missing_fallback_directory_is_fatal() {
        let dir = tempfile::tempdir().expect("temp dir");
        let settings = StorageSettings::local(dir.path().join("absent").join("aqi.db"));

        let error = select_backend(&settings).await.expect_err("cannot open");

        let BackendInitError::Fallback { path, .. } = error;
        assert!(path.ends_with("absent/aqi.db"));
    }
}
