//! Startup configuration loaded via OrthoConfig.
//!
//! Settings are read once, before backend selection, from the environment,
//! an optional configuration file, and command-line flags.

use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use url::Url;

const DEFAULT_MONGODB_URL: &str = "mongodb://localhost:27017";
const DEFAULT_DATABASE_NAME: &str = "air_pollution_tracker";
const DEFAULT_SQLITE_PATH: &str = "air_quality.db";
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_SERVER_SELECTION_TIMEOUT_MS: u64 = 10_000;

const DEFAULT_FEED_ENABLED: bool = true;
const DEFAULT_FEED_ENDPOINT: &str = "https://api.openaq.org";
const DEFAULT_FEED_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_FEED_RADIUS_M: u32 = 10_000;

/// Storage backend selection settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "AQI")]
pub struct StorageSettings {
    /// Connection string for the primary document store.
    pub mongodb_url: Option<String>,
    /// Database holding the collections.
    pub database_name: Option<String>,
    /// Skip the primary attempt and open the fallback directly.
    #[ortho_config(default = false)]
    pub use_local_db: bool,
    /// File backing the embedded fallback.
    pub sqlite_path: Option<PathBuf>,
    /// Primary connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Primary server selection timeout in milliseconds.
    pub server_selection_timeout_ms: Option<u64>,
}

impl StorageSettings {
    /// Settings that always use the fallback at `path`.
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            mongodb_url: None,
            database_name: None,
            use_local_db: true,
            sqlite_path: Some(path.into()),
            connect_timeout_ms: None,
            server_selection_timeout_ms: None,
        }
    }

    /// Primary connection string, `mongodb://localhost:27017` by default.
    pub fn mongodb_url(&self) -> &str {
        self.mongodb_url.as_deref().unwrap_or(DEFAULT_MONGODB_URL)
    }

    /// Database name, `air_pollution_tracker` by default.
    pub fn database_name(&self) -> &str {
        self.database_name
            .as_deref()
            .unwrap_or(DEFAULT_DATABASE_NAME)
    }

    /// Fallback database file, `air_quality.db` by default.
    pub fn sqlite_path(&self) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SQLITE_PATH))
    }

    /// Primary connect timeout; 15 s unless configured.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(
            self.connect_timeout_ms
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS),
        )
    }

    /// Primary server selection timeout; 10 s unless configured.
    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(
            self.server_selection_timeout_ms
                .unwrap_or(DEFAULT_SERVER_SELECTION_TIMEOUT_MS),
        )
    }
}

/// Optional pollutant feed settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "AQI_FEED")]
pub struct FeedSettings {
    /// Look up live concentrations before falling back to synthetic ones.
    pub enabled: Option<bool>,
    /// Base URL of the feed API.
    pub endpoint: Option<String>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Station search radius in metres.
    pub radius_m: Option<u32>,
}

impl FeedSettings {
    /// Whether live lookups are on; defaults to `true`.
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(DEFAULT_FEED_ENABLED)
    }

    /// Parsed endpoint, falling back to the public API.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured endpoint is not a valid URL.
    pub fn endpoint(&self) -> Result<Url, url::ParseError> {
        Url::parse(self.endpoint.as_deref().unwrap_or(DEFAULT_FEED_ENDPOINT))
    }

    /// Per-request feed timeout; 5 s unless configured.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_FEED_TIMEOUT_MS))
    }

    /// Station search radius; 10 km unless configured.
    pub fn radius_m(&self) -> u32 {
        self.radius_m.unwrap_or(DEFAULT_FEED_RADIUS_M)
    }
}
