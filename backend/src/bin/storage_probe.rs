//! Select the storage backend and report what it holds.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

use aqi_backend::domain::storage::{EntityKind, Filter};
use aqi_backend::outbound::persistence::select_backend;
use aqi_backend::settings::StorageSettings;
use clap::Parser;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// `storage-probe` command arguments.
///
/// Settings load from the environment and configuration file only; these two
/// flags are the whole command-line layer and are applied on top.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "storage-probe",
    about = "Run storage backend selection and print per-collection record counts",
    version
)]
struct CliArgs {
    /// Skip the document store and open the embedded database directly.
    #[arg(long = "local")]
    local: bool,
    /// Embedded database file. Overrides `AQI_SQLITE_PATH`.
    #[arg(long = "sqlite-path", value_name = "path")]
    sqlite_path: Option<PathBuf>,
}

impl CliArgs {
    /// Layer the command-line flags over loaded settings.
    fn apply(self, settings: &mut StorageSettings) {
        if self.local {
            settings.use_local_db = true;
        }
        if let Some(path) = self.sqlite_path {
            settings.sqlite_path = Some(path);
        }
    }
}

fn main() -> io::Result<()> {
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %error, "tracing init failed");
    }

    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let mut settings = StorageSettings::load_from_iter([OsString::from("storage-probe")])
        .map_err(|error| io::Error::other(format!("load storage settings: {error}")))?;
    args.apply(&mut settings);

    let selection = select_backend(&settings)
        .await
        .map_err(|error| io::Error::other(format!("select storage backend: {error}")))?;
    let gateway = selection.gateway();

    println!("backend={}", selection.backend());
    if let Some(reason) = selection.fallback_reason() {
        println!("fallback_reason={reason}");
    }
    for kind in EntityKind::ALL {
        let count = gateway
            .count_matching(kind, &Filter::new())
            .await
            .map_err(|error| io::Error::other(format!("count {kind}: {error}")))?;
        println!("{}_count={count}", kind.collection_name());
    }

    Ok(())
}
