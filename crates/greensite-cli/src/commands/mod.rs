//! Command handlers

use std::sync::Arc;

use anyhow::{Context, Result};

use greensite_core::bus::ChangeBus;
use greensite_core::remote::http::HttpBackend;
use greensite_core::{Config, RemoteBackend, SettingsStore};

pub mod config;
pub mod init;
pub mod media;
pub mod provision;
pub mod seed;
pub mod status;
pub mod watch;

/// Loaded configuration plus the backend and store built from it
pub struct App {
    pub config: Config,
    pub backend: Arc<dyn RemoteBackend>,
    pub store: SettingsStore,
}

/// Load configuration and open the store against the HTTP backend
pub fn open() -> Result<App> {
    let config = Config::load().context("Failed to load configuration")?;
    let backend: Arc<dyn RemoteBackend> = Arc::new(
        HttpBackend::new(&config).context("Failed to build remote client")?,
    );
    let store = SettingsStore::open(
        Arc::clone(&backend),
        config.snapshot_path(),
        ChangeBus::new(),
    );
    Ok(App {
        config,
        backend,
        store,
    })
}
