mod admin;
mod commands;
mod config;
mod stats;

pub use admin::{run_admin_change_password, run_admin_create, run_admin_feature};
pub use commands::{AdminCommands, StatsCommands};
pub use config::{run_make_config, run_migrate};
pub use stats::run_stats_cleanup;

use std::path::Path;

use crate::config::Settings;
use crate::store::{SqliteStore, Store};

/// Load and validate the configuration file.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    if !path.exists() {
        anyhow::bail!(
            "Config file not found at {}. Run 'wheelhouse make-config' first.",
            path.display()
        );
    }

    let settings = Settings::load(path)?;
    settings.validate()?;
    Ok(settings)
}

/// Open the configured database, creating its directory and schema as needed.
pub fn init_store(settings: &Settings) -> anyhow::Result<SqliteStore> {
    if let Some(parent) = settings.database.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let store = SqliteStore::new(&settings.database.path)?;
    store.initialize()?;
    Ok(store)
}
