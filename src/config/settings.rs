use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::auth::DEFAULT_TOKEN_TTL_SECONDS;
use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "wheelhouse.toml";

const SECRET_KEY_BYTES: usize = 64;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub core: CoreSettings,
    pub database: DatabaseSettings,
    pub packages: PackageSettings,
    pub download_stats: DownloadStatsSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreSettings {
    pub listen: String,
    pub secret_key: String,
    pub token_ttl_seconds: i64,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:9700".to_string(),
            secret_key: String::new(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/wheelhouse.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSettings {
    pub directory: PathBuf,
    /// Largest accepted upload request body.
    pub max_upload_bytes: usize,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./data/packages"),
            max_upload_bytes: 512 * 1024 * 1024,
        }
    }
}

/// Retention, in periods, of the weekly and monthly download rollups.
/// Zero disables that rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadStatsSettings {
    pub archive_weekly: u32,
    pub archive_monthly: u32,
}

impl Default for DownloadStatsSettings {
    fn default() -> Self {
        Self {
            archive_weekly: 4,
            archive_monthly: 4,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Default settings with a freshly generated secret key.
    #[must_use]
    pub fn generate() -> Self {
        let mut settings = Self::default();
        settings.core.secret_key = generate_secret_key();
        settings
    }

    pub fn validate(&self) -> Result<()> {
        if self.core.secret_key.trim().is_empty() {
            return Err(Error::Config("core.secret_key must not be empty".to_string()));
        }
        self.socket_addr()?;
        if self.core.token_ttl_seconds <= 0 {
            return Err(Error::Config(
                "core.token_ttl_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.core
            .listen
            .parse()
            .map_err(|e| Error::Config(format!("invalid listen address {:?}: {e}", self.core.listen)))
    }

    #[must_use]
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.core.token_ttl_seconds)
    }
}

fn generate_secret_key() -> String {
    let mut bytes = [0u8; SECRET_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
