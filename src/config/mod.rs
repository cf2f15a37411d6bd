mod settings;

pub use settings::{
    CoreSettings, DEFAULT_CONFIG_PATH, DatabaseSettings, DownloadStatsSettings, PackageSettings,
    Settings,
};
