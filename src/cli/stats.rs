use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use crate::stats::DownloadStats;

use super::{init_store, load_settings};

pub fn run_stats_cleanup(config: &Path) -> anyhow::Result<()> {
    let settings = load_settings(config)?;
    let store = init_store(&settings)?;

    let stats = DownloadStats::new(Arc::new(store), settings.download_stats.clone());
    let report = stats.cleanup(Utc::now())?;

    println!("Removed {} weekly download rows", report.weekly);
    println!("Removed {} monthly download rows", report.monthly);
    Ok(())
}
