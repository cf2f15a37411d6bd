//! Download accounting.
//!
//! Every download of a file increments one counter per enabled rollup
//! (weekly, monthly, yearly). Weekly and monthly rows are pruned after their
//! retention horizon; yearly rows are kept forever and provide the all-time
//! totals.

mod buckets;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub use buckets::Granularity;

use crate::config::DownloadStatsSettings;
use crate::error::Result;
use crate::store::Store;
use crate::types::{FEATURE_DOWNLOAD_STATS, StatsItem, VersionFile};

/// Narrows a stats series to one package or one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsFilter {
    All,
    Package(String),
    Version(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub weekly: usize,
    pub monthly: usize,
}

#[derive(Clone)]
pub struct DownloadStats {
    store: Arc<dyn Store>,
    settings: DownloadStatsSettings,
}

impl DownloadStats {
    pub fn new(store: Arc<dyn Store>, settings: DownloadStatsSettings) -> Self {
        Self { store, settings }
    }

    /// Rollups that receive new downloads under the current settings.
    #[must_use]
    pub fn granularities(&self) -> Vec<Granularity> {
        let mut enabled = Vec::with_capacity(3);
        if self.settings.archive_weekly > 0 {
            enabled.push(Granularity::Weekly);
        }
        if self.settings.archive_monthly > 0 {
            enabled.push(Granularity::Monthly);
        }
        enabled.push(Granularity::Yearly);
        enabled
    }

    pub fn record(&self, file: &VersionFile) -> Result<()> {
        self.record_at(file, Utc::now())
    }

    pub fn record_at(&self, file: &VersionFile, now: DateTime<Utc>) -> Result<()> {
        if !self.store.is_feature_enabled(FEATURE_DOWNLOAD_STATS)? {
            return Ok(());
        }

        for granularity in self.granularities() {
            let bucket = granularity.align(now);
            self.store
                .ensure_download_stat(granularity, &file.version_id, &bucket)?;
            self.store
                .increment_download_stat(granularity, &file.version_id, &bucket)?;
        }

        tracing::debug!(
            version_id = %file.version_id,
            filename = %file.filename,
            "Recorded download"
        );
        Ok(())
    }

    /// Deletes weekly and monthly rows older than their retention horizon.
    pub fn cleanup(&self, now: DateTime<Utc>) -> Result<CleanupReport> {
        let weekly_cutoff = now - Duration::days(7 * i64::from(self.settings.archive_weekly));
        let monthly_cutoff = now - Duration::days(28 * i64::from(self.settings.archive_monthly));

        let report = CleanupReport {
            weekly: self
                .store
                .delete_download_stats_before(Granularity::Weekly, &weekly_cutoff)?,
            monthly: self
                .store
                .delete_download_stats_before(Granularity::Monthly, &monthly_cutoff)?,
        };

        tracing::info!(
            weekly = report.weekly,
            monthly = report.monthly,
            "Download stats cleanup finished"
        );
        Ok(report)
    }

    pub fn total(&self) -> Result<i64> {
        self.store.total_downloads()
    }

    pub fn series(&self, granularity: Granularity, filter: &StatsFilter) -> Result<Vec<StatsItem>> {
        self.store.download_stats_series(granularity, filter)
    }
}
