mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::stats::{Granularity, StatsFilter};
use crate::types::*;

/// Store defines the database interface.
///
/// Inserts that hit a uniqueness constraint return `Error::AlreadyExists` so
/// callers can tell a lost creation race from a real failure.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    fn list_users(&self, cursor: &str, limit: i32) -> Result<Vec<User>>;
    fn update_user(&self, user: &User) -> Result<()>;
    fn count_active_users(&self) -> Result<i64>;

    // Package operations
    fn create_package(&self, package: &Package) -> Result<()>;
    fn get_package(&self, id: &str) -> Result<Option<Package>>;
    fn get_package_by_name(&self, name: &str) -> Result<Option<Package>>;
    fn list_packages(&self, search: Option<&str>, cursor: &str, limit: i32)
    -> Result<Vec<Package>>;
    fn list_user_packages(&self, user_id: &str) -> Result<Vec<Package>>;
    fn count_packages(&self) -> Result<i64>;

    // Package-Maintainer M2M operations
    fn add_maintainer(&self, package_id: &str, user_id: &str) -> Result<()>;
    fn remove_maintainer(&self, package_id: &str, user_id: &str) -> Result<bool>;
    fn list_maintainers(&self, package_id: &str) -> Result<Vec<User>>;
    fn is_maintainer(&self, package_id: &str, user_id: &str) -> Result<bool>;

    // Version operations
    fn create_version(&self, version: &Version) -> Result<()>;
    fn get_version(&self, id: &str) -> Result<Option<Version>>;
    fn get_version_by_string(&self, package_id: &str, version: &str) -> Result<Option<Version>>;
    fn list_versions(&self, package_id: &str) -> Result<Vec<Version>>;
    /// Resets every version of the package to order 0, then writes `ranks`,
    /// atomically.
    fn apply_version_order(&self, package_id: &str, ranks: &[(String, i64)]) -> Result<()>;
    fn delete_version(&self, id: &str) -> Result<bool>;

    // Classifier operations
    fn get_or_create_classifier(&self, name: &str) -> Result<Classifier>;
    fn set_version_classifiers(&self, version_id: &str, classifier_ids: &[i64]) -> Result<()>;
    fn list_version_classifiers(&self, version_id: &str) -> Result<Vec<Classifier>>;

    // License operations
    fn get_or_create_license(&self, code: &str) -> Result<License>;
    fn get_license(&self, id: i64) -> Result<Option<License>>;
    fn list_licenses(&self) -> Result<Vec<License>>;
    fn update_license(&self, license: &License) -> Result<()>;
    fn count_licenses(&self) -> Result<i64>;

    // Platform operations
    fn get_or_create_platform(&self, name: &str) -> Result<Platform>;
    fn get_platform(&self, id: i64) -> Result<Option<Platform>>;
    fn list_platforms(&self) -> Result<Vec<Platform>>;

    // Version file operations
    fn create_version_file(&self, file: &VersionFile) -> Result<()>;
    fn get_version_file(&self, version_id: &str, filename: &str) -> Result<Option<VersionFile>>;
    fn get_version_file_by_path(
        &self,
        relative_path: &str,
        filename: &str,
    ) -> Result<Option<VersionFile>>;
    fn list_version_files(&self, version_id: &str) -> Result<Vec<VersionFile>>;
    fn list_package_files(&self, package_id: &str) -> Result<Vec<VersionFile>>;

    // Feature operations
    fn get_feature(&self, id: &str) -> Result<Option<Feature>>;
    fn list_features(&self) -> Result<Vec<Feature>>;
    fn set_feature(&self, id: &str, value: bool) -> Result<()>;
    /// Unknown features count as disabled.
    fn is_feature_enabled(&self, id: &str) -> Result<bool>;

    // Download stats operations
    fn ensure_download_stat(
        &self,
        granularity: Granularity,
        version_id: &str,
        bucket: &DateTime<Utc>,
    ) -> Result<()>;
    fn increment_download_stat(
        &self,
        granularity: Granularity,
        version_id: &str,
        bucket: &DateTime<Utc>,
    ) -> Result<()>;
    fn get_download_stat(
        &self,
        granularity: Granularity,
        version_id: &str,
        bucket: &DateTime<Utc>,
    ) -> Result<Option<i64>>;
    fn delete_download_stats_before(
        &self,
        granularity: Granularity,
        cutoff: &DateTime<Utc>,
    ) -> Result<usize>;
    fn download_stats_series(
        &self,
        granularity: Granularity,
        filter: &StatsFilter,
    ) -> Result<Vec<StatsItem>>;
    fn count_download_stat_rows(&self, granularity: Granularity) -> Result<i64>;
    fn total_downloads(&self) -> Result<i64>;

    fn close(&self) -> Result<()>;
}
