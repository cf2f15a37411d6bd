mod capability;
mod models;

pub use capability::Capability;
pub use models::*;

/// Record downloads into the weekly/monthly/yearly rollups.
pub const FEATURE_DOWNLOAD_STATS: &str = "download_stats";

/// Add users matching the uploaded author/maintainer emails as package maintainers.
pub const FEATURE_AUTO_MAINTAINERS: &str = "auto_maintainers";

/// Features seeded on initialization, all disabled.
pub const DEFAULT_FEATURES: &[(&str, &str)] = &[
    (
        FEATURE_AUTO_MAINTAINERS,
        "Automatically assign maintainers on uploading package",
    ),
    (
        FEATURE_DOWNLOAD_STATS,
        "Store download statistics of packages",
    ),
];
