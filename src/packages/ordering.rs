use std::cmp::Ordering;

use crate::error::Result;
use crate::store::Store;
use crate::types::Version;

/// Assigns 1-based ranks to the versions that parse as strict semver, in
/// ascending precedence. Build metadata is ignored and ties keep input order.
/// Versions that do not parse get no rank.
#[must_use]
pub fn rank_versions(versions: &[Version]) -> Vec<(String, i64)> {
    let mut parsed: Vec<(&Version, semver::Version)> = versions
        .iter()
        .filter_map(|v| semver::Version::parse(&v.version).ok().map(|s| (v, s)))
        .collect();

    parsed.sort_by(|(_, a), (_, b)| precedence(a, b));

    parsed
        .into_iter()
        .zip(1..)
        .map(|((version, _), order)| (version.id.clone(), order))
        .collect()
}

fn precedence(a: &semver::Version, b: &semver::Version) -> Ordering {
    (a.major, a.minor, a.patch, &a.pre).cmp(&(b.major, b.minor, b.patch, &b.pre))
}

/// Recomputes `version_order` for every version of a package in one
/// transaction.
pub fn recompute_order(store: &dyn Store, package_id: &str) -> Result<()> {
    let versions = store.list_versions(package_id)?;
    let ranks = rank_versions(&versions);

    tracing::debug!(
        package_id,
        versions = versions.len(),
        ranked = ranks.len(),
        "Recomputing version order"
    );

    store.apply_version_order(package_id, &ranks)
}
