use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::StatsParams;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::stats::{Granularity, StatsFilter};
use crate::types::ServerStats;

fn granularity(params: &StatsParams) -> Result<Granularity, ApiError> {
    match params.granularity.as_deref() {
        None => Ok(Granularity::Monthly),
        Some(value) => Granularity::parse(value)
            .ok_or_else(|| ApiError::bad_request(format!("unknown granularity {value:?}"))),
    }
}

pub async fn server_stats(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let stats = ServerStats {
        packages: state.store.count_packages()?,
        active_users: state.store.count_active_users()?,
        licenses: state.store.count_licenses()?,
        downloads: state.stats.total()?,
    };

    Ok(Json(ApiResponse::success(stats)))
}

pub async fn all_downloads(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let series = state
        .stats
        .series(granularity(&params)?, &StatsFilter::All)?;

    Ok(Json(ApiResponse::success(series)))
}

pub async fn package_downloads(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<StatsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let package = state
        .store
        .get_package(&id)?
        .or_not_found("package not found")?;

    let series = state
        .stats
        .series(granularity(&params)?, &StatsFilter::Package(package.id))?;

    Ok(Json(ApiResponse::success(series)))
}

pub async fn version_downloads(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((package_id, id)): Path<(String, String)>,
    Query(params): Query<StatsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let version = state
        .store
        .get_version(&id)?
        .filter(|v| v.package_id == package_id)
        .or_not_found("version not found")?;

    let series = state
        .stats
        .series(granularity(&params)?, &StatsFilter::Version(version.id))?;

    Ok(Json(ApiResponse::success(series)))
}
