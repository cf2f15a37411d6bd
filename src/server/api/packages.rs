use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{AddMaintainerRequest, PackageSearchParams};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, paginate,
};
use crate::types::{Package, PackageDetail, VersionWithFiles};

fn load_package(state: &AppState, id: &str) -> Result<Package, ApiError> {
    state.store.get_package(id)?.or_not_found("package not found")
}

pub async fn list_packages(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PackageSearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let cursor = params.cursor.as_deref().unwrap_or("");
    let search = params.search.as_deref().filter(|s| !s.trim().is_empty());

    let packages = state
        .store
        .list_packages(search, cursor, DEFAULT_PAGE_SIZE + 1)?;

    let (packages, next_cursor, has_more) =
        paginate(packages, DEFAULT_PAGE_SIZE as usize, |p| p.name.clone());

    Ok(Json(PaginatedResponse::new(packages, next_cursor, has_more)))
}

pub async fn get_package(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let package = load_package(&state, &id)?;
    let maintainers = state.store.list_maintainers(&package.id)?;

    let mut versions = Vec::new();
    for version in state.store.list_versions(&package.id)? {
        let license = match version.license_id {
            Some(license_id) => state.store.get_license(license_id)?,
            None => None,
        };
        versions.push(VersionWithFiles {
            license,
            classifiers: state.store.list_version_classifiers(&version.id)?,
            files: state.store.list_version_files(&version.id)?,
            version,
        });
    }

    Ok(Json(ApiResponse::success(PackageDetail {
        package,
        maintainers,
        versions,
    })))
}

pub async fn list_maintainers(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let package = load_package(&state, &id)?;
    let maintainers = state.store.list_maintainers(&package.id)?;

    Ok(Json(ApiResponse::success(maintainers)))
}

pub async fn add_maintainer(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<AddMaintainerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let package = load_package(&state, &id)?;

    let user = match (req.user_id.as_deref(), req.username.as_deref()) {
        (Some(user_id), _) => state.store.get_user(user_id)?,
        (None, Some(username)) => state.store.get_user_by_username(username.trim())?,
        (None, None) => return Err(ApiError::bad_request("user_id or username is required")),
    }
    .or_not_found("user not found")?;

    state.store.add_maintainer(&package.id, &user.id)?;
    tracing::info!(package = %package.name, user = %user.username, "Added maintainer");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn remove_maintainer(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let package = load_package(&state, &id)?;

    if !state.store.remove_maintainer(&package.id, &user_id)? {
        return Err(ApiError::not_found("maintainer not found"));
    }
    tracing::info!(package = %package.name, user_id, "Removed maintainer");

    Ok(StatusCode::NO_CONTENT)
}
