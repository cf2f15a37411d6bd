use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::UpdateLicenseRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};

pub async fn list_licenses(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ApiResponse::success(state.store.list_licenses()?)))
}

pub async fn get_license(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let license = state
        .store
        .get_license(id)?
        .or_not_found("license not found")?;

    Ok(Json(ApiResponse::success(license)))
}

pub async fn update_license(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateLicenseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut license = state
        .store
        .get_license(id)?
        .or_not_found("license not found")?;

    if let Some(name) = req.name {
        license.name = name.trim().to_string();
    }
    if let Some(content) = req.content {
        license.content = content;
    }
    if let Some(approved) = req.approved {
        license.approved = approved;
    }

    state.store.update_license(&license)?;

    Ok(Json(ApiResponse::success(license)))
}
