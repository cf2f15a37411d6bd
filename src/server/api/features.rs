use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::UpdateFeatureRequest;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};

pub async fn list_features(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ApiResponse::success(state.store.list_features()?)))
}

pub async fn get_feature(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let feature = state
        .store
        .get_feature(&id)?
        .or_not_found("feature not found")?;

    Ok(Json(ApiResponse::success(feature)))
}

pub async fn update_feature(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateFeatureRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.set_feature(&id, req.value)?;
    tracing::info!(feature = %id, enabled = req.value, "Feature updated");

    let feature = state
        .store
        .get_feature(&id)?
        .or_not_found("feature not found")?;

    Ok(Json(ApiResponse::success(feature)))
}
