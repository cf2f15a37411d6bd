use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};

pub async fn list_platforms(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(ApiResponse::success(state.store.list_platforms()?)))
}

pub async fn get_platform(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let platform = state
        .store
        .get_platform(id)?
        .or_not_found("platform not found")?;

    Ok(Json(ApiResponse::success(platform)))
}
