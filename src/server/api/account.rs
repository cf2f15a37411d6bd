use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;

use super::{hash_in_background, non_blank};
use crate::auth::{RequireUser, authenticate_password, issue_token};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    ChangePasswordRequest, LoginRequest, LoginResponse, PackageSummary, UpdateProfileRequest,
};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation::{check_email, check_password};

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = authenticate_password(&state, &req.username, &req.password)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !user.is_active {
        return Err(ApiError::forbidden("User is inactive"));
    }

    let ttl = state.settings.token_ttl();
    let token =
        issue_token(&user.id, &state.settings.core.secret_key, ttl).map_err(Error::from)?;

    tracing::info!(user = %user.username, "Issued token");

    let authorization = format!("Bearer {token}");
    Ok((
        StatusCode::OK,
        [(header::AUTHORIZATION, authorization)],
        Json(ApiResponse::success(LoginResponse {
            token,
            expires_at: Utc::now() + ttl,
            user,
        })),
    ))
}

pub async fn get_me(RequireUser(user): RequireUser) -> impl IntoResponse {
    Json(ApiResponse::success(user))
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    RequireUser(mut user): RequireUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(email) = req.email {
        let email = non_blank(Some(email));
        if let Some(email) = &email {
            check_email(email)?;
            if let Some(other) = state.store.get_user_by_email(email)? {
                if other.id != user.id {
                    return Err(ApiError::conflict("Email already in use"));
                }
            }
        }
        user.email = email;
    }
    if let Some(first_name) = req.first_name {
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = req.last_name {
        user.last_name = last_name.trim().to_string();
    }

    user.updated_at = Utc::now();
    state.store.update_user(&user)?;

    Ok(Json(ApiResponse::success(user)))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    RequireUser(mut user): RequireUser,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if authenticate_password(&state, &user.username, &req.current_password)
        .await?
        .is_none()
    {
        return Err(ApiError::forbidden("Current password is incorrect"));
    }
    check_password(&req.new_password)?;

    user.password = hash_in_background(&state, &req.new_password).await?;
    user.updated_at = Utc::now();
    state.store.update_user(&user)?;

    tracing::info!(user = %user.username, "Password changed");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn my_packages(
    State(state): State<Arc<AppState>>,
    RequireUser(user): RequireUser,
) -> Result<impl IntoResponse, ApiError> {
    let packages: Vec<PackageSummary> = state
        .store
        .list_user_packages(&user.id)?
        .into_iter()
        .map(|package| PackageSummary {
            is_author: package.author_id == user.id,
            package,
        })
        .collect();

    Ok(Json(ApiResponse::success(packages)))
}
