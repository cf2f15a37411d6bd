use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;

use super::{hash_in_background, non_blank};
use crate::auth::RequireAdmin;
use crate::server::AppState;
use crate::server::dto::{CreateUserRequest, PaginationParams, UpdateUserRequest};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, StoreOptionExt, paginate,
};
use crate::server::validation::{check_email, check_password, check_username};
use crate::types::{Capability, User};

fn ensure_username_free(state: &AppState, username: &str) -> Result<(), ApiError> {
    if state.store.get_user_by_username(username)?.is_some() {
        return Err(ApiError::conflict("Username already taken"));
    }
    Ok(())
}

fn ensure_email_free(state: &AppState, email: &str, user_id: &str) -> Result<(), ApiError> {
    match state.store.get_user_by_email(email)? {
        Some(other) if other.id != user_id => Err(ApiError::conflict("Email already in use")),
        _ => Ok(()),
    }
}

pub async fn create_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim();
    check_username(username)?;
    check_password(&req.password)?;
    ensure_username_free(&state, username)?;

    let mut user = User::new(username);
    user.email = non_blank(req.email);
    if let Some(email) = &user.email {
        check_email(email)?;
        ensure_email_free(&state, email, &user.id)?;
    }
    user.first_name = req.first_name.trim().to_string();
    user.last_name = req.last_name.trim().to_string();
    user.is_active = req.is_active;
    user.set(Capability::Admin, req.is_admin);
    user.set(Capability::List, req.can_list);
    user.set(Capability::Create, req.can_create);
    user.set(Capability::Download, req.can_download);
    user.set(Capability::Update, req.can_update);
    user.password = hash_in_background(&state, &req.password).await?;

    state.store.create_user(&user)?;
    tracing::info!(user = %user.username, "Created user");

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let users = state.store.list_users(cursor, DEFAULT_PAGE_SIZE + 1)?;

    let (users, next_cursor, has_more) =
        paginate(users, DEFAULT_PAGE_SIZE as usize, |u| u.username.clone());

    Ok(Json(PaginatedResponse::new(users, next_cursor, has_more)))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.store.get_user(&id)?.or_not_found("user not found")?;

    Ok(Json(ApiResponse::success(user)))
}

pub async fn update_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut user = state.store.get_user(&id)?.or_not_found("user not found")?;

    if let Some(username) = req.username {
        let username = username.trim().to_string();
        if username != user.username {
            check_username(&username)?;
            ensure_username_free(&state, &username)?;
            user.username = username;
        }
    }
    if let Some(email) = req.email {
        user.email = non_blank(Some(email));
        if let Some(email) = &user.email {
            check_email(email)?;
            ensure_email_free(&state, email, &user.id)?;
        }
    }
    if let Some(first_name) = req.first_name {
        user.first_name = first_name.trim().to_string();
    }
    if let Some(last_name) = req.last_name {
        user.last_name = last_name.trim().to_string();
    }
    if let Some(is_active) = req.is_active {
        user.is_active = is_active;
    }

    for (capability, value) in [
        (Capability::Admin, req.is_admin),
        (Capability::List, req.can_list),
        (Capability::Create, req.can_create),
        (Capability::Download, req.can_download),
        (Capability::Update, req.can_update),
    ] {
        if let Some(value) = value {
            user.set(capability, value);
        }
    }

    if let Some(password) = req.password {
        check_password(&password)?;
        user.password = hash_in_background(&state, &password).await?;
    }

    user.updated_at = Utc::now();
    state.store.update_user(&user)?;
    tracing::info!(user = %user.username, "Updated user");

    Ok(Json(ApiResponse::success(user)))
}
