mod account;
mod features;
mod licenses;
mod packages;
mod platforms;
mod stats;
mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::auth::hash_password;
use crate::server::AppState;
use crate::server::response::ApiError;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Account routes, any active user
        .route("/login", post(account::login))
        .route("/me", get(account::get_me))
        .route("/me", post(account::update_me))
        .route("/me/password", post(account::change_password))
        .route("/me/package", get(account::my_packages))
        // Package routes
        .route("/package", get(packages::list_packages))
        .route("/package/{id}", get(packages::get_package))
        .route("/package/{id}/maintainer", get(packages::list_maintainers))
        .route("/package/{id}/maintainer", post(packages::add_maintainer))
        .route(
            "/package/{id}/maintainer/{user_id}",
            delete(packages::remove_maintainer),
        )
        // Feature routes
        .route("/feature", get(features::list_features))
        .route("/feature/{id}", get(features::get_feature))
        .route("/feature/{id}", put(features::update_feature))
        // User routes
        .route("/user", get(users::list_users))
        .route("/user", post(users::create_user))
        .route("/user/{id}", get(users::get_user))
        .route("/user/{id}", put(users::update_user))
        // License routes
        .route("/license", get(licenses::list_licenses))
        .route("/license/{id}", get(licenses::get_license))
        .route("/license/{id}", put(licenses::update_license))
        // Platform routes
        .route("/platform", get(platforms::list_platforms))
        .route("/platform/{id}", get(platforms::get_platform))
        // Stats routes
        .route("/stats/server", get(stats::server_stats))
        .route("/stats/download/package", get(stats::all_downloads))
        .route("/stats/download/package/{id}", get(stats::package_downloads))
        .route(
            "/stats/download/package/{package_id}/version/{id}",
            get(stats::version_downloads),
        )
}

/// Builds a credential record off the async runtime.
async fn hash_in_background(state: &AppState, password: &str) -> Result<String, ApiError> {
    let password = password.to_string();
    let secret = state.settings.core.secret_key.clone();

    tokio::task::spawn_blocking(move || hash_password(&password, &secret))
        .await
        .map_err(|_| ApiError::internal("Failed to hash password"))?
        .map_err(ApiError::from)
}

/// Blank optional text means "unset".
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
