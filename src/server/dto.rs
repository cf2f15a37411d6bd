use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Package, User};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub can_list: bool,
    #[serde(default)]
    pub can_create: bool,
    #[serde(default)]
    pub can_download: bool,
    #[serde(default)]
    pub can_update: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub can_list: Option<bool>,
    #[serde(default)]
    pub can_create: Option<bool>,
    #[serde(default)]
    pub can_download: Option<bool>,
    #[serde(default)]
    pub can_update: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFeatureRequest {
    pub value: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateLicenseRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub approved: Option<bool>,
}

/// Identifies the user to add, by id or by username.
#[derive(Debug, Default, Deserialize)]
pub struct AddMaintainerRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PackageSearchParams {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsParams {
    /// `weekly`, `monthly` or `yearly`; monthly when absent.
    #[serde(default)]
    pub granularity: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub package: String,
    pub version: String,
    pub filename: String,
    pub sha256_digest: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct PackageSummary {
    #[serde(flatten)]
    pub package: Package,
    pub is_author: bool,
}
