use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    response::IntoResponse,
};

use crate::auth::Principal;
use crate::packages::{ScratchFile, UploadForm};
use crate::server::AppState;
use crate::server::dto::UploadResponse;
use crate::server::response::{ApiError, ApiResponse};

/// Legacy distutils actions the index answers with 406.
const UNSUPPORTED_ACTIONS: &[&str] = &[
    "submit",
    "verify",
    "doc_upload",
    "remove_pkg",
    "user",
    "password_reset",
];

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError {
        status: e.status(),
        message: e.body_text(),
    }
}

/// `POST /` as spoken by twine and `setup.py upload`.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    Principal(user): Principal,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut action = None;
    let mut form = UploadForm::default();
    let mut scratch: Option<ScratchFile> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "content" {
            form.filename = field.file_name().unwrap_or_default().to_string();
            let mut writer = state.storage.scratch().await?;
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                writer.write(&chunk).await?;
            }
            scratch = Some(writer.finish().await?);
            continue;
        }

        let value = field.text().await.map_err(multipart_error)?;
        match name.as_str() {
            ":action" => action = Some(value),
            "name" => form.name = value,
            "version" => form.version = value,
            "summary" => form.summary = value,
            "description" => form.description = value,
            "home_page" => form.home_page = value,
            "comment" => form.comment = value,
            "license" => form.license = value,
            "author_email" => form.author_email = value,
            "maintainer_email" => form.maintainer_email = value,
            "classifiers" => form.classifiers.push(value),
            "sha256_digest" => form.sha256_digest = Some(value),
            _ => {}
        }
    }

    match action.as_deref().map(str::trim) {
        Some("file_upload") => {}
        Some(other) if UNSUPPORTED_ACTIONS.contains(&other) => {
            return Err(ApiError::not_acceptable(format!(
                "action {other:?} is not supported"
            )));
        }
        _ => return Err(ApiError::bad_request("invalid action")),
    }

    let scratch = scratch.ok_or_else(|| ApiError::bad_request("missing content"))?;
    let outcome = state.ingestor.ingest(&user, &form, scratch).await?;

    Ok(Json(ApiResponse::success(UploadResponse {
        package: outcome.package.name,
        version: outcome.version.version,
        path: format!("/packages/{}", outcome.file.download_path()),
        filename: outcome.file.filename,
        sha256_digest: outcome.file.sha256_digest,
    })))
}
