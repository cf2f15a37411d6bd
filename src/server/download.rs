use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, Method, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

use crate::auth::{Principal, require_capability};
use crate::server::AppState;
use crate::server::response::{ApiError, StoreOptionExt};
use crate::types::Capability;

/// `attachment; filename="..."` with `\` and `"` escaped inside the
/// quoted string.
fn content_disposition(filename: &str) -> String {
    let mut quoted = String::with_capacity(filename.len());
    for c in filename.chars() {
        if matches!(c, '"' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    format!("attachment; filename=\"{quoted}\"")
}

/// `GET /packages/<relative_path>/<filename>`. HEAD is answered the same
/// way but is not counted as a download.
pub async fn download(
    State(state): State<Arc<AppState>>,
    method: Method,
    Principal(user): Principal,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    require_capability(&user, Capability::Download)?;

    let (relative_path, filename) = path
        .rsplit_once('/')
        .ok_or_else(|| ApiError::not_found("file not found"))?;

    let record = state
        .store
        .get_version_file_by_path(relative_path, filename)?
        .or_not_found("file not found")?;

    let (file, size) = state
        .storage
        .open(&record.relative_path, &record.filename)
        .await?;

    if method != Method::HEAD {
        if let Err(e) = state.stats.record(&record) {
            tracing::warn!("Failed to record download of {}: {e}", record.filename);
        }
    }

    let disposition = HeaderValue::from_str(&content_disposition(&record.filename))
        .map_err(|_| ApiError::internal("Invalid filename"))?;

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    Ok(response)
}
