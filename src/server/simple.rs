use std::fmt::Write;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Html,
};

use crate::auth::{Principal, require_capability};
use crate::server::AppState;
use crate::server::response::ApiError;
use crate::types::{Capability, Package};

/// PEP 503 name normalization: runs of `-`, `_` and `.` collapse to `-`,
/// lowercased.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                normalized.push('-');
            }
            in_separator = true;
        } else {
            normalized.extend(c.to_lowercase());
            in_separator = false;
        }
    }
    normalized
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn page(title: &str, links: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>{}</title></head>\n<body>\n<h1>{}</h1>\n{links}</body>\n</html>\n",
        escape(title),
        escape(title)
    ))
}

fn all_packages(state: &AppState) -> Result<Vec<Package>, ApiError> {
    Ok(state.store.list_packages(None, "", i32::MAX)?)
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    Principal(user): Principal,
) -> Result<Html<String>, ApiError> {
    require_capability(&user, Capability::List)?;

    let mut links = String::new();
    for package in all_packages(&state)? {
        let _ = writeln!(
            links,
            "<a href=\"/simple/{}/\">{}</a><br/>",
            escape(&normalize_name(&package.name)),
            escape(&package.name)
        );
    }

    Ok(page("Simple index", &links))
}

pub async fn package_links(
    State(state): State<Arc<AppState>>,
    Principal(user): Principal,
    Path(name): Path<String>,
) -> Result<Html<String>, ApiError> {
    require_capability(&user, Capability::List)?;

    let package = match state.store.get_package_by_name(&name)? {
        Some(package) => package,
        None => {
            let wanted = normalize_name(&name);
            all_packages(&state)?
                .into_iter()
                .find(|p| normalize_name(&p.name) == wanted)
                .ok_or_else(|| ApiError::not_found("package not found"))?
        }
    };

    let mut links = String::new();
    for file in state.store.list_package_files(&package.id)? {
        let _ = writeln!(
            links,
            "<a href=\"/packages/{}#sha256={}\">{}</a><br/>",
            escape(&file.download_path()),
            file.sha256_digest,
            escape(&file.filename)
        );
    }

    Ok(page(&format!("Links for {}", package.name), &links))
}
