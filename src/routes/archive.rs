//! Archive endpoint.
//!
//! GET /api/v1/{repo}/archive/{ref}?format=tar.gz|zip
//!
//! Serves a snapshot of the commit `ref` resolves to as an attachment.
//! Archives are cached per commit, so repeated downloads are served from
//! disk.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::git::ArchiveFormat;
use crate::lookup::SharedLookup;

pub fn routes(lookup: SharedLookup) -> Router {
    Router::new()
        .route("/api/v1/{repo}/archive/{ref}", get(get_archive))
        .with_state(lookup)
}

#[derive(Debug, Deserialize)]
struct ArchivePath {
    repo: String,
    #[serde(rename = "ref")]
    git_ref: String,
}

#[derive(Debug, Deserialize)]
struct ArchiveQuery {
    format: Option<String>,
}

async fn get_archive(
    State(lookup): State<SharedLookup>,
    Path(params): Path<ArchivePath>,
    Query(query): Query<ArchiveQuery>,
) -> Result<Response> {
    let format = match query.format.as_deref() {
        Some(format) => format.parse::<ArchiveFormat>().map_err(AppError::BadRequest)?,
        None => ArchiveFormat::default(),
    };

    let path = lookup.archive(&params.repo, &params.git_ref, format).await?;
    let bytes = tokio::fs::read(&path).await?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| format!("archive.{}", format.extension()));

    let mut response = Body::from(bytes).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(format.content_type()),
    );
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}
