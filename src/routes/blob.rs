//! Blob endpoints.
//!
//! - GET /api/v1/{repo}/blob/{ref}/{*path}
//!   File content and mode as JSON.
//! - GET /api/v1/{repo}/raw/{ref}/{*path}
//!   The bytes themselves, symlinks followed, with a content type guessed
//!   from the file name.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use super::{object_routes, ObjectPath};
use crate::error::Result;
use crate::lookup::SharedLookup;
use crate::models::{Blob, BlobView, ViewData};

pub fn routes(lookup: SharedLookup) -> Router {
    let (_, blob) = object_routes("blob");
    let (_, raw) = object_routes("raw");

    Router::new()
        .route(&blob, get(get_blob))
        .route(&raw, get(get_raw))
        .with_state(lookup)
}

async fn get_blob(
    State(lookup): State<SharedLookup>,
    Path(params): Path<ObjectPath>,
) -> Result<Json<ViewData<BlobView>>> {
    let data = lookup
        .blob(&params.repo, &params.git_ref, &params.path)
        .await?;
    Ok(Json(data))
}

async fn get_raw(
    State(lookup): State<SharedLookup>,
    Path(params): Path<ObjectPath>,
) -> Result<Response> {
    let blob = lookup
        .raw(&params.repo, &params.git_ref, &params.path)
        .await?;
    let content_type = content_type(&params.path, &blob);

    let mut response = Body::from(blob.data).into_response();
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    Ok(response)
}

/// Guessed from the name; text blobs of unknown type are served as plain
/// text rather than as a download.
fn content_type(path: &str, blob: &Blob) -> String {
    match mime_guess::from_path(path).first() {
        Some(mime) => mime.to_string(),
        None if !blob.binary => "text/plain; charset=utf-8".to_string(),
        None => "application/octet-stream".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type() {
        let text = Blob::new("0".repeat(40), b"gemspec\n".to_vec(), false);
        let binary = Blob::new("0".repeat(40), vec![0, 159, 146, 150], true);

        assert_eq!(content_type("lib/dolt.css", &text), "text/css");
        assert_eq!(content_type("Gemfile", &text), "text/plain; charset=utf-8");
        assert_eq!(content_type("data", &binary), "application/octet-stream");
        assert_eq!(content_type("logo.png", &binary), "image/png");
    }
}
