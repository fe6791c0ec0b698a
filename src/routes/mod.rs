//! API route handlers - maps HTTP endpoints to repository lookups.
//!
//! Each submodule defines routes for a feature area:
//! - `repositories`: Repository listing and refs
//! - `tree`: Directory listings, polymorphic source view, tree history
//! - `blob`: File content as JSON and as raw bytes
//! - `blame`: Per-line commit attribution
//! - `history`: Commit log for a path
//! - `archive`: Downloadable tar.gz / zip snapshots
//!
//! Object routes take `/api/v1/{repo}/<view>/{ref}/{*path}`; the path may be
//! omitted for the repository root.

pub mod archive;
pub mod blame;
pub mod blob;
pub mod history;
pub mod repositories;
pub mod tree;

use axum::Router;
use serde::Deserialize;

use crate::lookup::SharedLookup;

pub fn create_router(lookup: SharedLookup) -> Router {
    Router::new()
        .merge(repositories::routes(lookup.clone()))
        .merge(tree::routes(lookup.clone()))
        .merge(blob::routes(lookup.clone()))
        .merge(blame::routes(lookup.clone()))
        .merge(history::routes(lookup.clone()))
        .merge(archive::routes(lookup))
}

/// `{repo}/{ref}` plus the optional trailing path.
#[derive(Debug, Deserialize)]
pub(crate) struct ObjectPath {
    pub repo: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub path: String,
}

/// Both route shapes for an object view: with and without a path.
pub(crate) fn object_routes(view: &str) -> (String, String) {
    (
        format!("/api/v1/{{repo}}/{}/{{ref}}", view),
        format!("/api/v1/{{repo}}/{}/{{ref}}/{{*path}}", view),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_routes() {
        let (root, nested) = object_routes("blob");
        assert_eq!(root, "/api/v1/{repo}/blob/{ref}");
        assert_eq!(nested, "/api/v1/{repo}/blob/{ref}/{*path}");
    }
}
