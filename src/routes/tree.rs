//! Tree endpoints.
//!
//! - GET /api/v1/{repo}/tree/{ref}/{*path}
//!   Directory listing with submodule links and the directory's readme.
//! - GET /api/v1/{repo}/source/{ref}/{*path}
//!   Tree or blob, tagged with `type`, for views that don't know in advance.
//! - GET /api/v1/{repo}/tree_history/{ref}/{*path}?count=<n>
//!   Every entry of the directory with its last `count` commits (default 1).

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::{object_routes, ObjectPath};
use crate::error::Result;
use crate::lookup::SharedLookup;
use crate::models::{EntryView, TreeHistoryView, TreeView, ViewData};

pub fn routes(lookup: SharedLookup) -> Router {
    let (tree_root, tree) = object_routes("tree");
    let (source_root, source) = object_routes("source");
    let (history_root, history) = object_routes("tree_history");

    Router::new()
        .route(&tree_root, get(get_tree))
        .route(&tree, get(get_tree))
        .route(&source_root, get(get_source))
        .route(&source, get(get_source))
        .route(&history_root, get(get_tree_history))
        .route(&history, get(get_tree_history))
        .with_state(lookup)
}

#[derive(Debug, Deserialize)]
struct TreeHistoryQuery {
    #[serde(default = "default_count")]
    count: usize,
}

fn default_count() -> usize {
    1
}

async fn get_tree(
    State(lookup): State<SharedLookup>,
    Path(params): Path<ObjectPath>,
) -> Result<Json<ViewData<TreeView>>> {
    let data = lookup
        .tree(&params.repo, &params.git_ref, &params.path)
        .await?;
    Ok(Json(data))
}

async fn get_source(
    State(lookup): State<SharedLookup>,
    Path(params): Path<ObjectPath>,
) -> Result<Json<ViewData<EntryView>>> {
    let data = lookup
        .tree_entry(&params.repo, &params.git_ref, &params.path)
        .await?;
    Ok(Json(data))
}

async fn get_tree_history(
    State(lookup): State<SharedLookup>,
    Path(params): Path<ObjectPath>,
    Query(query): Query<TreeHistoryQuery>,
) -> Result<Json<ViewData<TreeHistoryView>>> {
    let data = lookup
        .tree_history(&params.repo, &params.git_ref, &params.path, query.count)
        .await?;
    Ok(Json(data))
}
