//! Commit history endpoint.
//!
//! GET /api/v1/{repo}/history/{ref}/{*path}?count=<n>
//!
//! Newest first, at most `count` commits (default 20). Without a path the
//! whole repository's log is returned.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::{object_routes, ObjectPath};
use crate::error::Result;
use crate::lookup::SharedLookup;
use crate::models::{HistoryView, ViewData};

pub fn routes(lookup: SharedLookup) -> Router {
    let (root, nested) = object_routes("history");
    Router::new()
        .route(&root, get(get_history))
        .route(&nested, get(get_history))
        .with_state(lookup)
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_count")]
    count: usize,
}

fn default_count() -> usize {
    20
}

async fn get_history(
    State(lookup): State<SharedLookup>,
    Path(params): Path<ObjectPath>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ViewData<HistoryView>>> {
    let data = lookup
        .history(&params.repo, &params.git_ref, &params.path, query.count)
        .await?;
    Ok(Json(data))
}
