//! Repository-level endpoints.
//!
//! - GET /api/v1/repositories
//!   Names of every repository under the served root.
//! - GET /api/v1/{repo}/refs
//!   Tags and heads with the ids they point at.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::error::Result;
use crate::lookup::SharedLookup;
use crate::models::RefsView;

pub fn routes(lookup: SharedLookup) -> Router {
    Router::new()
        .route("/api/v1/repositories", get(list_repositories))
        .route("/api/v1/{repo}/refs", get(get_refs))
        .with_state(lookup)
}

async fn list_repositories(State(lookup): State<SharedLookup>) -> Result<Json<Vec<String>>> {
    Ok(Json(lookup.repositories()?))
}

async fn get_refs(
    State(lookup): State<SharedLookup>,
    Path(repo): Path<String>,
) -> Result<Json<RefsView>> {
    Ok(Json(lookup.refs(&repo).await?))
}
