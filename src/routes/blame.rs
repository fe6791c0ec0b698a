//! Blame endpoint.
//!
//! GET /api/v1/{repo}/blame/{ref}/{*path}
//!
//! Returns the file as chunks of consecutive lines, each with the commit
//! that last touched them, plus the file's mode.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use super::{object_routes, ObjectPath};
use crate::error::Result;
use crate::lookup::SharedLookup;
use crate::models::{BlameView, ViewData};

pub fn routes(lookup: SharedLookup) -> Router {
    let (_, nested) = object_routes("blame");
    Router::new()
        .route(&nested, get(get_blame))
        .with_state(lookup)
}

async fn get_blame(
    State(lookup): State<SharedLookup>,
    Path(params): Path<ObjectPath>,
) -> Result<Json<ViewData<BlameView>>> {
    let data = lookup
        .blame(&params.repo, &params.git_ref, &params.path)
        .await?;
    Ok(Json(data))
}
