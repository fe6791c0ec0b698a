//! Application error types and HTTP response mapping.
//!
//! Defines `AppError` enum for all error conditions and implements Axum's
//! `IntoResponse` to automatically convert errors to appropriate HTTP responses
//! with JSON error bodies. Every variant has a stable `kind()` so callers can
//! pick a template or a redirect without matching on message text.
//!
//! Error mappings:
//! - `RepoNotFound`, `RefNotFound`, `PathNotFound`, `BrokenLink` → 404
//! - `NotATree`, `NotABlob`, `BadRequest` → 400
//! - `Timeout` → 504
//! - everything else → 500

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::ObjectKind;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Reference not found: {0}")]
    RefNotFound(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("{spec} is not a tree ({actual})")]
    NotATree { spec: String, actual: ObjectKind },

    #[error("{spec} is not a blob ({actual})")]
    NotABlob { spec: String, actual: ObjectKind },

    #[error("Invalid blame format: {0}")]
    InvalidBlameFormat(String),

    #[error("Malformed log output: {0}")]
    MalformedLog(String),

    #[error("git command failed: {command}: {stderr}")]
    GitFailed { command: String, stderr: String },

    #[error("git command timed out after {seconds}s: {command}")]
    Timeout { command: String, seconds: u64 },

    #[error("Broken symbolic link: {0}")]
    BrokenLink(String),

    #[error("Archiving is not configured")]
    ArchivingDisabled,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable identifier for the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::RepoNotFound(_) => "repository_not_found",
            AppError::RefNotFound(_) => "reference_not_found",
            AppError::PathNotFound(_) => "path_not_found",
            AppError::NotATree { .. } => "not_a_tree",
            AppError::NotABlob { .. } => "not_a_blob",
            AppError::InvalidBlameFormat(_) => "invalid_blame_format",
            AppError::MalformedLog(_) => "malformed_log",
            AppError::GitFailed { .. } => "git_failed",
            AppError::Timeout { .. } => "timeout",
            AppError::BrokenLink(_) => "broken_link",
            AppError::ArchivingDisabled => "archiving_disabled",
            AppError::BadRequest(_) => "bad_request",
            AppError::Git(_) => "git",
            AppError::Io(_) => "io",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::RepoNotFound(_)
            | AppError::RefNotFound(_)
            | AppError::PathNotFound(_)
            | AppError::BrokenLink(_) => StatusCode::NOT_FOUND,
            AppError::NotATree { .. } | AppError::NotABlob { .. } | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
