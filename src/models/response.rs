//! Response bags handed to the renderer.
//!
//! Every repository view flattens the same context (`path`, `ref`,
//! `repository_slug`, `repository_meta`) next to its operation-specific
//! payload, so templates and JSON consumers see one uniform shape.

use serde::Serialize;
use serde_json::Value;

use super::{Blame, Blob, Commit, HistoryEntry, Tree};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RepositoryData {
    pub repository_slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_meta: Option<Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ViewData<T> {
    pub path: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(flatten)]
    pub repository: RepositoryData,
    #[serde(flatten)]
    pub data: T,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BlobView {
    pub blob: Blob,
    pub filemode: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TreeView {
    pub tree: Tree,
    pub readme: Option<Readme>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Readme {
    pub path: String,
    pub blob: Blob,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntryView {
    Tree {
        tree: Tree,
        readme: Option<Readme>,
    },
    Blob {
        blob: Blob,
        filemode: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BlameView {
    pub blame: Blame,
    pub filemode: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoryView {
    pub commits: Vec<Commit>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TreeHistoryView {
    pub tree: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RefsView {
    #[serde(flatten)]
    pub repository: RepositoryData,
    pub tags: Vec<RefTarget>,
    pub heads: Vec<RefTarget>,
}

/// A short ref name and the object it points at.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RefTarget {
    pub name: String,
    pub oid: String,
}
