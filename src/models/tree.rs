//! Tree, blob and raw object DTOs.
//!
//! - `Tree`: object id plus entries in git's order
//! - `TreeEntry`: single entry, with submodule url once reconciled
//! - `Blob`: blob content (text when valid UTF-8)
//! - `GitObject`: whatever a `ref:path` lookup resolved to
//! - `HistoryEntry`: tree entry plus its recent commits (tree history view)

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Commit;

/// File mode git records for symbolic links.
pub const SYMLINK_MODE: i32 = 0o120000;

/// File mode git records for gitlinks (submodule commits).
pub const GITLINK_MODE: i32 = 0o160000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tree {
    pub oid: String,
    pub entries: Vec<TreeEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    /// `None` for gitlinks until they are matched against `.gitmodules`.
    #[serde(rename = "type")]
    pub entry_type: Option<EntryType>,
    pub oid: String,
    pub filemode: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browse_url: Option<String>,
}

impl TreeEntry {
    pub fn is_blob(&self) -> bool {
        self.entry_type == Some(EntryType::Blob)
    }

    pub fn is_symlink(&self) -> bool {
        self.filemode == SYMLINK_MODE
    }

    /// Mode formatted the way `ls-tree` prints it, e.g. `100644`.
    pub fn octal_filemode(&self) -> String {
        format!("{:o}", self.filemode)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Blob,
    Tree,
    Submodule,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Blob {
    pub oid: String,
    pub size: usize,
    pub binary: bool,
    /// UTF-8 content; `None` for binary blobs.
    pub content: Option<String>,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(oid: String, data: Vec<u8>, binary: bool) -> Self {
        let content = if binary {
            None
        } else {
            String::from_utf8(data.clone()).ok()
        };

        Self {
            oid,
            size: data.len(),
            binary: binary || content.is_none(),
            content,
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
            ObjectKind::Tag => "tag",
        };
        f.write_str(name)
    }
}

/// Result of resolving `ref:path`, before any interpretation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GitObject {
    Tree(Tree),
    Blob(Blob),
    Commit { oid: String },
    Tag { oid: String },
}

impl GitObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            GitObject::Tree(_) => ObjectKind::Tree,
            GitObject::Blob(_) => ObjectKind::Blob,
            GitObject::Commit { .. } => ObjectKind::Commit,
            GitObject::Tag { .. } => ObjectKind::Tag,
        }
    }
}

/// `tree_entry` result: a reconciled tree or a plain blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeOrBlob {
    Tree(Tree),
    Blob(Blob),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub entry: TreeEntry,
    pub history: Vec<Commit>,
}
