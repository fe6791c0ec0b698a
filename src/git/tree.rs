use crate::error::{AppError, Result};
use crate::git::paths::{join_path, normalize_path};
use crate::git::repository::GitRepository;
use crate::git::submodule::parse_config;
use crate::models::{EntryType, GitObject, Submodule, Tree, TreeEntry, TreeOrBlob};

impl GitRepository {
    /// The tree at `ref:path`, with gitlinks reconciled against
    /// `.gitmodules`. Fails with `NotATree` for any other object.
    pub async fn tree(&self, git_ref: &str, path: &str) -> Result<Tree> {
        let path = normalize_path(path);
        match self.rev_parse(git_ref, &path).await? {
            GitObject::Tree(tree) => Ok(self.annotate_tree(git_ref, &path, tree).await),
            other => Err(AppError::NotATree {
                spec: format!("{}:{}", git_ref, path),
                actual: other.kind(),
            }),
        }
    }

    /// Like `tree`, but a blob is returned as-is instead of failing.
    pub async fn tree_entry(&self, git_ref: &str, path: &str) -> Result<TreeOrBlob> {
        let path = normalize_path(path);
        match self.rev_parse(git_ref, &path).await? {
            GitObject::Tree(tree) => Ok(TreeOrBlob::Tree(
                self.annotate_tree(git_ref, &path, tree).await,
            )),
            GitObject::Blob(blob) => Ok(TreeOrBlob::Blob(blob)),
            other => Err(AppError::NotATree {
                spec: format!("{}:{}", git_ref, path),
                actual: other.kind(),
            }),
        }
    }

    /// Submodules declared in `.gitmodules` at `ref`. Empty when the file
    /// is missing or unreadable.
    pub async fn submodules(&self, git_ref: &str) -> Vec<Submodule> {
        match self.rev_parse(git_ref, ".gitmodules").await {
            Ok(GitObject::Blob(blob)) => parse_config(&String::from_utf8_lossy(&blob.data)),
            Ok(_) => Vec::new(),
            Err(err) => {
                tracing::debug!(git_ref, error = %err, "no submodules");
                Vec::new()
            }
        }
    }

    /// README-like blobs directly under `path`. Never fails: a broken
    /// lookup just means there is nothing to show.
    pub async fn readmes(&self, git_ref: &str, path: &str) -> Vec<TreeEntry> {
        match self.tree(git_ref, path).await {
            Ok(tree) => readme_entries(&tree),
            Err(err) => {
                tracing::debug!(git_ref, path, error = %err, "readme lookup failed");
                Vec::new()
            }
        }
    }

    async fn annotate_tree(&self, git_ref: &str, path: &str, tree: Tree) -> Tree {
        if tree.entries.iter().all(|e| e.entry_type.is_some()) {
            return tree;
        }

        let submodules = self.submodules(git_ref).await;
        Tree {
            oid: tree.oid,
            entries: reconcile_submodules(path, tree.entries, &submodules),
        }
    }
}

/// Retypes untyped entries whose full path matches a submodule record.
pub fn reconcile_submodules(
    dir: &str,
    entries: Vec<TreeEntry>,
    submodules: &[Submodule],
) -> Vec<TreeEntry> {
    entries
        .into_iter()
        .map(|entry| {
            if entry.entry_type.is_some() {
                return entry;
            }

            let full_path = join_path(dir, &entry.name);
            match submodules.iter().find(|s| s.path == full_path) {
                Some(submodule) => TreeEntry {
                    entry_type: Some(EntryType::Submodule),
                    url: Some(submodule.url.clone()),
                    ..entry
                },
                None => entry,
            }
        })
        .collect()
}

pub fn readme_entries(tree: &Tree) -> Vec<TreeEntry> {
    tree.entries
        .iter()
        .filter(|e| e.is_blob() && e.name.to_lowercase().contains("readme"))
        .cloned()
        .collect()
}
