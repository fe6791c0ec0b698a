//! Mapping repository names to repositories on disk.
//!
//! A name like `gts/mainline` is looked up under the root directory as a
//! non-bare checkout (`gts/mainline/.git`), a bare repository
//! (`gts/mainline`) or a bare repository with the conventional suffix
//! (`gts/mainline.git`).

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde_json::json;

use crate::error::{AppError, Result};
use crate::git::{GitRepository, GitRunner, RepositoryAccess};

pub trait RepoResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Arc<dyn RepositoryAccess>>;
    /// Names of every repository this resolver can serve, sorted.
    fn all(&self) -> Result<Vec<String>>;
}

pub struct DiskRepoResolver {
    root: PathBuf,
    runner: Arc<GitRunner>,
}

impl DiskRepoResolver {
    pub fn new(root: impl Into<PathBuf>, runner: Arc<GitRunner>) -> Self {
        Self {
            root: root.into(),
            runner,
        }
    }

    /// The directory to open for `name`, if there is a repository there.
    pub fn git_repo(&self, name: &str) -> Option<PathBuf> {
        if !is_safe_name(name) {
            return None;
        }

        let base = self.root.join(name);
        if base.join(".git").exists() {
            return Some(base);
        }
        if is_bare_repo(&base) {
            return Some(base);
        }

        let suffixed = self.root.join(format!("{}.git", name));
        is_bare_repo(&suffixed).then_some(suffixed)
    }
}

impl RepoResolver for DiskRepoResolver {
    fn resolve(&self, name: &str) -> Result<Arc<dyn RepositoryAccess>> {
        let path = self
            .git_repo(name)
            .ok_or_else(|| AppError::RepoNotFound(name.to_string()))?;
        tracing::debug!(name, path = %path.display(), "resolved repository");

        let mut repository = GitRepository::open(&path, Arc::clone(&self.runner))
            .map_err(|_| AppError::RepoNotFound(name.to_string()))?
            .with_path_segment(name);
        if let Some(description) = read_description(repository.git_dir()) {
            repository = repository.with_meta(json!({ "description": description }));
        }
        Ok(Arc::new(repository))
    }

    fn all(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }
            if self.git_repo(&name).is_some() {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }
}

/// Relative, non-empty, and free of `..` so a name can't leave the root.
fn is_safe_name(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// The repository's `description` file, unless it is missing, empty or
/// still the placeholder `git init` writes.
fn read_description(git_dir: &Path) -> Option<String> {
    let text = std::fs::read_to_string(git_dir.join("description")).ok()?;
    let text = text.trim();
    (!text.is_empty() && !text.starts_with("Unnamed repository")).then(|| text.to_string())
}

fn is_bare_repo(path: &Path) -> bool {
    path.join("HEAD").is_file() && path.join("objects").is_dir() && path.join("refs").is_dir()
}
