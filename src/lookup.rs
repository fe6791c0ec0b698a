//! Repository lookup: resolves a repository by name, runs one accessor
//! operation and shapes the result into the view data the renderer gets.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::git::paths::{join_path, normalize_path};
use crate::git::{ArchiveFormat, Archiver, RepositoryAccess, SubmoduleUrlResolver};
use crate::models::{
    Blame, BlameView, Blob, BlobView, Commit, EntryType, EntryView, GitObject, HistoryEntry,
    HistoryView, Readme, RefTarget, RefsView, RepositoryData, Submodule, Tree, TreeEntry,
    TreeHistoryView, TreeOrBlob, TreeView, ViewData,
};
use crate::resolver::RepoResolver;

pub type SharedLookup = Arc<RepositoryLookup>;

/// A repository together with the name it was resolved from.
pub struct ResolvedRepository {
    slug: String,
    repository: Arc<dyn RepositoryAccess>,
}

impl ResolvedRepository {
    pub fn new(slug: impl Into<String>, repository: Arc<dyn RepositoryAccess>) -> Self {
        Self {
            slug: slug.into(),
            repository,
        }
    }

    /// Context merged into every view of this repository.
    pub fn data(&self) -> RepositoryData {
        RepositoryData {
            repository_slug: self.slug.clone(),
            repository_meta: self.repository.meta(),
        }
    }
}

#[async_trait]
impl RepositoryAccess for ResolvedRepository {
    fn git_dir(&self) -> &Path {
        self.repository.git_dir()
    }

    fn path_segment(&self) -> &str {
        self.repository.path_segment()
    }

    fn meta(&self) -> Option<Value> {
        self.repository.meta()
    }

    async fn rev_parse(&self, git_ref: &str, path: &str) -> Result<GitObject> {
        self.repository.rev_parse(git_ref, path).await
    }

    async fn rev_parse_oid(&self, git_ref: &str) -> Result<String> {
        self.repository.rev_parse_oid(git_ref).await
    }

    async fn rev_parse_commit(&self, git_ref: &str) -> Result<String> {
        self.repository.rev_parse_commit(git_ref).await
    }

    async fn refs(&self) -> Result<Vec<String>> {
        self.repository.refs().await
    }

    async fn tree(&self, git_ref: &str, path: &str) -> Result<Tree> {
        self.repository.tree(git_ref, path).await
    }

    async fn tree_entry(&self, git_ref: &str, path: &str) -> Result<TreeOrBlob> {
        self.repository.tree_entry(git_ref, path).await
    }

    async fn blob(&self, git_ref: &str, path: &str) -> Result<GitObject> {
        self.repository.blob(git_ref, path).await
    }

    async fn entry(&self, git_ref: &str, path: &str) -> Result<Option<TreeEntry>> {
        self.repository.entry(git_ref, path).await
    }

    async fn actual_blob(&self, git_ref: &str, path: &str) -> Result<Option<GitObject>> {
        self.repository.actual_blob(git_ref, path).await
    }

    async fn blame(&self, git_ref: &str, path: &str) -> Result<Blame> {
        self.repository.blame(git_ref, path).await
    }

    async fn log(&self, git_ref: &str, path: &str, limit: usize) -> Result<Vec<Commit>> {
        self.repository.log(git_ref, path, limit).await
    }

    async fn tree_history(
        &self,
        git_ref: &str,
        path: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        self.repository.tree_history(git_ref, path, limit).await
    }

    async fn readmes(&self, git_ref: &str, path: &str) -> Vec<TreeEntry> {
        self.repository.readmes(git_ref, path).await
    }

    async fn submodules(&self, git_ref: &str) -> Vec<Submodule> {
        self.repository.submodules(git_ref).await
    }
}

pub struct RepositoryLookup {
    resolver: Box<dyn RepoResolver>,
    archiver: Option<Archiver>,
    submodule_urls: SubmoduleUrlResolver,
}

impl RepositoryLookup {
    pub fn new(resolver: impl RepoResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            archiver: None,
            submodule_urls: SubmoduleUrlResolver::default(),
        }
    }

    pub fn with_archiver(mut self, archiver: Archiver) -> Self {
        self.archiver = Some(archiver);
        self
    }

    pub fn with_submodule_urls(mut self, submodule_urls: SubmoduleUrlResolver) -> Self {
        self.submodule_urls = submodule_urls;
        self
    }

    pub fn resolve_repository(&self, repo: &str) -> Result<ResolvedRepository> {
        let repository = self.resolver.resolve(repo)?;
        Ok(ResolvedRepository::new(repo, repository))
    }

    pub fn repositories(&self) -> Result<Vec<String>> {
        self.resolver.all()
    }

    pub async fn rev_parse_oid(&self, repo: &str, git_ref: &str) -> Result<String> {
        self.resolve_repository(repo)?.rev_parse_oid(git_ref).await
    }

    pub async fn blob(&self, repo: &str, git_ref: &str, path: &str) -> Result<ViewData<BlobView>> {
        let repository = self.resolve_repository(repo)?;
        let blob = match repository.blob(git_ref, path).await? {
            GitObject::Blob(blob) => blob,
            other => return Err(not_a_blob(git_ref, path, &other)),
        };
        let filemode = filemode(&repository, git_ref, path).await?;

        Ok(view(&repository, git_ref, path, BlobView { blob, filemode }))
    }

    /// The blob at `path` with symlinks followed, for serving raw bytes.
    pub async fn raw(&self, repo: &str, git_ref: &str, path: &str) -> Result<Blob> {
        let repository = self.resolve_repository(repo)?;
        match repository.actual_blob(git_ref, path).await? {
            Some(GitObject::Blob(blob)) => Ok(blob),
            Some(other) => Err(not_a_blob(git_ref, path, &other)),
            None => Err(AppError::PathNotFound(format!("{}:{}", git_ref, normalize_path(path)))),
        }
    }

    pub async fn tree(&self, repo: &str, git_ref: &str, path: &str) -> Result<ViewData<TreeView>> {
        let repository = self.resolve_repository(repo)?;
        let tree = self.with_browse_urls(repository.tree(git_ref, path).await?);
        let readme = readme(&repository, git_ref, path).await;

        Ok(view(&repository, git_ref, path, TreeView { tree, readme }))
    }

    pub async fn tree_entry(
        &self,
        repo: &str,
        git_ref: &str,
        path: &str,
    ) -> Result<ViewData<EntryView>> {
        let repository = self.resolve_repository(repo)?;
        let data = match repository.tree_entry(git_ref, path).await? {
            TreeOrBlob::Tree(tree) => EntryView::Tree {
                tree: self.with_browse_urls(tree),
                readme: readme(&repository, git_ref, path).await,
            },
            TreeOrBlob::Blob(blob) => EntryView::Blob {
                blob,
                filemode: filemode(&repository, git_ref, path).await?,
            },
        };

        Ok(view(&repository, git_ref, path, data))
    }

    pub async fn blame(&self, repo: &str, git_ref: &str, path: &str) -> Result<ViewData<BlameView>> {
        let repository = self.resolve_repository(repo)?;
        let blame = repository.blame(git_ref, path).await?;
        let filemode = filemode(&repository, git_ref, path).await?;

        Ok(view(&repository, git_ref, path, BlameView { blame, filemode }))
    }

    pub async fn history(
        &self,
        repo: &str,
        git_ref: &str,
        path: &str,
        count: usize,
    ) -> Result<ViewData<HistoryView>> {
        let repository = self.resolve_repository(repo)?;
        let commits = repository.log(git_ref, path, count).await?;

        Ok(view(&repository, git_ref, path, HistoryView { commits }))
    }

    pub async fn tree_history(
        &self,
        repo: &str,
        git_ref: &str,
        path: &str,
        count: usize,
    ) -> Result<ViewData<TreeHistoryView>> {
        let repository = self.resolve_repository(repo)?;
        let tree = repository.tree_history(git_ref, path, count).await?;

        Ok(view(&repository, git_ref, path, TreeHistoryView { tree }))
    }

    /// Tags and heads with their target ids, in ref name order.
    pub async fn refs(&self, repo: &str) -> Result<RefsView> {
        let repository = self.resolve_repository(repo)?;
        let names = repository.refs().await?;

        Ok(RefsView {
            repository: repository.data(),
            tags: expand_refs(&repository, &names, "refs/tags/").await?,
            heads: expand_refs(&repository, &names, "refs/heads/").await?,
        })
    }

    /// Archive of `git_ref`, keyed by the commit it resolves to.
    pub async fn archive(&self, repo: &str, git_ref: &str, format: ArchiveFormat) -> Result<PathBuf> {
        let archiver = self.archiver.as_ref().ok_or(AppError::ArchivingDisabled)?;
        let repository = self.resolve_repository(repo)?;
        let oid = repository.rev_parse_commit(git_ref).await?;

        archiver.archive(&repository, &oid, format).await
    }

    fn with_browse_urls(&self, tree: Tree) -> Tree {
        let entries = tree
            .entries
            .into_iter()
            .map(|entry| match (&entry.entry_type, &entry.url) {
                (Some(EntryType::Submodule), Some(url)) => TreeEntry {
                    browse_url: Some(self.submodule_urls.browse_url(url, &entry.oid)),
                    ..entry
                },
                _ => entry,
            })
            .collect();

        Tree {
            oid: tree.oid,
            entries,
        }
    }
}

fn view<T>(repository: &ResolvedRepository, git_ref: &str, path: &str, data: T) -> ViewData<T> {
    ViewData {
        path: path.to_string(),
        git_ref: git_ref.to_string(),
        repository: repository.data(),
        data,
    }
}

fn not_a_blob(git_ref: &str, path: &str, object: &GitObject) -> AppError {
    AppError::NotABlob {
        spec: format!("{}:{}", git_ref, normalize_path(path)),
        actual: object.kind(),
    }
}

/// Octal mode of the entry at `path`, e.g. `"100644"`.
async fn filemode(repository: &ResolvedRepository, git_ref: &str, path: &str) -> Result<Option<String>> {
    Ok(repository
        .entry(git_ref, path)
        .await?
        .map(|entry| entry.octal_filemode()))
}

/// The first README under `path`, loaded. Any failure means no readme.
async fn readme(repository: &ResolvedRepository, git_ref: &str, path: &str) -> Option<Readme> {
    let entry = repository.readmes(git_ref, path).await.into_iter().next()?;
    let blob_path = join_path(&normalize_path(path), &entry.name);

    match repository.blob(git_ref, &blob_path).await {
        Ok(GitObject::Blob(blob)) => Some(Readme {
            path: blob_path,
            blob,
        }),
        Ok(_) => None,
        Err(err) => {
            tracing::debug!(git_ref, path = %blob_path, error = %err, "readme not loaded");
            None
        }
    }
}

async fn expand_refs(
    repository: &ResolvedRepository,
    names: &[String],
    prefix: &str,
) -> Result<Vec<RefTarget>> {
    let mut targets = Vec::new();
    for full_name in names {
        if let Some(name) = full_name.strip_prefix(prefix) {
            targets.push(RefTarget {
                name: name.to_string(),
                oid: repository.rev_parse_oid(full_name).await?,
            });
        }
    }
    Ok(targets)
}
