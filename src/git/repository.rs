use async_trait::async_trait;
use git2::{ErrorCode, ObjectType, Repository};
use serde_json::Value;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{AppError, Result};
use crate::git::paths::{normalize_path, resolve_link, split_path};
use crate::git::process::{GitRunner, ProcessOutput};
use crate::models::{
    Blame, Blob, Commit, EntryType, GitObject, HistoryEntry, Submodule, Tree, TreeEntry,
    TreeOrBlob,
};

/// Symlink hops `actual_blob` follows before calling the link broken.
pub const MAX_SYMLINK_DEPTH: usize = 16;

/// Read operations on one repository.
///
/// Implemented by `GitRepository` and, by explicit forwarding, by
/// `ResolvedRepository` in the lookup layer.
#[async_trait]
pub trait RepositoryAccess: Send + Sync {
    fn git_dir(&self) -> &Path;
    /// Name used for archive prefixes and cache keys.
    fn path_segment(&self) -> &str;
    fn meta(&self) -> Option<Value> {
        None
    }

    async fn rev_parse(&self, git_ref: &str, path: &str) -> Result<GitObject>;
    async fn rev_parse_oid(&self, git_ref: &str) -> Result<String>;
    async fn rev_parse_commit(&self, git_ref: &str) -> Result<String>;
    async fn refs(&self) -> Result<Vec<String>>;
    async fn tree(&self, git_ref: &str, path: &str) -> Result<Tree>;
    async fn tree_entry(&self, git_ref: &str, path: &str) -> Result<TreeOrBlob>;
    async fn blob(&self, git_ref: &str, path: &str) -> Result<GitObject>;
    async fn entry(&self, git_ref: &str, path: &str) -> Result<Option<TreeEntry>>;
    async fn actual_blob(&self, git_ref: &str, path: &str) -> Result<Option<GitObject>>;
    async fn blame(&self, git_ref: &str, path: &str) -> Result<Blame>;
    async fn log(&self, git_ref: &str, path: &str, limit: usize) -> Result<Vec<Commit>>;
    async fn tree_history(&self, git_ref: &str, path: &str, limit: usize)
        -> Result<Vec<HistoryEntry>>;
    async fn readmes(&self, git_ref: &str, path: &str) -> Vec<TreeEntry>;
    async fn submodules(&self, git_ref: &str) -> Vec<Submodule>;
}

pub struct GitRepository {
    repo: Arc<Mutex<Repository>>,
    git_dir: PathBuf,
    path_segment: String,
    meta: Option<Value>,
    runner: Arc<GitRunner>,
}

impl GitRepository {
    pub fn open<P: AsRef<Path>>(path: P, runner: Arc<GitRunner>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let repo = Repository::open(&path).map_err(|_| AppError::RepoNotFound(path_str))?;
        let git_dir = repo.path().to_path_buf();
        let path_segment = default_path_segment(&git_dir);

        Ok(Self {
            repo: Arc::new(Mutex::new(repo)),
            git_dir,
            path_segment,
            meta: None,
            runner,
        })
    }

    pub fn with_path_segment(mut self, segment: impl Into<String>) -> Self {
        self.path_segment = segment.into();
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub(crate) fn runner(&self) -> &GitRunner {
        &self.runner
    }

    /// Runs `f` against the libgit2 handle on the blocking pool.
    pub async fn with_repo<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let repo = Arc::clone(&self.repo);
        tokio::task::spawn_blocking(move || {
            let repo = repo
                .lock()
                .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
            f(&repo)
        })
        .await
        .map_err(|e| AppError::Internal(format!("git task failed: {}", e)))?
    }

    /// Runs a git subcommand and turns a failed exit into a typed error.
    pub(crate) async fn git<I, S>(&self, args: I, spec: &str) -> Result<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = self.runner.run(&self.git_dir, args).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(classify_failure(output, spec))
        }
    }

    pub async fn rev_parse(&self, git_ref: &str, path: &str) -> Result<GitObject> {
        check_revision(git_ref)?;
        let path = normalize_path(path);
        let git_ref = git_ref.to_string();

        self.with_repo(move |repo| {
            let target = repo
                .revparse_single(&git_ref)
                .map_err(|_| AppError::RefNotFound(git_ref.clone()))?;

            let object = if path.is_empty() {
                target.peel(ObjectType::Tree).unwrap_or(target)
            } else {
                let spec = format!("{}:{}", git_ref, path);
                repo.revparse_single(&spec).map_err(|e| match e.code() {
                    ErrorCode::NotFound | ErrorCode::InvalidSpec => AppError::PathNotFound(spec),
                    _ => AppError::Git(e),
                })?
            };

            to_git_object(&object)
        })
        .await
    }

    pub async fn rev_parse_oid(&self, git_ref: &str) -> Result<String> {
        check_revision(git_ref)?;
        let git_ref = git_ref.to_string();
        self.with_repo(move |repo| {
            let object = repo
                .revparse_single(&git_ref)
                .map_err(|_| AppError::RefNotFound(git_ref.clone()))?;
            Ok(object.id().to_string())
        })
        .await
    }

    /// Id of the commit `git_ref` peels to; annotated tags give their
    /// target commit rather than the tag object.
    pub async fn rev_parse_commit(&self, git_ref: &str) -> Result<String> {
        check_revision(git_ref)?;
        let git_ref = git_ref.to_string();
        self.with_repo(move |repo| {
            let commit = repo
                .revparse_single(&git_ref)
                .and_then(|object| object.peel_to_commit())
                .map_err(|_| AppError::RefNotFound(git_ref.clone()))?;
            Ok(commit.id().to_string())
        })
        .await
    }

    /// All reference names, sorted by name.
    pub async fn refs(&self) -> Result<Vec<String>> {
        self.with_repo(|repo| {
            let mut names = Vec::new();
            for reference in repo.references()? {
                if let Some(name) = reference?.name() {
                    names.push(name.to_string());
                }
            }
            names.sort();
            Ok(names)
        })
        .await
    }

    pub async fn blob(&self, git_ref: &str, path: &str) -> Result<GitObject> {
        self.rev_parse(git_ref, path).await
    }

    /// The entry for `path` in its parent tree, or `None` if there is none.
    pub async fn entry(&self, git_ref: &str, path: &str) -> Result<Option<TreeEntry>> {
        let path = normalize_path(path);
        if path.is_empty() {
            return Ok(None);
        }

        let (dir, name) = split_path(&path);
        match self.rev_parse(git_ref, dir).await {
            Ok(GitObject::Tree(tree)) => Ok(tree.entries.into_iter().find(|e| e.name == name)),
            Ok(_) | Err(AppError::PathNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Like `blob`, but follows symbolic links to the object they point at.
    pub async fn actual_blob(&self, git_ref: &str, path: &str) -> Result<Option<GitObject>> {
        let mut path = normalize_path(path);

        for _ in 0..MAX_SYMLINK_DEPTH {
            let Some(entry) = self.entry(git_ref, &path).await? else {
                return Ok(None);
            };

            let object = self.blob(git_ref, &path).await?;
            let GitObject::Blob(link) = &object else {
                return Ok(Some(object));
            };
            if !entry.is_symlink() {
                return Ok(Some(object));
            }

            let target = String::from_utf8_lossy(&link.data);
            match resolve_link(&path, target.trim_end_matches('\n')) {
                Some(next) => {
                    tracing::trace!(from = %path, to = %next, "following symlink");
                    path = next;
                }
                None => return Ok(None),
            }
        }

        Err(AppError::BrokenLink(format!("{}:{}", git_ref, path)))
    }
}

#[async_trait]
impl RepositoryAccess for GitRepository {
    fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn path_segment(&self) -> &str {
        &self.path_segment
    }

    fn meta(&self) -> Option<Value> {
        self.meta.clone()
    }

    async fn rev_parse(&self, git_ref: &str, path: &str) -> Result<GitObject> {
        GitRepository::rev_parse(self, git_ref, path).await
    }

    async fn rev_parse_oid(&self, git_ref: &str) -> Result<String> {
        GitRepository::rev_parse_oid(self, git_ref).await
    }

    async fn rev_parse_commit(&self, git_ref: &str) -> Result<String> {
        GitRepository::rev_parse_commit(self, git_ref).await
    }

    async fn refs(&self) -> Result<Vec<String>> {
        GitRepository::refs(self).await
    }

    async fn tree(&self, git_ref: &str, path: &str) -> Result<Tree> {
        GitRepository::tree(self, git_ref, path).await
    }

    async fn tree_entry(&self, git_ref: &str, path: &str) -> Result<TreeOrBlob> {
        GitRepository::tree_entry(self, git_ref, path).await
    }

    async fn blob(&self, git_ref: &str, path: &str) -> Result<GitObject> {
        GitRepository::blob(self, git_ref, path).await
    }

    async fn entry(&self, git_ref: &str, path: &str) -> Result<Option<TreeEntry>> {
        GitRepository::entry(self, git_ref, path).await
    }

    async fn actual_blob(&self, git_ref: &str, path: &str) -> Result<Option<GitObject>> {
        GitRepository::actual_blob(self, git_ref, path).await
    }

    async fn blame(&self, git_ref: &str, path: &str) -> Result<Blame> {
        GitRepository::blame(self, git_ref, path).await
    }

    async fn log(&self, git_ref: &str, path: &str, limit: usize) -> Result<Vec<Commit>> {
        GitRepository::log(self, git_ref, path, limit).await
    }

    async fn tree_history(
        &self,
        git_ref: &str,
        path: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        GitRepository::tree_history(self, git_ref, path, limit).await
    }

    async fn readmes(&self, git_ref: &str, path: &str) -> Vec<TreeEntry> {
        GitRepository::readmes(self, git_ref, path).await
    }

    async fn submodules(&self, git_ref: &str) -> Vec<Submodule> {
        GitRepository::submodules(self, git_ref).await
    }
}

/// Refuses revisions git could mistake for options.
pub(crate) fn check_revision(git_ref: &str) -> Result<()> {
    if git_ref.is_empty() || git_ref.starts_with('-') {
        return Err(AppError::RefNotFound(git_ref.to_string()));
    }
    Ok(())
}

/// Maps a failed git invocation onto the error taxonomy.
pub(crate) fn classify_failure(output: ProcessOutput, spec: &str) -> AppError {
    let stderr = output.stderr.to_ascii_lowercase();
    let matches = |patterns: &[&str]| patterns.iter().any(|p| stderr.contains(p));

    if matches(&[
        "not a valid object name",
        "bad revision",
        "unknown revision",
        "invalid object name",
        "ambiguous argument",
        "bad object",
    ]) {
        AppError::RefNotFound(spec.to_string())
    } else if matches(&["no such path", "does not exist"]) {
        AppError::PathNotFound(spec.to_string())
    } else {
        AppError::GitFailed {
            command: output.command,
            stderr: output.stderr.trim().to_string(),
        }
    }
}

fn default_path_segment(git_dir: &Path) -> String {
    let dir = if git_dir.file_name() == Some(OsStr::new(".git")) {
        git_dir.parent().unwrap_or(git_dir)
    } else {
        git_dir
    };

    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "repository".to_string())
}

fn to_git_object(object: &git2::Object) -> Result<GitObject> {
    if let Some(tree) = object.as_tree() {
        return Ok(GitObject::Tree(to_tree(tree)));
    }
    if let Some(blob) = object.as_blob() {
        return Ok(GitObject::Blob(Blob::new(
            blob.id().to_string(),
            blob.content().to_vec(),
            blob.is_binary(),
        )));
    }

    let oid = object.id().to_string();
    match object.kind() {
        Some(ObjectType::Commit) => Ok(GitObject::Commit { oid }),
        Some(ObjectType::Tag) => Ok(GitObject::Tag { oid }),
        _ => Err(AppError::Internal(format!("unexpected object type for {}", oid))),
    }
}

/// Converts a git2 tree into an unreconciled `Tree`: gitlinks come out
/// untyped.
pub(crate) fn to_tree(tree: &git2::Tree) -> Tree {
    let entries = tree
        .iter()
        .map(|entry| TreeEntry {
            name: String::from_utf8_lossy(entry.name_bytes()).to_string(),
            entry_type: match entry.kind() {
                Some(ObjectType::Blob) => Some(EntryType::Blob),
                Some(ObjectType::Tree) => Some(EntryType::Tree),
                _ => None,
            },
            oid: entry.id().to_string(),
            filemode: entry.filemode(),
            url: None,
            browse_url: None,
        })
        .collect();

    Tree {
        oid: tree.id().to_string(),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ObjectKind, SYMLINK_MODE};
    use crate::test_support::FixtureRepo;

    fn failed(stderr: &str) -> ProcessOutput {
        ProcessOutput {
            command: "git log".to_string(),
            stdout: Vec::new(),
            stderr: stderr.to_string(),
            status: Some(128),
        }
    }

    #[test]
    fn test_classify_failure_taxonomy() {
        assert!(matches!(
            classify_failure(failed("fatal: Not a valid object name nope"), "nope"),
            AppError::RefNotFound(_)
        ));
        assert!(matches!(
            classify_failure(failed("fatal: bad revision 'master; rm -fr /tmp'"), "x"),
            AppError::RefNotFound(_)
        ));
        assert!(matches!(
            classify_failure(failed("fatal: no such path 'nope' in master"), "master:nope"),
            AppError::PathNotFound(_)
        ));
        match classify_failure(failed("error: something else\n"), "master") {
            AppError::GitFailed { stderr, command } => {
                assert_eq!(stderr, "error: something else");
                assert_eq!(command, "git log");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_option_like_revisions_are_rejected() {
        assert!(matches!(check_revision("--output=/tmp/x"), Err(AppError::RefNotFound(_))));
        assert!(matches!(check_revision(""), Err(AppError::RefNotFound(_))));
        assert!(check_revision("master").is_ok());
    }

    #[test]
    fn test_open_missing_repository() {
        let fixture = FixtureRepo::new();
        let result = GitRepository::open(fixture.path().join("nope"), fixture.runner());

        assert!(matches!(result, Err(AppError::RepoNotFound(_))));
    }

    #[test]
    fn test_default_path_segment_uses_worktree_name() {
        assert_eq!(default_path_segment(Path::new("/srv/dolt/.git")), "dolt");
        assert_eq!(default_path_segment(Path::new("/srv/gitorious.git")), "gitorious.git");
    }

    #[tokio::test]
    async fn test_rev_parse_resolves_short_and_full_ids() {
        let fixture = FixtureRepo::new();
        fixture.write("Gemfile", "source \"http://rubygems.org\"\n\ngemspec\n");
        let oid = fixture.commit("Add Gemfile");
        let repo = fixture.repository();

        for git_ref in ["master", &oid[..7], oid.as_str()] {
            match repo.rev_parse(git_ref, "Gemfile").await.unwrap() {
                GitObject::Blob(blob) => {
                    assert_eq!(blob.content.as_deref(), Some("source \"http://rubygems.org\"\n\ngemspec\n"));
                }
                other => panic!("expected blob, got {:?}", other.kind()),
            }
        }
    }

    #[tokio::test]
    async fn test_rev_parse_root_is_tree() {
        let fixture = FixtureRepo::new();
        fixture.write("lib/dolt.rb", "module Dolt; end\n");
        fixture.commit("Add lib");

        let object = fixture.repository().rev_parse("master", "").await.unwrap();
        assert_eq!(object.kind(), ObjectKind::Tree);
    }

    #[tokio::test]
    async fn test_rev_parse_distinguishes_missing_ref_and_path() {
        let fixture = FixtureRepo::new();
        fixture.write("Gemfile", "gemspec\n");
        fixture.commit("Add Gemfile");
        let repo = fixture.repository();

        assert!(matches!(
            repo.rev_parse("no-such-branch", "Gemfile").await,
            Err(AppError::RefNotFound(_))
        ));
        assert!(matches!(
            repo.rev_parse("master", "no/such/file").await,
            Err(AppError::PathNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rev_parse_oid_returns_full_id() {
        let fixture = FixtureRepo::new();
        fixture.write("Gemfile", "gemspec\n");
        let oid = fixture.commit("Add Gemfile");
        let repo = fixture.repository();

        assert_eq!(repo.rev_parse_oid("master").await.unwrap(), oid);
        assert_eq!(repo.rev_parse_oid(&oid[..8]).await.unwrap(), oid);
    }

    #[tokio::test]
    async fn test_rev_parse_commit_peels_annotated_tags() {
        let fixture = FixtureRepo::new();
        fixture.write("Gemfile", "gemspec\n");
        let oid = fixture.commit("Add Gemfile");
        fixture.git(&["tag", "-a", "v1.0.0", "-m", "Release"]);
        let tag_oid = fixture.git(&["rev-parse", "v1.0.0"]);
        let repo = fixture.repository();

        assert_ne!(tag_oid, oid);
        assert_eq!(repo.rev_parse_oid("v1.0.0").await.unwrap(), tag_oid);
        assert_eq!(repo.rev_parse_commit("v1.0.0").await.unwrap(), oid);
        assert!(matches!(
            repo.rev_parse_commit("no-such-tag").await,
            Err(AppError::RefNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_refs_are_sorted() {
        let fixture = FixtureRepo::new();
        fixture.write("Gemfile", "gemspec\n");
        fixture.commit("Add Gemfile");
        fixture.git(&["tag", "v0.2.1"]);
        fixture.git(&["tag", "v0.2.0"]);
        fixture.git(&["branch", "libgit2"]);

        let refs = fixture.repository().refs().await.unwrap();
        assert_eq!(
            refs,
            vec![
                "refs/heads/libgit2",
                "refs/heads/master",
                "refs/tags/v0.2.0",
                "refs/tags/v0.2.1",
            ]
        );
    }

    #[tokio::test]
    async fn test_entry_reports_filemode() {
        let fixture = FixtureRepo::new();
        fixture.write("lib/foo.rb", "puts 1\n");
        fixture.commit("Add foo");
        let repo = fixture.repository();

        let entry = repo.entry("master", "lib/foo.rb").await.unwrap().unwrap();
        assert_eq!(entry.octal_filemode(), "100644");
        assert!(repo.entry("master", "lib/missing.rb").await.unwrap().is_none());
        assert!(repo.entry("master", "nodir/missing.rb").await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_actual_blob_follows_symlinks() {
        let fixture = FixtureRepo::new();
        fixture.write("docs/v2/index.md", "# Version 2\n");
        fixture.symlink("v2/index.md", "docs/current");
        fixture.symlink("docs/current", "latest");
        fixture.commit("Add docs");
        let repo = fixture.repository();

        let link = repo.entry("master", "latest").await.unwrap().unwrap();
        assert_eq!(link.filemode, SYMLINK_MODE);

        match repo.actual_blob("master", "latest").await.unwrap() {
            Some(GitObject::Blob(blob)) => assert_eq!(blob.content.as_deref(), Some("# Version 2\n")),
            other => panic!("expected blob, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_actual_blob_missing_target_is_none() {
        let fixture = FixtureRepo::new();
        fixture.symlink("nowhere.txt", "dangling");
        fixture.write("README", "readme\n");
        fixture.commit("Add dangling link");
        let repo = fixture.repository();

        assert!(repo.actual_blob("master", "dangling").await.unwrap().is_none());
        assert!(repo.actual_blob("master", "not-there").await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_actual_blob_symlink_cycle_is_broken_link() {
        let fixture = FixtureRepo::new();
        fixture.symlink("b", "a");
        fixture.symlink("a", "b");
        fixture.commit("Add cycle");

        let result = fixture.repository().actual_blob("master", "a").await;
        assert!(matches!(result, Err(AppError::BrokenLink(_))));
    }
}
