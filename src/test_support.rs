//! Throwaway git repositories for tests, built with the git binary.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;

use crate::config::GitConfig;
use crate::git::{GitRepository, GitRunner};

const AUTHOR_NAME: &str = "Christian Johansen";
const AUTHOR_EMAIL: &str = "christian@gitorious.com";
/// 2012-09-10 15:07:39 +0200
const FIRST_COMMIT_TIME: i64 = 1347282459;

pub struct FixtureRepo {
    dir: TempDir,
    commits: Cell<i64>,
}

impl FixtureRepo {
    /// An empty non-bare repository whose HEAD points at `master`.
    pub fn new() -> Self {
        let dir = TempDir::with_prefix("git-browse-test-").unwrap();
        let fixture = Self {
            dir,
            commits: Cell::new(0),
        };
        fixture.git(&["init", "-q"]);
        fixture.git(&["symbolic-ref", "HEAD", "refs/heads/master"]);
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git_dir(&self) -> PathBuf {
        self.path().join(".git")
    }

    /// Runs git in the work tree and returns trimmed stdout. Panics on
    /// failure.
    pub fn git(&self, args: &[&str]) -> String {
        self.git_as(args, AUTHOR_NAME, AUTHOR_EMAIL)
    }

    fn git_as(&self, args: &[&str], name: &str, email: &str) -> String {
        let date = format!("{} +0200", FIRST_COMMIT_TIME + self.commits.get() * 60);
        let output = Command::new("git")
            .args(["-c", "commit.gpgsign=false", "-c", "core.autocrlf=false"])
            .args(args)
            .current_dir(self.path())
            .env("GIT_AUTHOR_NAME", name)
            .env("GIT_AUTHOR_EMAIL", email)
            .env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_NAME", name)
            .env("GIT_COMMITTER_EMAIL", email)
            .env("GIT_COMMITTER_DATE", &date)
            .output()
            .unwrap();

        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap().trim().to_string()
    }

    pub fn write(&self, path: &str, content: &str) {
        let file_path = self.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(file_path, content).unwrap();
    }

    #[cfg(unix)]
    pub fn symlink(&self, target: &str, path: &str) {
        let link_path = self.path().join(path);
        if let Some(parent) = link_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::os::unix::fs::symlink(target, link_path).unwrap();
    }

    /// Stages everything and commits; returns the new commit id.
    pub fn commit(&self, message: &str) -> String {
        self.commit_as(message, AUTHOR_NAME, AUTHOR_EMAIL)
    }

    pub fn commit_as(&self, message: &str, name: &str, email: &str) -> String {
        self.git(&["add", "-A"]);
        self.git_as(&["commit", "-q", "-m", message], name, email);
        self.commits.set(self.commits.get() + 1);
        self.git(&["rev-parse", "HEAD"])
    }

    /// Stages a gitlink to `oid` at `path` without cloning anything. The
    /// empty directory mirrors an uninitialised submodule checkout.
    pub fn add_gitlink(&self, path: &str, oid: &str) {
        std::fs::create_dir_all(self.path().join(path)).unwrap();
        self.git(&[
            "update-index",
            "--add",
            "--cacheinfo",
            &format!("160000,{},{}", oid, path),
        ]);
    }

    pub fn runner(&self) -> Arc<GitRunner> {
        Arc::new(GitRunner::new(&GitConfig::default()))
    }

    pub fn repository(&self) -> GitRepository {
        GitRepository::open(self.path(), self.runner()).unwrap()
    }
}
