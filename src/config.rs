//! Runtime configuration.
//!
//! Built once in `main` from the command line and handed to the components
//! that need it. Nothing here is global: the git binary path and timeout go
//! to `GitRunner::new`, the archive directories to `Archiver::new`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the repositories to serve
    pub root: PathBuf,
    pub listen: SocketAddr,
    pub git: GitConfig,
    pub archive: Option<ArchiveConfig>,
}

pub const DEFAULT_GIT_JOBS: usize = 8;

#[derive(Debug, Clone)]
pub struct GitConfig {
    pub binary: PathBuf,
    /// `None` lets git run for as long as it takes.
    pub timeout: Option<Duration>,
    /// Git processes one request may run at once
    pub jobs: usize,
}

impl GitConfig {
    pub fn new(binary: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            binary: binary.into(),
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            jobs: DEFAULT_GIT_JOBS,
        }
    }

    /// At least one job always runs.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self::new("git", 30)
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Where finished archives are kept and served from
    pub cache_dir: PathBuf,
    /// Scratch directory archives are written to before being moved
    pub work_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeout_disables_limit() {
        assert_eq!(GitConfig::new("git", 0).timeout, None);
        assert_eq!(
            GitConfig::new("/usr/bin/git", 5).timeout,
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_default_uses_git_from_path() {
        let config = GitConfig::default();
        assert_eq!(config.binary, PathBuf::from("git"));
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.jobs, DEFAULT_GIT_JOBS);
    }

    #[test]
    fn test_jobs_never_zero() {
        assert_eq!(GitConfig::default().with_jobs(0).jobs, 1);
        assert_eq!(GitConfig::default().with_jobs(3).jobs, 3);
    }
}
