//! Cached source archives.
//!
//! Archives are generated by `git archive` into a work directory and then
//! moved into the cache, so the cache only ever holds complete files.
//! Requests for an archive that is already being generated wait for that
//! run instead of starting another one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::config::ArchiveConfig;
use crate::error::{AppError, Result};
use crate::git::process::{shell_escape, GitRunner};
use crate::git::repository::RepositoryAccess;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    #[default]
    TarGz,
    Zip,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Zip => "zip",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "application/x-gzip",
            ArchiveFormat::Zip => "application/zip",
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar.gz" | "tgz" | "tar" => Ok(ArchiveFormat::TarGz),
            other => Err(format!("unsupported archive format: {}", other)),
        }
    }
}

pub struct Archiver {
    config: ArchiveConfig,
    runner: Arc<GitRunner>,
    /// Cache path -> lock held while that archive is generated
    in_flight: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl Archiver {
    pub fn new(config: ArchiveConfig, runner: Arc<GitRunner>) -> Self {
        Self {
            config,
            runner,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Path of the archive of `oid`, generating it first if it is not
    /// cached yet. `oid` should be a full commit id so the cache key is
    /// stable.
    pub async fn archive(
        &self,
        repository: &dyn RepositoryAccess,
        oid: &str,
        format: ArchiveFormat,
    ) -> Result<PathBuf> {
        let name = basename(repository.path_segment(), oid, format);
        let cache_path = self.config.cache_dir.join(&name);

        let lock = self.lock_for(&cache_path)?;
        let result = {
            let _guard = lock.lock().await;
            if tokio::fs::try_exists(&cache_path).await? {
                tracing::debug!(path = %cache_path.display(), "archive cache hit");
                Ok(cache_path.clone())
            } else {
                self.generate(repository, oid, format, &name, &cache_path).await
            }
        };

        self.release(&cache_path, lock)?;
        result
    }

    async fn generate(
        &self,
        repository: &dyn RepositoryAccess,
        oid: &str,
        format: ArchiveFormat,
        name: &str,
        cache_path: &Path,
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        tokio::fs::create_dir_all(&self.config.cache_dir).await?;

        let work_path = self.config.work_dir.join(name);
        let script = self.command(
            repository.git_dir(),
            repository.path_segment(),
            oid,
            format,
            &work_path,
        );

        let output = self.runner.shell(&script).await?;
        if !output.success() {
            let _ = tokio::fs::remove_file(&work_path).await;
            return Err(AppError::GitFailed {
                command: output.command,
                stderr: output.stderr.trim().to_string(),
            });
        }

        if tokio::fs::rename(&work_path, cache_path).await.is_err() {
            tokio::fs::copy(&work_path, cache_path).await?;
            tokio::fs::remove_file(&work_path).await?;
        }

        tracing::info!(path = %cache_path.display(), "archive generated");
        Ok(cache_path.to_path_buf())
    }

    /// The `sh -c` script writing the archive to `work_path`. Every dynamic
    /// fragment is escaped.
    pub fn command(
        &self,
        git_dir: &Path,
        path_segment: &str,
        oid: &str,
        format: ArchiveFormat,
        work_path: &Path,
    ) -> String {
        let prefix = format!("--prefix={}/", path_segment.replace('/', "-"));
        let git = format!(
            "{} --git-dir {} archive {}",
            shell_escape(&self.runner.binary().to_string_lossy()),
            shell_escape(&git_dir.to_string_lossy()),
            shell_escape(&prefix),
        );
        let output = shell_escape(&work_path.to_string_lossy());

        match format {
            ArchiveFormat::Zip => {
                format!("{} --format=zip {} > {}", git, shell_escape(oid), output)
            }
            ArchiveFormat::TarGz => format!(
                "{} --format=tar {} | gzip -n > {}",
                git,
                shell_escape(oid),
                output
            ),
        }
    }

    fn lock_for(&self, key: &Path) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut map = self
            .in_flight
            .lock()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        Ok(Arc::clone(map.entry(key.to_path_buf()).or_default()))
    }

    /// Drops the map entry once nobody else is waiting on it.
    fn release(&self, key: &Path, lock: Arc<tokio::sync::Mutex<()>>) -> Result<()> {
        let mut map = self
            .in_flight
            .lock()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        drop(lock);
        if map.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            map.remove(key);
        }
        Ok(())
    }

    #[cfg(test)]
    fn in_flight_count(&self) -> usize {
        self.in_flight.lock().map(|m| m.len()).unwrap_or(0)
    }
}

/// `<segment>-<oid>.<ext>` with slashes flattened.
pub fn basename(path_segment: &str, oid: &str, format: ArchiveFormat) -> String {
    format!(
        "{}.{}",
        format!("{}-{}", path_segment, oid).replace('/', "-"),
        format.extension()
    )
}
