use futures::stream::{self, StreamExt};

use crate::error::Result;
use crate::git::log::{parse_log, LOG_FORMAT};
use crate::git::paths::{join_path, normalize_path};
use crate::git::repository::{check_revision, GitRepository};
use crate::models::{Commit, HistoryEntry};

impl GitRepository {
    /// Up to `limit` commits touching `path` (the whole tree when empty),
    /// newest first.
    pub async fn log(&self, git_ref: &str, path: &str, limit: usize) -> Result<Vec<Commit>> {
        check_revision(git_ref)?;
        let path = normalize_path(path);
        let spec = format!("{}:{}", git_ref, path);

        // Tree entry names are file names, not patterns.
        let mut args = vec![
            "--literal-pathspecs".to_string(),
            "log".to_string(),
            "-n".to_string(),
            limit.to_string(),
            format!("--format={}", LOG_FORMAT),
            git_ref.to_string(),
            "--".to_string(),
        ];
        if !path.is_empty() {
            args.push(path);
        }

        let output = self.git(&args, &spec).await?;
        parse_log(&output.stdout_text())
    }

    /// Every entry of the tree at `ref:path`, each with its last `limit`
    /// commits. One log per entry, at most `GitRunner::jobs` at a time;
    /// results keep the tree's entry order. Any failing log fails the whole
    /// call.
    pub async fn tree_history(
        &self,
        git_ref: &str,
        path: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>> {
        let path = normalize_path(path);
        let tree = self.tree(git_ref, &path).await?;

        let entry_paths: Vec<String> = tree
            .entries
            .iter()
            .map(|entry| join_path(&path, &entry.name))
            .collect();
        let logs: Vec<_> = stream::iter(entry_paths)
            .map(|entry_path| async move { self.log(git_ref, &entry_path, limit).await })
            .buffered(self.runner().jobs())
            .collect()
            .await;
        tracing::debug!(git_ref, path = %path, entries = logs.len(), "tree history collected");

        tree.entries
            .into_iter()
            .zip(logs)
            .map(|(entry, history)| {
                Ok(HistoryEntry {
                    entry,
                    history: history?,
                })
            })
            .collect::<Result<Vec<_>>>()
            .inspect_err(|err| {
                tracing::warn!(git_ref, path = %path, error = %err, "tree history failed")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GitConfig;
    use crate::error::AppError;
    use crate::git::GitRunner;
    use crate::test_support::FixtureRepo;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_log_newest_first_and_limited() {
        let fixture = FixtureRepo::new();
        fixture.write("Gemfile", "gemspec\n");
        let first = fixture.commit("Add Gemfile");
        fixture.write("Gemfile", "source \"http://rubygems.org\"\n\ngemspec\n");
        let second = fixture.commit("Use rubygems");
        fixture.write("README", "dolt\n");
        fixture.commit("Add readme");
        let repo = fixture.repository();

        let commits = repo.log("master", "Gemfile", 10).await.unwrap();
        let oids: Vec<_> = commits.iter().map(|c| c.oid.as_str()).collect();
        assert_eq!(oids, vec![second.as_str(), first.as_str()]);
        assert_eq!(commits[0].summary, "Use rubygems");
        assert_eq!(commits[0].author.name, "Christian Johansen");

        assert_eq!(repo.log("master", "", 2).await.unwrap().len(), 2);
        assert_eq!(repo.log("master", "/", 10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_log_unknown_ref() {
        let fixture = FixtureRepo::new();
        fixture.write("Gemfile", "gemspec\n");
        fixture.commit("Add Gemfile");

        let result = fixture.repository().log("no-such-branch", "Gemfile", 1).await;
        assert!(matches!(result, Err(AppError::RefNotFound(_))), "{:?}", result);
    }

    #[tokio::test]
    async fn test_tree_history_single_entry() {
        let fixture = FixtureRepo::new();
        fixture.write(
            ".gitmodules",
            "[submodule \"ui\"]\n\tpath = vendor/ui\n\turl = git://gitorious.org/gitorious/ui3.git\n",
        );
        let oid = fixture.commit("Add submodule config");

        let history = fixture
            .repository()
            .tree_history("master", "", 1)
            .await
            .unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].entry.name, ".gitmodules");
        assert_eq!(history[0].history.len(), 1);
        assert_eq!(history[0].history[0].oid, oid);
        assert_eq!(history[0].history[0].summary, "Add submodule config");
    }

    #[tokio::test]
    async fn test_tree_history_keeps_entry_order() {
        let fixture = FixtureRepo::new();
        let names = ["a.txt", "b.txt", "c.txt", "d.txt", "e.txt", "f.txt"];
        let mut oids = Vec::new();
        for name in names.iter().rev() {
            fixture.write(&format!("lib/{}", name), name);
            oids.push((name.to_string(), fixture.commit(&format!("Add {}", name))));
        }
        let repo = fixture.repository();

        let tree = repo.tree("master", "lib").await.unwrap();
        let history = repo.tree_history("master", "lib", 5).await.unwrap();

        assert_eq!(history.len(), tree.entries.len());
        for (entry, item) in tree.entries.iter().zip(&history) {
            assert_eq!(&item.entry, entry);
            let expected = oids.iter().find(|(n, _)| *n == entry.name).map(|(_, o)| o);
            assert_eq!(item.history.len(), 1);
            assert_eq!(Some(&item.history[0].oid), expected);
        }
    }

    #[tokio::test]
    async fn test_tree_history_of_blob_is_not_a_tree() {
        let fixture = FixtureRepo::new();
        fixture.write("Gemfile", "gemspec\n");
        fixture.commit("Add Gemfile");

        let result = fixture.repository().tree_history("master", "Gemfile", 1).await;
        assert!(matches!(result, Err(AppError::NotATree { .. })));
    }

    #[tokio::test]
    async fn test_tree_history_missing_path_fails() {
        let fixture = FixtureRepo::new();
        fixture.write("Gemfile", "gemspec\n");
        fixture.commit("Add Gemfile");

        let result = fixture.repository().tree_history("master", "nope", 1).await;
        assert!(matches!(result, Err(AppError::PathNotFound(_))));
    }

    #[tokio::test]
    async fn test_log_path_is_not_a_pattern() {
        let fixture = FixtureRepo::new();
        fixture.write("lib/a.txt", "a\n");
        let first = fixture.commit("Add a.txt");
        fixture.write("lib/*", "star\n");
        let star = fixture.commit("Add star");
        fixture.write("lib/a.txt", "a again\n");
        let third = fixture.commit("Touch a.txt");
        let repo = fixture.repository();

        let commits = repo.log("master", "lib/*", 10).await.unwrap();
        let oids: Vec<_> = commits.iter().map(|c| c.oid.as_str()).collect();
        assert_eq!(oids, vec![star.as_str()]);

        let history = repo.tree_history("master", "lib", 10).await.unwrap();
        let by_name = |name: &str| {
            history
                .iter()
                .find(|h| h.entry.name == name)
                .map(|h| h.history.iter().map(|c| c.oid.clone()).collect::<Vec<_>>())
                .unwrap()
        };
        assert_eq!(by_name("*"), vec![star]);
        assert_eq!(by_name("a.txt"), vec![third, first]);
    }

    #[tokio::test]
    async fn test_tree_history_of_wide_directory() {
        let fixture = FixtureRepo::new();
        let names: Vec<String> = (0..150).map(|i| format!("file{:03}.txt", i)).collect();
        for name in &names {
            fixture.write(&format!("wide/{}", name), name);
        }
        let oid = fixture.commit("Add many files");
        let runner = Arc::new(GitRunner::new(&GitConfig::default().with_jobs(4)));
        let repo = GitRepository::open(fixture.path(), runner).unwrap();

        let history = repo.tree_history("master", "wide", 1).await.unwrap();

        let listed: Vec<_> = history.iter().map(|h| h.entry.name.clone()).collect();
        assert_eq!(listed, names);
        assert!(history.iter().all(|h| h.history.len() == 1 && h.history[0].oid == oid));
    }
}
