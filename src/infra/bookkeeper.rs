//! Commits retrieved sources to the enclosing repository

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::config::defaults::INSTALL_DIR_NAME;
use crate::core::bookkeeping::{
    commit_message, path_difference, RepositoryDetail, RetrievalOutcome, RetrievalSummary,
};
use crate::core::orchestrator::Bookkeeper;
use crate::error::BookkeepingError;
use crate::infra::git::{current_branch, short_head, stash_metadata, GitClient, GitError, GIT_DIR};
use crate::infra::process::CommandRunner;

/// [`Bookkeeper`] that stages the source root and commits it with git
pub struct GitBookkeeper<R> {
    work_dir: PathBuf,
    parent_src_dir: PathBuf,
    git: GitClient<R>,
}

impl<R: CommandRunner> GitBookkeeper<R> {
    pub fn new(work_dir: &Path, parent_src_dir: &Path, runner: R) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            parent_src_dir: parent_src_dir.to_path_buf(),
            git: GitClient::new(runner),
        }
    }

    fn details(summary: &RetrievalSummary) -> Vec<RepositoryDetail> {
        summary
            .git_trees()
            .filter_map(|outcome| match repository_detail(outcome) {
                Ok(detail) => Some(detail),
                Err(e) => {
                    tracing::warn!("No repository details for {}: {e}", outcome.id);
                    None
                }
            })
            .collect()
    }

    fn relative_src_dir(&self) -> Result<PathBuf, BookkeepingError> {
        let canonical = |path: &Path| {
            std::fs::canonicalize(path).map_err(|e| BookkeepingError::Io {
                path: path.to_path_buf(),
                error: e.to_string(),
            })
        };
        Ok(path_difference(
            &canonical(&self.work_dir)?,
            &canonical(&self.parent_src_dir)?,
        ))
    }

    fn git(&self, args: Vec<String>) -> Result<(), BookkeepingError> {
        self.git.git(&self.work_dir, args).map_err(|e| match e {
            GitError::CommandFailed { command, status, .. } => BookkeepingError::Git {
                command,
                error: status,
            },
            other => BookkeepingError::Git {
                command: "git".to_string(),
                error: other.to_string(),
            },
        })
    }
}

fn repository_detail(outcome: &RetrievalOutcome) -> Result<RepositoryDetail, GitError> {
    Ok(RepositoryDetail {
        name: outcome.id.to_string(),
        branch: current_branch(&outcome.local_path)?,
        short_sha: short_head(&outcome.local_path)?,
    })
}

impl<R: CommandRunner> Bookkeeper for GitBookkeeper<R> {
    fn record(&self, summary: &RetrievalSummary) -> Result<(), BookkeepingError> {
        if !self.work_dir.join(GIT_DIR).is_dir() {
            tracing::info!(
                "{} is not a git repository, not committing",
                self.work_dir.display()
            );
            return Ok(());
        }

        let details = Self::details(summary);
        for outcome in summary.git_trees() {
            stash_metadata(&outcome.local_path)?;
        }

        let relative = self.relative_src_dir()?;
        let relative = relative.display().to_string();
        let pathspec = if relative.is_empty() { ".".to_string() } else { relative };
        let exclude = format!(":!{pathspec}/{INSTALL_DIR_NAME}");

        self.git(vec![
            "add".to_string(),
            "-A".to_string(),
            pathspec,
            "--".to_string(),
            exclude,
        ])?;

        let message = commit_message(summary, &details, Utc::now());
        tracing::debug!("Commit message:\n{message}");
        self.git(vec!["commit".to_string(), "-m".to_string(), message])?;
        tracing::info!("Committed retrieved sources");
        Ok(())
    }
}
