//! Git operations
//!
//! Clones and updates run the `git` binary through the [`CommandRunner`]
//! seam, since shallow fetches, submodules and `clean -fdx` are what the
//! library trees need. Read-only inspection of HEAD goes through `gix`.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::error::{FilesystemError, ProcessError};
use crate::infra::filesystem::rename_with_retry;
use crate::infra::process::{CommandRunner, Invocation};

/// Metadata directory of a checkout
pub const GIT_DIR: &str = ".git";
/// Ignore file of a checkout
pub const GIT_IGNORE: &str = ".gitignore";
/// Suffix for stashed metadata
pub const BACKUP_SUFFIX: &str = ".bak";

/// Git operation errors
#[derive(Error, Debug)]
pub enum GitError {
    /// A git command exited unsuccessfully
    #[error("'{command}' failed in '{cwd}' ({status})")]
    CommandFailed {
        command: String,
        cwd: PathBuf,
        status: String,
    },

    /// git could not be started
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Not a repository gix can open
    #[error("Invalid repository at '{path}': {error}")]
    InvalidRepository { path: PathBuf, error: String },

    /// HEAD could not be read
    #[error("Failed to read HEAD of '{path}': {error}")]
    Head { path: PathBuf, error: String },
}

/// Runs git commands through a [`CommandRunner`]
#[derive(Debug, Clone)]
pub struct GitClient<R> {
    runner: R,
}

impl<R: CommandRunner> GitClient<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Run `git <args>` in `cwd`, failing on a non-zero exit
    pub fn git<I, S>(&self, cwd: &Path, args: I) -> Result<(), GitError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let invocation = Invocation::new("git", cwd).args(args);
        let status = self.runner.run(&invocation)?;
        if status.success() {
            Ok(())
        } else {
            Err(GitError::CommandFailed {
                command: invocation.to_string(),
                cwd: invocation.cwd,
                status: status.to_string(),
            })
        }
    }

    /// Shallow clone of one branch into `dest`
    pub fn clone_shallow(
        &self,
        url: &str,
        branch: &str,
        dest: &Path,
        recurse_submodules: bool,
    ) -> Result<(), GitError> {
        let cwd = dest.parent().unwrap_or(dest);
        let mut args = vec![
            "clone".to_string(),
            url.to_string(),
            "--branch".to_string(),
            branch.to_string(),
            "--depth".to_string(),
            "1".to_string(),
            dest.display().to_string(),
        ];
        if recurse_submodules {
            args.push("--recurse-submodules".to_string());
            args.push("--shallow-submodules".to_string());
        }
        self.git(cwd, args)
    }

    /// Discard local changes and move an existing checkout to the tip of
    /// `branch`
    pub fn update(
        &self,
        repo_dir: &Path,
        current_branch: &str,
        branch: &str,
        recurse_submodules: bool,
    ) -> Result<(), GitError> {
        let current = format!("origin/{current_branch}");
        let target = format!("origin/{branch}");
        let mut steps: Vec<Vec<&str>> = vec![
            vec!["reset", "--hard", current.as_str()],
            vec!["clean", "-fdx"],
            vec!["fetch", "origin", branch],
            vec!["checkout", branch],
            vec!["reset", "--hard", target.as_str()],
            vec!["clean", "-fdx"],
        ];
        if recurse_submodules {
            steps.push(vec!["submodule", "update", "--init", "--recursive", "--depth=1"]);
        }
        for step in steps {
            self.git(repo_dir, step)?;
        }
        Ok(())
    }
}

/// Name of the checked-out branch, `HEAD` when detached
pub fn current_branch(repo_dir: &Path) -> Result<String, GitError> {
    let repo = open(repo_dir)?;
    let head = repo.head_name().map_err(|e| GitError::Head {
        path: repo_dir.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(head.map_or_else(|| "HEAD".to_string(), |name| name.shorten().to_string()))
}

/// Abbreviated id of the commit at HEAD
pub fn short_head(repo_dir: &Path) -> Result<String, GitError> {
    let repo = open(repo_dir)?;
    let id = repo.head_id().map_err(|e| GitError::Head {
        path: repo_dir.to_path_buf(),
        error: e.to_string(),
    })?;
    Ok(id.shorten_or_id().to_string())
}

fn open(repo_dir: &Path) -> Result<gix::Repository, GitError> {
    gix::open(repo_dir).map_err(|e| GitError::InvalidRepository {
        path: repo_dir.to_path_buf(),
        error: e.to_string(),
    })
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Move `.git` and `.gitignore` aside so the enclosing repository can track
/// the tree's files; existing backups are replaced
pub fn stash_metadata(repo_dir: &Path) -> Result<(), FilesystemError> {
    for name in [GIT_DIR, GIT_IGNORE] {
        let path = repo_dir.join(name);
        rename_with_retry(&path, &backup_path(&path), true)?;
    }
    Ok(())
}

/// Undo [`stash_metadata`]; returns whether a stashed `.git` was found
pub fn restore_metadata(repo_dir: &Path) -> Result<bool, FilesystemError> {
    let git_dir = repo_dir.join(GIT_DIR);
    if !rename_with_retry(&backup_path(&git_dir), &git_dir, false)? {
        return Ok(false);
    }
    let ignore = repo_dir.join(GIT_IGNORE);
    rename_with_retry(&backup_path(&ignore), &ignore, false)?;
    Ok(true)
}
