//! Source materialization
//!
//! Puts every library's sources under its directory in the source root:
//! git trees are cloned or moved to the branch tip, archives are downloaded
//! once and optionally unpacked.

use std::path::Path;

use crate::core::bookkeeping::RetrievalOutcome;
use crate::core::layout::DirLayout;
use crate::core::orchestrator::SourceMaterializer;
use crate::error::RetrievalError;
use crate::infra::download::{archive_file_name, extract_zip, ArchiveClient, ProgressCallback};
use crate::infra::filesystem::create_dir_all;
use crate::infra::git::{current_branch, restore_metadata, GitClient};
use crate::infra::process::CommandRunner;
use crate::registry::{LibraryId, LibraryRecord, SourceLocation};

/// Builds a progress callback for a named download
pub type ProgressFactory = Box<dyn Fn(&str) -> ProgressCallback + Send + Sync>;

/// [`SourceMaterializer`] backed by git and HTTP
pub struct RepositoryMaterializer<R> {
    layout: DirLayout,
    git: GitClient<R>,
    archives: ArchiveClient,
    extract_zip: bool,
    progress: Option<ProgressFactory>,
}

impl<R: CommandRunner> RepositoryMaterializer<R> {
    pub fn new(layout: DirLayout, runner: R) -> Self {
        Self {
            layout,
            git: GitClient::new(runner),
            archives: ArchiveClient::new(),
            extract_zip: false,
            progress: None,
        }
    }

    /// Unpack archives after download
    #[must_use]
    pub fn with_extract_zip(mut self, extract: bool) -> Self {
        self.extract_zip = extract;
        self
    }

    /// Report download progress through callbacks made by `factory`
    #[must_use]
    pub fn with_progress(mut self, factory: ProgressFactory) -> Self {
        self.progress = Some(factory);
        self
    }

    fn git_tree(
        &self,
        id: &LibraryId,
        url: &str,
        branch: &str,
        recurse_submodules: bool,
    ) -> Result<bool, RetrievalError> {
        let dir = self.layout.source_dir(id);

        match restore_metadata(&dir) {
            Ok(true) => tracing::debug!("Restored repository metadata in {}", dir.display()),
            Ok(false) => {}
            Err(e) => tracing::warn!("Could not restore repository metadata for {id}: {e}"),
        }

        if dir.is_dir() {
            let current = current_branch(&dir).unwrap_or_else(|e| {
                tracing::warn!("Could not read current branch of {id}, assuming {branch}: {e}");
                branch.to_string()
            });
            tracing::info!("Updating {id} ({current} -> {branch})");
            self.git
                .update(&dir, &current, branch, recurse_submodules)
                .map_err(|e| failure(id, e))?;
            Ok(false)
        } else {
            if let Some(parent) = dir.parent() {
                create_dir_all(parent).map_err(|e| failure(id, e))?;
            }
            tracing::info!("Cloning {url} ({branch}) into {}", dir.display());
            self.git
                .clone_shallow(url, branch, &dir, recurse_submodules)
                .map_err(|e| failure(id, e))?;
            Ok(true)
        }
    }

    async fn archive(
        &self,
        id: &LibraryId,
        url: &str,
        sha256: Option<&str>,
    ) -> Result<bool, RetrievalError> {
        let dir = self.layout.source_dir(id);
        create_dir_all(&dir).map_err(|e| failure(id, e))?;

        let file_name = archive_file_name(url);
        if file_name.is_empty() {
            return Err(RetrievalError::new(
                id.as_str(),
                format!("cannot derive a file name from '{url}'"),
            ));
        }
        let archive = dir.join(file_name);

        let newly_acquired = if archive.exists() {
            tracing::info!("{} already exists, skipping download", archive.display());
            false
        } else {
            tracing::info!("Downloading {url}");
            let progress = self.progress.as_ref().map(|factory| factory(file_name));
            let fetched = self
                .archives
                .fetch(url, &archive, sha256, progress)
                .await
                .map_err(|e| failure(id, e))?;
            tracing::debug!("Downloaded {} bytes (sha256 {})", fetched.bytes, fetched.sha256);
            true
        };

        if self.extract_zip {
            unpack(&archive, &dir).map_err(|e| failure(id, e))?;
        }
        Ok(newly_acquired)
    }
}

fn failure(id: &LibraryId, error: impl std::fmt::Display) -> RetrievalError {
    RetrievalError::new(id.as_str(), error.to_string())
}

fn unpack(archive: &Path, dest: &Path) -> Result<(), crate::error::DownloadError> {
    let entries = extract_zip(archive, dest)?;
    tracing::info!("Extracted {entries} entries from {}", archive.display());
    Ok(())
}

impl<R: CommandRunner> SourceMaterializer for RepositoryMaterializer<R> {
    async fn materialize(&self, record: &LibraryRecord) -> Result<RetrievalOutcome, RetrievalError> {
        let id = &record.id;
        let newly_acquired = match &record.source {
            SourceLocation::Git {
                url,
                branch,
                recurse_submodules,
            } => self.git_tree(id, url, branch, *recurse_submodules)?,
            SourceLocation::Archive { url, sha256 } => {
                self.archive(id, url, sha256.as_deref()).await?
            }
        };

        Ok(RetrievalOutcome {
            id: id.clone(),
            kind: record.source_kind(),
            local_path: self.layout.source_dir(id),
            newly_acquired,
        })
    }
}
