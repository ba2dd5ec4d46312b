//! Error types for builddeps
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Registry loading and validation errors
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Failed to read the registry file
    #[error("Failed to read registry '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Registry is not valid TOML or does not match the schema
    #[error("Failed to parse registry: {0}")]
    Parse(String),

    /// Library declared twice
    #[error("Library '{name}' is declared more than once")]
    DuplicateLibrary { name: String },

    /// Library without a name
    #[error("Library at position {index} has an empty name")]
    EmptyName { index: usize },

    /// Both `git` and `archive` present
    #[error("Library '{library}' specifies both git and archive sources (only one allowed)")]
    MultipleSourceTypes { library: String },

    /// Neither `git` nor `archive` present
    #[error("Library '{library}' has no source (git or archive required)")]
    NoSourceType { library: String },

    /// Git source without a branch
    #[error("Library '{library}' specifies a git source without a branch")]
    GitWithoutBranch { library: String },
}

/// Configuration errors, fatal before any external action
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// The dependency graph of the filtered libraries has a cycle
    #[error(
        "Dependency graph has at least one cycle: ordered {ordered}/{total}, unresolved: {}",
        unresolved.join(", ")
    )]
    CycleDetected {
        ordered: usize,
        total: usize,
        unresolved: Vec<String>,
    },

    /// Host operating system or architecture is not supported
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Conflicting run options
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

/// Process execution errors
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The program could not be started
    #[error("Failed to start '{program}' in '{cwd}': {error}")]
    Spawn {
        program: String,
        cwd: PathBuf,
        error: String,
    },
}

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network error
    #[error("Network error downloading '{url}': {error}")]
    NetworkError { url: String, error: String },

    /// Downloaded bytes do not hash to the registry's sha256
    #[error("Checksum mismatch for '{path}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },

    /// Archive could not be unpacked
    #[error("Failed to extract '{path}': {error}")]
    ExtractFailed { path: PathBuf, error: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove a path
    #[error("Failed to remove '{path}': {error}")]
    Remove { path: PathBuf, error: String },

    /// Failed to rename a path
    #[error("Failed to rename '{from}' to '{to}': {error}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },
}

/// Source retrieval failure for one library
#[derive(Error, Debug)]
#[error("Failed to retrieve sources for '{library}': {message}")]
pub struct RetrievalError {
    /// Library that failed
    pub library: String,
    /// What went wrong
    pub message: String,
}

impl RetrievalError {
    /// Create a retrieval error for a library
    pub fn new(library: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            message: message.into(),
        }
    }
}

/// Build failures for one library
#[derive(Error, Debug)]
pub enum BuildError {
    /// A command exited unsuccessfully
    #[error("Build failed for '{library}' at command {index}: {command} ({status})")]
    CommandFailed {
        library: String,
        /// One-based position of the failing command in the template list
        index: usize,
        command: String,
        status: String,
    },

    /// A command could not be started at all
    #[error("Build failed for '{library}' at command {index}: {error}")]
    Spawn {
        library: String,
        index: usize,
        #[source]
        error: ProcessError,
    },
}

impl BuildError {
    /// Library the failure belongs to
    pub fn library(&self) -> &str {
        match self {
            Self::CommandFailed { library, .. } | Self::Spawn { library, .. } => library,
        }
    }
}

/// Recording stage failures; never fatal to a run
#[derive(Error, Debug)]
pub enum BookkeepingError {
    /// A git command failed
    #[error("Git command '{command}' failed: {error}")]
    Git { command: String, error: String },

    /// Filesystem error while stashing repository metadata
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    /// IO error
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Run stage used in failure reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Platform filtering and scheduling
    Resolving,
    /// Source retrieval
    Materializing,
    /// Bookkeeping of retrieved sources
    Recording,
    /// Per-library builds
    Building,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolving => write!(f, "resolving"),
            Self::Materializing => write!(f, "materializing"),
            Self::Recording => write!(f, "recording"),
            Self::Building => write!(f, "building"),
        }
    }
}

/// Top-level orchestration error
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// Resolution failed before any I/O
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A library's sources could not be retrieved
    #[error("Source retrieval error: {0}")]
    SourceRetrieval(#[from] RetrievalError),

    /// A library's build command failed
    #[error("Build command error: {0}")]
    BuildCommand(#[from] BuildError),
}

impl OrchestratorError {
    /// Stage at which the run failed
    pub fn stage(&self) -> Stage {
        match self {
            Self::Configuration(_) => Stage::Resolving,
            Self::SourceRetrieval(_) => Stage::Materializing,
            Self::BuildCommand(_) => Stage::Building,
        }
    }

    /// Library that caused the failure, if any
    pub fn library(&self) -> Option<&str> {
        match self {
            Self::Configuration(_) => None,
            Self::SourceRetrieval(e) => Some(&e.library),
            Self::BuildCommand(e) => Some(e.library()),
        }
    }
}
