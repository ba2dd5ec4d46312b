//! Library record types
//!
//! A library is one third-party source unit: where its sources come from,
//! which hosts it applies to, what it depends on and how it is built.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::platform::PlatformFamily;
use crate::core::procedure::BuildProcedure;

/// Stable symbolic identifier of a library
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibraryId(String);

impl LibraryId {
    /// Create an identifier from a name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the identifier string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LibraryId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Where a library's sources come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// Version-controlled remote tracked at a branch tip
    Git {
        url: String,
        branch: String,
        recurse_submodules: bool,
    },
    /// Direct archive download
    Archive { url: String, sha256: Option<String> },
}

impl SourceLocation {
    /// Get the source kind
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Git { .. } => SourceKind::Git,
            Self::Archive { .. } => SourceKind::Archive,
        }
    }

    /// Get the remote URL
    pub fn url(&self) -> &str {
        match self {
            Self::Git { url, .. } | Self::Archive { url, .. } => url,
        }
    }
}

/// Source kind, selecting the materialization strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Git,
    Archive,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Git => write!(f, "git"),
            Self::Archive => write!(f, "archive"),
        }
    }
}

/// Host families a library applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformConstraint {
    /// Every host
    #[default]
    All,
    /// Linux and macOS
    #[serde(alias = "unix-like")]
    Unix,
    /// Windows only
    Windows,
    /// Linux only
    Linux,
    /// macOS only
    #[serde(alias = "darwin")]
    Macos,
}

impl PlatformConstraint {
    /// Check whether this constraint admits the given host family
    pub fn matches(self, family: PlatformFamily) -> bool {
        match self {
            Self::All => true,
            Self::Unix => matches!(family, PlatformFamily::Linux | PlatformFamily::MacOs),
            Self::Windows => family == PlatformFamily::Windows,
            Self::Linux => family == PlatformFamily::Linux,
            Self::Macos => family == PlatformFamily::MacOs,
        }
    }
}

/// Build command templates, one ordered list per host family group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTemplates {
    /// Commands used on Linux and macOS
    #[serde(default)]
    pub unix: Option<Vec<String>>,

    /// Commands used on Windows
    #[serde(default)]
    pub windows: Option<Vec<String>>,
}

impl BuildTemplates {
    /// Get the template list for a host family, if the library declares one
    pub fn for_family(&self, family: PlatformFamily) -> Option<&[String]> {
        match family {
            PlatformFamily::Windows => self.windows.as_deref(),
            PlatformFamily::Linux | PlatformFamily::MacOs => self.unix.as_deref(),
        }
    }
}

/// One library in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryRecord {
    /// Identifier
    pub id: LibraryId,
    /// Source location
    pub source: SourceLocation,
    /// Host applicability
    pub platform: PlatformConstraint,
    /// Dependencies on Linux and macOS
    pub dependencies: Vec<LibraryId>,
    /// Dependencies on Windows; `None` means none at all
    pub windows_dependencies: Option<Vec<LibraryId>>,
    /// Parameter derivation used when building
    pub procedure: BuildProcedure,
    /// Command templates
    pub build: BuildTemplates,
}

impl LibraryRecord {
    /// Source kind of this library
    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// Dependency list that governs ordering on the given host family
    pub fn dependencies_for(&self, family: PlatformFamily) -> &[LibraryId] {
        match family {
            PlatformFamily::Windows => self.windows_dependencies.as_deref().unwrap_or(&[]),
            PlatformFamily::Linux | PlatformFamily::MacOs => &self.dependencies,
        }
    }
}
