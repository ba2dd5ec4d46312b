//! Library registry
//!
//! The registry is the static table of libraries this tool knows about.
//! It is loaded once per run from TOML (the embedded default or a file given
//! on the command line) and is immutable afterwards.

pub mod library;

pub use library::{
    BuildTemplates, LibraryId, LibraryRecord, PlatformConstraint, SourceKind, SourceLocation,
};

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::core::procedure::BuildProcedure;
use crate::error::RegistryError;

/// Registry shipped with the binary
pub const DEFAULT_REGISTRY: &str = include_str!("default.toml");

/// On-disk registry document
#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default, rename = "library")]
    libraries: Vec<RawLibrary>,
}

/// Library entry as written in TOML, before validation
#[derive(Debug, Deserialize)]
struct RawLibrary {
    name: String,
    #[serde(default)]
    git: Option<String>,
    #[serde(default)]
    branch: Option<String>,
    #[serde(default)]
    archive: Option<String>,
    #[serde(default)]
    sha256: Option<String>,
    #[serde(default)]
    platform: PlatformConstraint,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    windows_dependencies: Option<Vec<String>>,
    #[serde(default)]
    recurse_submodules: bool,
    #[serde(default)]
    procedure: BuildProcedure,
    #[serde(default)]
    build: BuildTemplates,
}

impl RawLibrary {
    fn validate(self, index: usize) -> Result<LibraryRecord, RegistryError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName { index });
        }

        let source = match (self.git, self.archive) {
            (Some(_), Some(_)) => {
                return Err(RegistryError::MultipleSourceTypes { library: name });
            }
            (None, None) => return Err(RegistryError::NoSourceType { library: name }),
            (Some(url), None) => {
                let branch = self
                    .branch
                    .ok_or_else(|| RegistryError::GitWithoutBranch {
                        library: name.clone(),
                    })?;
                SourceLocation::Git {
                    url,
                    branch,
                    recurse_submodules: self.recurse_submodules,
                }
            }
            (None, Some(url)) => SourceLocation::Archive {
                url,
                sha256: self.sha256,
            },
        };

        let to_ids = |names: Vec<String>| names.into_iter().map(LibraryId::new).collect();

        Ok(LibraryRecord {
            id: LibraryId::new(name),
            source,
            platform: self.platform,
            dependencies: to_ids(self.dependencies),
            windows_dependencies: self.windows_dependencies.map(to_ids),
            procedure: self.procedure,
            build: self.build,
        })
    }
}

/// Immutable table of library records in declaration order
#[derive(Debug, Clone, Default)]
pub struct Registry {
    libraries: Vec<LibraryRecord>,
    index: HashMap<LibraryId, usize>,
}

impl Registry {
    /// Build a registry from already validated records
    pub fn from_records(records: Vec<LibraryRecord>) -> Result<Self, RegistryError> {
        let mut index = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            if index.insert(record.id.clone(), position).is_some() {
                return Err(RegistryError::DuplicateLibrary {
                    name: record.id.to_string(),
                });
            }
        }
        Ok(Self {
            libraries: records,
            index,
        })
    }

    /// Parse a registry from TOML content
    pub fn from_toml(content: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile =
            toml::from_str(content).map_err(|e| RegistryError::Parse(e.to_string()))?;

        let records = file
            .libraries
            .into_iter()
            .enumerate()
            .map(|(index, raw)| raw.validate(index))
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_records(records)
    }

    /// Load a registry file
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|e| RegistryError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        let registry = Self::from_toml(&content)?;
        tracing::debug!(
            "Loaded {} libraries from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// The registry embedded in the binary
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_toml(DEFAULT_REGISTRY)
    }

    /// Look up a library
    pub fn get(&self, id: &LibraryId) -> Option<&LibraryRecord> {
        self.index.get(id).map(|&i| &self.libraries[i])
    }

    /// Check if a library is known
    pub fn contains(&self, id: &LibraryId) -> bool {
        self.index.contains_key(id)
    }

    /// Iterate records in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &LibraryRecord> {
        self.libraries.iter()
    }

    /// All identifiers in declaration order
    pub fn ids(&self) -> Vec<LibraryId> {
        self.libraries.iter().map(|r| r.id.clone()).collect()
    }

    /// Number of libraries
    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::PlatformFamily;

    #[test]
    fn test_builtin_registry_loads() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(registry.len(), 11);
        let curl = registry.get(&LibraryId::new("curl")).unwrap();
        assert_eq!(curl.platform, PlatformConstraint::Unix);
        assert_eq!(curl.procedure, BuildProcedure::Curl);
        assert_eq!(curl.source_kind(), SourceKind::Git);
        let python = registry.get(&LibraryId::new("python")).unwrap();
        assert_eq!(python.source_kind(), SourceKind::Archive);
        assert_eq!(python.platform, PlatformConstraint::Windows);
    }

    #[test]
    fn test_builtin_registry_declaration_order() {
        let registry = Registry::builtin().unwrap();
        let ids = registry.ids();
        assert_eq!(ids.first().map(LibraryId::as_str), Some("krb5"));
        assert_eq!(ids.last().map(LibraryId::as_str), Some("nasm"));
    }

    #[test]
    fn test_awssdk_windows_dependencies() {
        let registry = Registry::builtin().unwrap();
        let aws = registry.get(&LibraryId::new("awssdkcpp")).unwrap();
        let win: Vec<&str> = aws
            .dependencies_for(PlatformFamily::Windows)
            .iter()
            .map(LibraryId::as_str)
            .collect();
        assert_eq!(win, vec!["openssl"]);
        assert!(matches!(
            aws.source,
            SourceLocation::Git {
                recurse_submodules: true,
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_library_rejected() {
        let content = r#"
[[library]]
name = "zlib"
git = "https://example.com/zlib.git"
branch = "master"

[[library]]
name = "zlib"
archive = "https://example.com/zlib.zip"
"#;
        assert!(matches!(
            Registry::from_toml(content),
            Err(RegistryError::DuplicateLibrary { .. })
        ));
    }

    #[test]
    fn test_multiple_sources_rejected() {
        let content = r#"
[[library]]
name = "zlib"
git = "https://example.com/zlib.git"
branch = "master"
archive = "https://example.com/zlib.zip"
"#;
        assert!(matches!(
            Registry::from_toml(content),
            Err(RegistryError::MultipleSourceTypes { .. })
        ));
    }

    #[test]
    fn test_missing_source_rejected() {
        let content = r#"
[[library]]
name = "zlib"
"#;
        assert!(matches!(
            Registry::from_toml(content),
            Err(RegistryError::NoSourceType { .. })
        ));
    }

    #[test]
    fn test_git_without_branch_rejected() {
        let content = r#"
[[library]]
name = "zlib"
git = "https://example.com/zlib.git"
"#;
        assert!(matches!(
            Registry::from_toml(content),
            Err(RegistryError::GitWithoutBranch { .. })
        ));
    }

    #[test]
    fn test_defaults_applied() {
        let content = r#"
[[library]]
name = "zlib"
git = "https://example.com/zlib.git"
branch = "master"
"#;
        let registry = Registry::from_toml(content).unwrap();
        let zlib = registry.get(&LibraryId::new("zlib")).unwrap();
        assert_eq!(zlib.platform, PlatformConstraint::All);
        assert!(zlib.dependencies.is_empty());
        assert!(zlib.windows_dependencies.is_none());
        assert_eq!(zlib.procedure, BuildProcedure::Standard);
        assert_eq!(zlib.build, BuildTemplates::default());
    }

    #[test]
    fn test_unknown_platform_rejected() {
        let content = r#"
[[library]]
name = "zlib"
git = "https://example.com/zlib.git"
branch = "master"
platform = "beos"
"#;
        assert!(matches!(
            Registry::from_toml(content),
            Err(RegistryError::Parse(_))
        ));
    }
}
