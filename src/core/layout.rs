//! Directory layout
//!
//! Where each library's sources, build tree and installed artifacts live.
//! Install directories are siblings under one root so that a library's
//! templates can reach other libraries' artifacts through
//! `install_dir_parent`.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::platform::PlatformFamily;
use crate::registry::LibraryId;

/// Subdirectory name for out-of-tree builds
pub const BUILD_DIR_POSTFIX: &str = "build";

/// Windows build configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum BuildType {
    #[default]
    Release,
    Debug,
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release => write!(f, "Release"),
            Self::Debug => write!(f, "Debug"),
        }
    }
}

impl FromStr for BuildType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Release" => Ok(Self::Release),
            "Debug" => Ok(Self::Debug),
            other => Err(format!(
                "invalid build type '{other}' (expected Release or Debug)"
            )),
        }
    }
}

/// Directory roots for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirLayout {
    /// Root holding one source tree per library
    pub parent_src_dir: PathBuf,
    /// Root holding one install tree per library
    pub install_root: PathBuf,
    /// Root for out-of-tree builds; defaults to the source root
    pub build_dir_root: Option<PathBuf>,
    /// Host family, decides whether install trees are nested by build type
    pub family: PlatformFamily,
    pub build_type: BuildType,
}

impl DirLayout {
    /// Source tree of a library
    pub fn source_dir(&self, id: &LibraryId) -> PathBuf {
        self.parent_src_dir.join(id.as_str())
    }

    /// Install tree of a library; nested by build type on Windows
    pub fn install_dir(&self, id: &LibraryId) -> PathBuf {
        let dir = self.install_root.join(id.as_str());
        if self.family == PlatformFamily::Windows {
            dir.join(self.build_type.to_string())
        } else {
            dir
        }
    }

    /// Directory one level above the library's install tree
    pub fn install_dir_parent(&self, id: &LibraryId) -> PathBuf {
        let install_dir = self.install_dir(id);
        install_dir
            .parent()
            .map_or_else(|| install_dir.clone(), Path::to_path_buf)
    }

    /// Out-of-tree build directory of a library
    pub fn build_dir(&self, id: &LibraryId) -> PathBuf {
        self.build_dir_root
            .as_deref()
            .unwrap_or(&self.parent_src_dir)
            .join(id.as_str())
            .join(BUILD_DIR_POSTFIX)
    }
}
