//! Host platform values and the platform filter
//!
//! Detection only reads compile-time target constants; the filter itself is
//! pure and works on whatever [`HostPlatform`] it is handed, so tests can ask
//! "what would Windows build" from a Linux machine.

use serde::Serialize;
use std::fmt;

use crate::error::ConfigurationError;
use crate::registry::{LibraryId, Registry};

/// Host operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    Linux,
    MacOs,
    Windows,
}

impl PlatformFamily {
    /// Parse an operating system name as reported by `std::env::consts::OS`
    pub fn from_os_name(os: &str) -> Result<Self, ConfigurationError> {
        match os {
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" => Ok(Self::MacOs),
            "windows" => Ok(Self::Windows),
            other => Err(ConfigurationError::UnsupportedPlatform(format!(
                "operating system '{other}'"
            ))),
        }
    }

    /// Whether this family uses the unix template set
    pub fn is_unix(self) -> bool {
        !matches!(self, Self::Windows)
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::MacOs => write!(f, "macos"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86_64,
    Aarch64,
    Arm,
}

impl Arch {
    /// Parse an architecture name, accepting the common aliases
    pub fn from_name(arch: &str) -> Result<Self, ConfigurationError> {
        match arch {
            "x86_64" | "amd64" | "AMD64" => Ok(Self::X86_64),
            "aarch64" | "arm64" => Ok(Self::Aarch64),
            "arm" | "armv7" | "armv7l" => Ok(Self::Arm),
            other => Err(ConfigurationError::UnsupportedPlatform(format!(
                "architecture '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X86_64 => write!(f, "x86_64"),
            Self::Aarch64 => write!(f, "aarch64"),
            Self::Arm => write!(f, "arm"),
        }
    }
}

/// The machine the orchestrator runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostPlatform {
    pub family: PlatformFamily,
    pub arch: Arch,
}

impl HostPlatform {
    pub fn new(family: PlatformFamily, arch: Arch) -> Self {
        Self { family, arch }
    }

    /// Detect the running host
    pub fn detect() -> Result<Self, ConfigurationError> {
        Self::from_names(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Build a host from operating system and architecture names
    pub fn from_names(os: &str, arch: &str) -> Result<Self, ConfigurationError> {
        let host = Self::new(PlatformFamily::from_os_name(os)?, Arch::from_name(arch)?);
        // Fail early rather than at the first openssl template
        host.openssl_platform()?;
        Ok(host)
    }

    /// OpenSSL `Configure` target for this host
    pub fn openssl_platform(&self) -> Result<&'static str, ConfigurationError> {
        match (self.family, self.arch) {
            (PlatformFamily::Linux, Arch::X86_64) => Ok("linux-x86_64"),
            (PlatformFamily::Linux, Arch::Aarch64) => Ok("linux-aarch64"),
            (PlatformFamily::Linux, Arch::Arm) => Ok("linux-armv4"),
            (PlatformFamily::MacOs, Arch::Aarch64) => Ok("darwin64-arm64-cc"),
            (PlatformFamily::MacOs, Arch::X86_64) => Ok("darwin64-x86_64-cc"),
            (PlatformFamily::Windows, _) => Ok("VC-WIN64A"),
            (family, arch) => Err(ConfigurationError::UnsupportedPlatform(format!(
                "{arch} on {family}"
            ))),
        }
    }

    /// Architecture name as Apple's toolchain spells it (`-arch` value)
    pub fn apple_arch(&self) -> &'static str {
        match self.arch {
            Arch::Aarch64 | Arch::Arm => "arm64",
            Arch::X86_64 => "x86_64",
        }
    }

    /// `--host` triple for autoconf on macOS
    pub fn apple_host_triple(&self) -> String {
        format!("{}-apple-darwin", self.apple_arch())
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.family, self.arch)
    }
}

/// Libraries that apply to the host family, in registry order
///
/// With `get_all` the filter is bypassed and every registry library is
/// returned; this is only meaningful for retrieval.
pub fn filtered_libraries(
    registry: &Registry,
    family: PlatformFamily,
    get_all: bool,
) -> Vec<LibraryId> {
    registry
        .iter()
        .filter(|record| get_all || record.platform.matches(family))
        .map(|record| record.id.clone())
        .collect()
}
