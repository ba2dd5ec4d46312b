//! Configuration and constants
//!
//! [`RunConfig`] is built once at startup from the command line and passed
//! by reference to every component. Nothing reads configuration from global
//! state.

pub mod defaults;

use std::path::{Path, PathBuf};

use crate::core::layout::{BuildType, DirLayout};
use crate::core::orchestrator::RunMode;
use crate::core::platform::HostPlatform;
use crate::error::ConfigurationError;

/// Immutable settings for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: RunMode,
    pub host: HostPlatform,
    pub layout: DirLayout,
    /// Retrieve every registry library regardless of platform
    pub get_all: bool,
    /// Unpack archive sources after download
    pub extract_zip: bool,
    /// Commit retrieved sources to the enclosing repository
    pub commit: bool,
    pub cmake_command: String,
    pub jobs: usize,
    /// Registry file; the embedded registry when `None`
    pub registry_path: Option<PathBuf>,
    /// Directory the tool was started in
    pub work_dir: PathBuf,
}

/// Raw options before defaults and validation
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub parent_src_dir: Option<PathBuf>,
    pub install_dir: Option<PathBuf>,
    pub build_dir: Option<PathBuf>,
    pub build_type: Option<BuildType>,
    pub get_only: bool,
    pub build_only: bool,
    pub get_all: bool,
    pub extract_zip: bool,
    pub no_commit: bool,
    pub jobs: Option<usize>,
    pub cmake_command: Option<String>,
    pub registry_path: Option<PathBuf>,
}

impl RunConfig {
    /// Apply defaults and reject conflicting options
    ///
    /// Relative paths are resolved against `work_dir`.
    pub fn resolve(
        options: RunOptions,
        host: HostPlatform,
        work_dir: &Path,
    ) -> Result<Self, ConfigurationError> {
        let mode = match (options.get_only, options.build_only) {
            (true, true) => {
                return Err(ConfigurationError::InvalidOptions(
                    "--get-only and --build-only are mutually exclusive".to_string(),
                ))
            }
            (true, false) => RunMode::GetOnly,
            (false, true) => RunMode::BuildOnly,
            (false, false) => RunMode::Full,
        };

        if mode == RunMode::GetOnly && options.build_type.is_some() {
            return Err(ConfigurationError::InvalidOptions(
                "--build-type cannot be used with --get-only".to_string(),
            ));
        }
        if options.build_type.is_some() && host.family.is_unix() {
            tracing::warn!("--build-type only affects install paths on Windows");
        }

        let absolute = |p: PathBuf| {
            if p.is_absolute() {
                p
            } else {
                work_dir.join(p)
            }
        };

        let parent_src_dir = absolute(
            options
                .parent_src_dir
                .unwrap_or_else(|| PathBuf::from(defaults::PARENT_SRC_DIR)),
        );
        let install_root = options
            .install_dir
            .map_or_else(|| parent_src_dir.join(defaults::INSTALL_DIR_NAME), absolute);
        let build_dir_root = options.build_dir.map(absolute);

        let jobs = match options.jobs {
            Some(0) => {
                return Err(ConfigurationError::InvalidOptions(
                    "--jobs must be at least 1".to_string(),
                ))
            }
            Some(n) => n,
            None => num_cpus::get(),
        };

        Ok(Self {
            mode,
            host,
            layout: DirLayout {
                parent_src_dir,
                install_root,
                build_dir_root,
                family: host.family,
                build_type: options.build_type.unwrap_or_default(),
            },
            get_all: options.get_all,
            extract_zip: options.extract_zip,
            commit: !options.no_commit,
            cmake_command: options
                .cmake_command
                .unwrap_or_else(|| defaults::CMAKE_COMMAND.to_string()),
            jobs,
            registry_path: options.registry_path.map(absolute),
            work_dir: work_dir.to_path_buf(),
        })
    }
}
