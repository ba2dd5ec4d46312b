//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no orchestration logic - that belongs in [`crate::core`].

pub mod commands;
pub mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::defaults;
use crate::config::RunOptions;
use crate::core::layout::BuildType;

/// Builddeps - retrieve and build third-party dependencies
///
/// Libraries are taken from a registry, filtered for the host platform,
/// ordered by their dependencies and built one at a time.
#[derive(Parser, Debug)]
#[command(name = "builddeps")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding one source tree per library
    #[arg(long, value_name = "DIR")]
    pub parent_src_dir: Option<PathBuf>,

    /// Install root (default: <parent-src-dir>/install)
    #[arg(long, value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Root for out-of-tree build directories (default: each source tree)
    #[arg(long, value_name = "DIR")]
    pub build_dir: Option<PathBuf>,

    /// Build configuration; only changes install paths on Windows
    #[arg(long, value_parser = parse_build_type, value_name = "TYPE")]
    pub build_type: Option<BuildType>,

    /// Only retrieve sources
    #[arg(long, conflicts_with = "build_only")]
    pub get_only: bool,

    /// Only build sources already on disk
    #[arg(long)]
    pub build_only: bool,

    /// Retrieve every registry library regardless of platform
    #[arg(long)]
    pub get_all: bool,

    /// Unpack downloaded zip archives
    #[arg(long)]
    pub extract_zip: bool,

    /// Registry file to use instead of the built-in one
    #[arg(long, value_name = "PATH")]
    pub registry: Option<PathBuf>,

    /// Do not commit retrieved sources
    #[arg(long)]
    pub no_commit: bool,

    /// Parallel jobs passed to build tools (default: CPU count)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// CMake executable
    #[arg(long, env = defaults::CMAKE_ENV, value_name = "CMD")]
    pub cmake: Option<String>,

    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_build_type(value: &str) -> Result<BuildType, String> {
    value.parse()
}

impl Cli {
    /// Options for [`crate::config::RunConfig::resolve`]
    pub fn options(&self) -> RunOptions {
        RunOptions {
            parent_src_dir: self.parent_src_dir.clone(),
            install_dir: self.install_dir.clone(),
            build_dir: self.build_dir.clone(),
            build_type: self.build_type,
            get_only: self.get_only,
            build_only: self.build_only,
            get_all: self.get_all,
            extract_zip: self.extract_zip,
            no_commit: self.no_commit,
            jobs: self.jobs,
            cmake_command: self.cmake.clone(),
            registry_path: self.registry.clone(),
        }
    }

    /// Log filter directive for the chosen verbosity
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Execute the run
    pub async fn run(self) -> Result<()> {
        commands::run::execute(&self).await
    }
}
