//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use builddeps::config::{RunConfig, RunOptions};
use builddeps::core::bookkeeping::RetrievalOutcome;
use builddeps::core::orchestrator::SourceMaterializer;
use builddeps::core::platform::{Arch, HostPlatform, PlatformFamily};
use builddeps::error::{ProcessError, RetrievalError};
use builddeps::infra::process::{CommandRunner, CommandStatus, Invocation};
use builddeps::registry::LibraryRecord;
use tempfile::TempDir;

/// Test workspace context
///
/// Creates a temporary working directory and provides utilities for
/// setting up source trees and registries.
pub struct TestWorkspace {
    /// Temporary directory acting as the working directory
    pub dir: TempDir,
}

impl TestWorkspace {
    /// Create a new workspace in a temporary directory
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Get the path to the workspace
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the workspace
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Create a directory in the workspace
    pub fn create_dir(&self, name: &str) {
        std::fs::create_dir_all(self.dir.path().join(name)).expect("Failed to create directory");
    }

    /// Check if a file exists in the workspace
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the workspace
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Write `registry.toml` and return its path
    pub fn write_registry(&self, content: &str) -> PathBuf {
        self.create_file("registry.toml", content);
        self.dir.path().join("registry.toml")
    }

    /// Run configuration for a Linux x86-64 host rooted in this workspace
    pub fn linux_config(&self, options: RunOptions) -> RunConfig {
        self.config(options, PlatformFamily::Linux)
    }

    /// Run configuration for the given host family
    pub fn config(&self, options: RunOptions, family: PlatformFamily) -> RunConfig {
        RunConfig::resolve(options, HostPlatform::new(family, Arch::X86_64), self.dir.path())
            .expect("Invalid test configuration")
    }

    /// Command running the builddeps binary inside the workspace
    pub fn builddeps(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_builddeps"));
        cmd.current_dir(self.dir.path()).env_remove("RUST_LOG");
        cmd
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Runner that records invocations and fails lines starting with `false`
#[derive(Default)]
pub struct ScriptedRunner {
    pub calls: RefCell<Vec<Invocation>>,
}

impl ScriptedRunner {
    /// Shell lines that were run, in order
    pub fn lines(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .map(|c| c.args.last().cloned().unwrap_or_default())
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandStatus, ProcessError> {
        self.calls.borrow_mut().push(invocation.clone());
        let failed = invocation
            .args
            .last()
            .is_some_and(|line| line.starts_with("false"));
        Ok(CommandStatus::from_code(i32::from(failed)))
    }
}

/// Materializer that creates directories and remembers what it has seen
pub struct FakeMaterializer {
    root: PathBuf,
    seen: RefCell<HashSet<String>>,
    fail_on: Option<String>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeMaterializer {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            seen: RefCell::new(HashSet::new()),
            fail_on: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Fail when asked for `library`
    pub fn failing_on(mut self, library: &str) -> Self {
        self.fail_on = Some(library.to_string());
        self
    }
}

impl SourceMaterializer for FakeMaterializer {
    async fn materialize(&self, record: &LibraryRecord) -> Result<RetrievalOutcome, RetrievalError> {
        let name = record.id.to_string();
        self.calls.borrow_mut().push(name.clone());
        if self.fail_on.as_deref() == Some(name.as_str()) {
            return Err(RetrievalError::new(name, "remote unreachable"));
        }
        let local_path = self.root.join(&name);
        std::fs::create_dir_all(&local_path).expect("Failed to create source dir");
        let newly_acquired = self.seen.borrow_mut().insert(name);
        Ok(RetrievalOutcome {
            id: record.id.clone(),
            kind: record.source_kind(),
            local_path,
            newly_acquired,
        })
    }
}

/// Two archive libraries where `y` depends on `x`
pub const CHAIN_REGISTRY: &str = r#"
[[library]]
name = "y"
archive = "https://example.com/y.zip"
dependencies = ["x"]

[library.build]
unix = ["echo build y"]

[[library]]
name = "x"
archive = "https://example.com/x.zip"

[library.build]
unix = ["echo build x"]
"#;
