//! Infrastructure layer
//!
//! Handles all I/O operations: network, filesystem, git and external
//! processes. This module is the only place where side effects occur.

pub mod bookkeeper;
pub mod download;
pub mod filesystem;
pub mod git;
pub mod materialize;
pub mod process;
