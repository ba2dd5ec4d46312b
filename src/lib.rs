//! Builddeps - third-party dependency build orchestrator
//!
//! Retrieves the source trees of a fixed registry of native libraries and
//! builds them in dependency order for the current host.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Scheduling, parameter derivation and the run driver
//! - [`registry`] - Library registry loaded from TOML
//! - [`infra`] - Infrastructure layer (network, filesystem, processes, git)
//! - [`config`] - Run configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
pub mod registry;

#[cfg(test)]
pub mod test_utils;
