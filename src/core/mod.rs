//! Core orchestration logic
//!
//! Pure decisions about what to retrieve and build and in which order.
//! Side effects are reached only through the seams defined here
//! ([`orchestrator::SourceMaterializer`], [`orchestrator::Bookkeeper`]) and
//! [`crate::infra::process::CommandRunner`].
//!
//! # Submodules
//!
//! - [`platform`] - Host description and platform filter
//! - [`resolver`] - Dependency graph and build scheduling
//! - [`template`] - Placeholder substitution in command templates
//! - [`layout`] - Directory derivations per library
//! - [`procedure`] - Per-library build parameters
//! - [`builder`] - Build command execution
//! - [`bookkeeping`] - Retrieval summary and commit message
//! - [`orchestrator`] - Run driver

pub mod bookkeeping;
pub mod builder;
pub mod layout;
pub mod orchestrator;
pub mod platform;
pub mod procedure;
pub mod resolver;
pub mod template;
