//! Run command implementation
//!
//! Wires the system runner, the git/HTTP materializer and the git bookkeeper
//! into the orchestrator and reports the outcome.

use anyhow::{Context, Result};

use crate::cli::output::{create_download_bar, print_report, status};
use crate::cli::Cli;
use crate::config::{defaults, RunConfig};
use crate::core::orchestrator::Orchestrator;
use crate::core::platform::HostPlatform;
use crate::infra::bookkeeper::GitBookkeeper;
use crate::infra::download::ProgressCallback;
use crate::infra::materialize::{ProgressFactory, RepositoryMaterializer};
use crate::infra::process::SystemRunner;
use crate::registry::Registry;

/// Execute a run with the parsed command line
pub async fn execute(cli: &Cli) -> Result<()> {
    let work_dir = std::env::current_dir().context("Failed to read the working directory")?;
    let host = HostPlatform::detect()?;
    let config = RunConfig::resolve(cli.options(), host, &work_dir)?;

    let registry = match &config.registry_path {
        Some(path) => Registry::load(path)
            .with_context(|| format!("Failed to load registry {}", path.display()))?,
        None => Registry::builtin().context("Built-in registry is invalid")?,
    };
    tracing::info!(
        "{} libraries in registry, host {host}, mode {}",
        registry.len(),
        config.mode
    );

    preflight(&config);

    let mut materializer = RepositoryMaterializer::new(config.layout.clone(), SystemRunner)
        .with_extract_zip(config.extract_zip);
    if !cli.quiet && !cli.json {
        materializer = materializer.with_progress(download_progress());
    }
    let bookkeeper = GitBookkeeper::new(
        &config.work_dir,
        &config.layout.parent_src_dir,
        SystemRunner,
    );

    let mut orchestrator = Orchestrator::new(&registry, &config, materializer, SystemRunner);
    if config.commit {
        orchestrator = orchestrator.with_bookkeeper(&bookkeeper);
    }

    let result = orchestrator.run().await;
    let report = orchestrator.into_report();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !cli.quiet {
        print_report(&report);
    }

    result.map_err(|e| {
        let library = e
            .library()
            .map(|name| format!(" ({name})"))
            .unwrap_or_default();
        anyhow::anyhow!("Run failed while {}{library}: {e}", e.stage())
    })
}

/// Warn about missing tools the run is going to need
fn preflight(config: &RunConfig) {
    if config.mode.retrieves() {
        for tool in defaults::PREFLIGHT_TOOLS {
            if which::which(tool).is_err() {
                tracing::warn!("{} '{tool}' not found on PATH", status::WARNING);
            }
        }
    }
    if config.mode.builds() && which::which(&config.cmake_command).is_err() {
        tracing::warn!(
            "{} CMake command '{}' not found on PATH",
            status::WARNING,
            config.cmake_command
        );
    }
}

fn download_progress() -> ProgressFactory {
    Box::new(|name: &str| -> ProgressCallback {
        let bar = create_download_bar(0);
        bar.set_message(name.to_string());
        Box::new(move |done, total| {
            if total > 0 && bar.length() != Some(total) {
                bar.set_length(total);
            }
            bar.set_position(done);
            if total > 0 && done >= total {
                bar.finish_and_clear();
            }
        })
    })
}
