//! Output formatting and progress indicators
//!
//! This module provides utilities for displaying progress bars
//! and formatted messages to the user.

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::orchestrator::{RunReport, RunState};

/// Create a progress bar for downloads
pub fn create_download_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .expect("Invalid progress bar template")
            .progress_chars("█▓▒░"),
    );
    pb
}

/// Print a human-readable summary of a run
pub fn print_report(report: &RunReport) {
    if !report.retrieved.is_empty() {
        let added = report.retrieved.newly_added();
        let updated = report.retrieved.updated();
        println!(
            "{} Retrieved {} library(ies): {} new, {} updated",
            status::SUCCESS,
            report.retrieved.len(),
            added.len(),
            updated.len()
        );
    }

    if let Some(error) = &report.bookkeeping_error {
        println!("{} Sources were not committed: {error}", status::WARNING);
    }

    if !report.built.is_empty() {
        println!("{} Built {} library(ies):", status::SUCCESS, report.built.len());
        for id in &report.built {
            println!("    {id}");
        }
    }

    if !report.skipped.is_empty() {
        println!(
            "  Skipped {} library(ies) without build commands",
            report.skipped.len()
        );
    }

    if matches!(report.state, RunState::Done) {
        println!("{} Done ({})", status::SUCCESS, report.mode);
    }
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("    caused by: {cause}");
    }
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";
}
