//! Retrieval bookkeeping
//!
//! Summarises which libraries were newly acquired and which were refreshed,
//! and renders the commit message recorded after retrieval.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::registry::{LibraryId, SourceKind};

/// Result of materializing one library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievalOutcome {
    pub id: LibraryId,
    pub kind: SourceKind,
    pub local_path: PathBuf,
    pub newly_acquired: bool,
}

/// Outcomes of a retrieval pass in retrieval order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RetrievalSummary {
    outcomes: Vec<RetrievalOutcome>,
}

impl RetrievalSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: RetrievalOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[RetrievalOutcome] {
        &self.outcomes
    }

    /// Libraries acquired for the first time
    pub fn newly_added(&self) -> Vec<&LibraryId> {
        self.outcomes
            .iter()
            .filter(|o| o.newly_acquired)
            .map(|o| &o.id)
            .collect()
    }

    /// Libraries that were already present
    pub fn updated(&self) -> Vec<&LibraryId> {
        self.outcomes
            .iter()
            .filter(|o| !o.newly_acquired)
            .map(|o| &o.id)
            .collect()
    }

    /// Retrieved version-controlled trees
    pub fn git_trees(&self) -> impl Iterator<Item = &RetrievalOutcome> {
        self.outcomes.iter().filter(|o| o.kind == SourceKind::Git)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Checked-out state of one retrieved repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryDetail {
    pub name: String,
    pub branch: String,
    pub short_sha: String,
}

impl fmt::Display for RepositoryDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} @ {}", self.name, self.branch, self.short_sha)
    }
}

/// Render the bookkeeping commit message
pub fn commit_message(
    summary: &RetrievalSummary,
    details: &[RepositoryDetail],
    now: DateTime<Utc>,
) -> String {
    let mut message = format!(
        "Update dependencies: {}\n",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let section = |message: &mut String, title: &str, lines: Vec<String>| {
        if !lines.is_empty() {
            message.push('\n');
            message.push_str(title);
            message.push_str(":\n");
            message.push_str(&lines.join("\n"));
        }
    };

    section(
        &mut message,
        "Newly added",
        summary
            .newly_added()
            .iter()
            .map(|id| format!("- {id}"))
            .collect(),
    );
    section(
        &mut message,
        "Updated",
        summary.updated().iter().map(|id| format!("- {id}")).collect(),
    );
    section(
        &mut message,
        "Repository details",
        details.iter().map(ToString::to_string).collect(),
    );

    message
}

/// Components of the longer path beyond the prefix shared with the shorter
///
/// Turns a repository root and a directory inside it into the relative path
/// git expects, e.g. `/w/repo` and `/w/repo/src/tp` into `src/tp`.
pub fn path_difference(a: &Path, b: &Path) -> PathBuf {
    let a: Vec<Component<'_>> = a.components().collect();
    let b: Vec<Component<'_>> = b.components().collect();
    let (short, long) = if b.len() < a.len() { (b, a) } else { (a, b) };

    let common = short
        .iter()
        .zip(long.iter())
        .take_while(|(x, y)| x == y)
        .count();

    long[common..].iter().collect()
}
