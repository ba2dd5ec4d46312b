//! Dependency resolution
//!
//! Builds the dependency graph over the platform-filtered libraries and
//! computes a build order with Kahn's algorithm.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::core::platform::PlatformFamily;
use crate::error::ConfigurationError;
use crate::registry::{LibraryId, Registry};

/// Dependency graph for one run
///
/// Only edges between nodes of the graph are kept. Dependencies that point
/// outside the node set are recorded in [`BuildGraph::skipped`] instead.
#[derive(Debug, Default)]
pub struct BuildGraph {
    /// Nodes in declaration order
    nodes: Vec<LibraryId>,
    /// Number of unresolved dependencies per node
    in_degree: HashMap<LibraryId, usize>,
    /// Reverse edges: dependency -> libraries that depend on it
    dependents: HashMap<LibraryId, Vec<LibraryId>>,
    /// (library, dependency) pairs dropped because the dependency is not a node
    skipped: Vec<(LibraryId, LibraryId)>,
}

impl BuildGraph {
    /// Build a graph over `nodes`, asking `dependencies` for each node's edges
    pub fn new<F>(nodes: &[LibraryId], dependencies: F) -> Self
    where
        F: Fn(&LibraryId) -> Vec<LibraryId>,
    {
        let members: HashSet<&LibraryId> = nodes.iter().collect();
        let mut graph = Self {
            nodes: nodes.to_vec(),
            ..Self::default()
        };

        for id in nodes {
            let mut seen = HashSet::new();
            let mut degree = 0;
            for dep in dependencies(id) {
                if !seen.insert(dep.clone()) {
                    continue;
                }
                if members.contains(&dep) {
                    degree += 1;
                    graph.dependents.entry(dep).or_default().push(id.clone());
                } else {
                    graph.skipped.push((id.clone(), dep));
                }
            }
            graph.in_degree.insert(id.clone(), degree);
        }

        graph
    }

    /// In-degree of a node
    pub fn in_degree(&self, id: &LibraryId) -> Option<usize> {
        self.in_degree.get(id).copied()
    }

    /// Libraries depending directly on `id`
    pub fn dependents(&self, id: &LibraryId) -> &[LibraryId] {
        self.dependents.get(id).map_or(&[], Vec::as_slice)
    }

    /// Dependency references that did not become edges
    pub fn skipped(&self) -> &[(LibraryId, LibraryId)] {
        &self.skipped
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Compute a build order
    ///
    /// Every dependency comes before its dependents. Ties are broken by
    /// declaration order. Fails with [`ConfigurationError::CycleDetected`]
    /// when some nodes can never reach in-degree zero; no partial order is
    /// returned in that case.
    pub fn order(&self) -> Result<Vec<LibraryId>, ConfigurationError> {
        let mut remaining = self.in_degree.clone();
        let mut queue: VecDeque<&LibraryId> = self
            .nodes
            .iter()
            .filter(|id| remaining.get(*id) == Some(&0))
            .collect();
        let mut ordered = Vec::with_capacity(self.nodes.len());

        while let Some(id) = queue.pop_front() {
            ordered.push(id.clone());
            for dependent in self.dependents(id) {
                if let Some(degree) = remaining.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        if ordered.len() != self.nodes.len() {
            let placed: HashSet<&LibraryId> = ordered.iter().collect();
            let unresolved = self
                .nodes
                .iter()
                .filter(|id| !placed.contains(id))
                .map(ToString::to_string)
                .collect();
            return Err(ConfigurationError::CycleDetected {
                ordered: ordered.len(),
                total: self.nodes.len(),
                unresolved,
            });
        }

        Ok(ordered)
    }
}

/// Order the given libraries for building on a host family
///
/// Dependency references that are not part of `selected` are logged and
/// ignored: unknown names as invalid dependencies, known names as not
/// available on this platform.
pub fn schedule(
    registry: &Registry,
    family: PlatformFamily,
    selected: &[LibraryId],
) -> Result<Vec<LibraryId>, ConfigurationError> {
    let graph = BuildGraph::new(selected, |id| {
        registry
            .get(id)
            .map(|record| record.dependencies_for(family).to_vec())
            .unwrap_or_default()
    });

    for (library, dependency) in graph.skipped() {
        if registry.contains(dependency) {
            tracing::warn!(
                "Dependency '{dependency}' of '{library}' is not built on {family}, ignoring it"
            );
        } else {
            tracing::warn!("Invalid dependency '{dependency}' for '{library}', ignoring it");
        }
    }

    let order = graph.order()?;
    tracing::debug!(
        "Build order: {}",
        order
            .iter()
            .map(LibraryId::as_str)
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    Ok(order)
}
