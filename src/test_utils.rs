//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

/// Minimum proptest iterations
pub const MIN_PROPTEST_ITERATIONS: u32 = 100;

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a library name as registries spell them
    pub fn library_name() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,15}"
    }

    /// Generate a placeholder name accepted by command templates
    pub fn placeholder_name() -> impl Strategy<Value = String> {
        "[a-z_][a-z0-9_]{0,8}"
    }

    /// Generate a valid SHA256 hash (64 hex characters)
    pub fn sha256_hash() -> impl Strategy<Value = String> {
        "[0-9a-f]{64}"
    }

    /// Generate an acyclic dependency table
    ///
    /// Entry `i` lists the nodes node `i` depends on; all are below `i`.
    pub fn dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
        (1usize..12).prop_flat_map(|n| {
            (0..n)
                .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(4)))
                .collect::<Vec<_>>()
                .prop_map(|deps| {
                    deps.into_iter()
                        .enumerate()
                        .map(|(i, d)| d.into_iter().filter(|&j| j < i).collect())
                        .collect()
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use super::MIN_PROPTEST_ITERATIONS;
    use crate::registry::Registry;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn test_library_name_is_loadable(name in library_name()) {
            let toml = format!("[[library]]\nname = \"{name}\"\narchive = \"https://example.com/{name}.zip\"\n");
            let registry = Registry::from_toml(&toml).unwrap();
            prop_assert_eq!(registry.len(), 1);
        }

        #[test]
        fn test_sha256_hash_generator(hash in sha256_hash()) {
            prop_assert_eq!(hash.len(), 64);
            prop_assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        }

        #[test]
        fn test_dag_edges_point_backwards(deps in dag()) {
            for (i, d) in deps.iter().enumerate() {
                prop_assert!(d.iter().all(|&j| j < i));
            }
        }
    }
}
