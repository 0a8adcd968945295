// src/recipe/graph.rs

//! Recipe dependency graph for build ordering
//!
//! A directed graph of "X must be installed before Y" edges and a
//! deterministic topological sort over it.
//!
//! # Example
//!
//! ```
//! use portable_toolchain::recipe::RecipeGraph;
//!
//! let mut graph = RecipeGraph::new();
//! graph.add_recipe("binutils@2.26", &["bison@3.0"]);
//! graph.add_recipe("bison@3.0", &["m4@1.4"]);
//! graph.add_recipe("m4@1.4", &[]);
//!
//! let order = graph.topological_sort().unwrap();
//! assert_eq!(order, vec!["m4@1.4", "bison@3.0", "binutils@2.26"]);
//! ```
//!
//! # Circular Dependencies
//!
//! A cycle is a configuration error. It is reported with its participants
//! and never broken by picking an arbitrary edge to ignore.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

/// A directed graph representing recipe dependencies
#[derive(Debug, Default, Clone)]
pub struct RecipeGraph {
    /// Key: recipe name, Value: set of recipes this recipe depends on
    edges: BTreeMap<String, BTreeSet<String>>,
    /// Key: recipe name, Value: set of recipes that depend on this recipe
    reverse_edges: BTreeMap<String, BTreeSet<String>>,
}

impl RecipeGraph {
    /// Create a new empty recipe graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recipe with its dependencies
    ///
    /// If the recipe already exists, this merges the dependencies.
    pub fn add_recipe(&mut self, name: &str, dependencies: &[&str]) {
        self.add_node(name);
        for dep in dependencies {
            self.add_edge(name, dep);
        }
    }

    /// Ensure a node exists
    pub fn add_node(&mut self, name: &str) {
        self.edges.entry(name.to_string()).or_default();
        self.reverse_edges.entry(name.to_string()).or_default();
    }

    /// Record that `name` depends on `dep`
    pub fn add_edge(&mut self, name: &str, dep: &str) {
        self.add_node(name);
        self.add_node(dep);

        if let Some(deps) = self.edges.get_mut(name) {
            deps.insert(dep.to_string());
        }
        if let Some(dependents) = self.reverse_edges.get_mut(dep) {
            dependents.insert(name.to_string());
        }
    }

    /// Get the direct dependencies of a recipe
    pub fn dependencies(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(name)
    }

    /// Perform topological sort using Kahn's algorithm
    ///
    /// Returns the recipes in build order (dependencies before dependents).
    /// Ties are broken by name, so the order is reproducible.
    pub fn topological_sort(&self) -> Result<Vec<String>> {
        let mut in_degrees: BTreeMap<&str, usize> = self
            .edges
            .iter()
            .map(|(name, deps)| (name.as_str(), deps.len()))
            .collect();

        let mut ready: BTreeSet<&str> = in_degrees
            .iter()
            .filter(|&(_, deg)| *deg == 0)
            .map(|(name, _)| *name)
            .collect();

        let mut result = Vec::with_capacity(self.edges.len());

        while let Some(node) = ready.pop_first() {
            result.push(node.to_string());

            for dependent in self.reverse_edges.get(node).into_iter().flatten() {
                if let Some(deg) = in_degrees.get_mut(dependent.as_str()) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        ready.insert(dependent.as_str());
                    }
                }
            }
        }

        if result.len() != self.edges.len() {
            let participants = self.find_cycles().into_iter().next().unwrap_or_else(|| {
                self.edges
                    .keys()
                    .filter(|k| !result.contains(k))
                    .cloned()
                    .collect()
            });
            return Err(Error::DependencyCycle { participants });
        }

        Ok(result)
    }

    /// Find all cycles in the graph
    ///
    /// Each cycle is listed in edge order starting from the node where the
    /// depth-first search entered it.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut cycles = Vec::new();
        let mut visited = BTreeSet::new();
        let mut rec_stack = BTreeSet::new();
        let mut path = Vec::new();

        for start in self.edges.keys() {
            if !visited.contains(start) {
                self.find_cycles_dfs(start, &mut visited, &mut rec_stack, &mut path, &mut cycles);
            }
        }

        cycles
    }

    fn find_cycles_dfs(
        &self,
        node: &str,
        visited: &mut BTreeSet<String>,
        rec_stack: &mut BTreeSet<String>,
        path: &mut Vec<String>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());
        path.push(node.to_string());

        if let Some(deps) = self.edges.get(node) {
            for dep in deps {
                if !visited.contains(dep) {
                    self.find_cycles_dfs(dep, visited, rec_stack, path, cycles);
                } else if rec_stack.contains(dep)
                    && let Some(cycle_start) = path.iter().position(|x| x == dep)
                {
                    cycles.push(path[cycle_start..].to_vec());
                }
            }
        }

        path.pop();
        rec_stack.remove(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_graph() {
        let graph = RecipeGraph::new();
        assert!(graph.topological_sort().unwrap().is_empty());
        assert!(graph.find_cycles().is_empty());
    }

    #[test]
    fn test_single_recipe() {
        let mut graph = RecipeGraph::new();
        graph.add_recipe("hello", &[]);

        assert!(graph.dependencies("hello").unwrap().is_empty());
        assert!(graph.dependencies("missing").is_none());
        assert_eq!(graph.topological_sort().unwrap(), vec!["hello"]);
    }

    #[test]
    fn test_chain_with_shortcut() {
        // a -> b -> c and a -> c
        let mut graph = RecipeGraph::new();
        graph.add_recipe("a", &["b", "c"]);
        graph.add_recipe("b", &["c"]);

        assert_eq!(graph.topological_sort().unwrap(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_diamond_dependencies() {
        let mut graph = RecipeGraph::new();
        graph.add_recipe("d", &["b", "c"]);
        graph.add_recipe("b", &["a"]);
        graph.add_recipe("c", &["a"]);

        // Ties broken by name
        assert_eq!(graph.topological_sort().unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_two_node_cycle_names_both() {
        let mut graph = RecipeGraph::new();
        graph.add_recipe("a", &["b"]);
        graph.add_recipe("b", &["a"]);

        match graph.topological_sort().unwrap_err() {
            Error::DependencyCycle { participants } => {
                assert_eq!(participants, vec!["a", "b"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cycle_below_acyclic_root() {
        let mut graph = RecipeGraph::new();
        graph.add_recipe("app", &["x"]);
        graph.add_recipe("x", &["y"]);
        graph.add_recipe("y", &["z"]);
        graph.add_recipe("z", &["x"]);

        let err = graph.topological_sort().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Circular dependency detected: x -> y -> z -> x"
        );
        assert_eq!(graph.find_cycles().len(), 1);
    }

    #[test]
    fn test_dependencies_merge() {
        let mut graph = RecipeGraph::new();
        graph.add_recipe("bison@3.0", &["m4@1.4"]);
        graph.add_recipe("bison@3.0", &["gettext"]);

        let deps = graph.dependencies("bison@3.0").unwrap();
        assert!(deps.contains("m4@1.4"));
        assert!(deps.contains("gettext"));
        // Dependencies are added as nodes too
        assert_eq!(
            graph.topological_sort().unwrap(),
            vec!["gettext", "m4@1.4", "bison@3.0"]
        );
    }
}
