//! Reference Graph
//!
//! Directed graph over qualified paths: one edge per reference leaf, from
//! the referencing path to the path it names. Built by the resolver as it
//! walks chains; used for diagnostics and export, never for resolution.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

use crate::model::QualifiedPath;

#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    graph: DiGraph<QualifiedPath, ()>,
    indices: HashMap<QualifiedPath, NodeIndex>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, path: &QualifiedPath) -> NodeIndex {
        if let Some(&idx) = self.indices.get(path) {
            return idx;
        }
        let idx = self.graph.add_node(path.clone());
        self.indices.insert(path.clone(), idx);
        idx
    }

    /// Record that `from` references `to`
    pub fn add_reference(&mut self, from: &QualifiedPath, to: &QualifiedPath) {
        let from_idx = self.node(from);
        let to_idx = self.node(to);
        if self.graph.find_edge(from_idx, to_idx).is_none() {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Number of reference edges
    pub fn reference_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of distinct paths that take part in any reference
    pub fn path_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Paths `path` references directly
    pub fn targets(&self, path: &QualifiedPath) -> Vec<&QualifiedPath> {
        self.neighbors(path, Direction::Outgoing)
    }

    /// Paths that reference `path` directly
    pub fn referrers(&self, path: &QualifiedPath) -> Vec<&QualifiedPath> {
        self.neighbors(path, Direction::Incoming)
    }

    fn neighbors(&self, path: &QualifiedPath, direction: Direction) -> Vec<&QualifiedPath> {
        let Some(&idx) = self.indices.get(path) else {
            return Vec::new();
        };
        let mut out: Vec<&QualifiedPath> = self
            .graph
            .edges_directed(idx, direction)
            .filter_map(|e| {
                let other = match direction {
                    Direction::Outgoing => e.target(),
                    Direction::Incoming => e.source(),
                };
                self.graph.node_weight(other)
            })
            .collect();
        out.sort();
        out
    }

    /// Every path whose text ultimately comes from `path`, nearest first
    pub fn dependents(&self, path: &QualifiedPath) -> Vec<(&QualifiedPath, usize)> {
        let Some(&start) = self.indices.get(path) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(start, 0usize)];

        while let Some((idx, depth)) = stack.pop() {
            if !visited.insert(idx) {
                continue;
            }
            if idx != start {
                if let Some(weight) = self.graph.node_weight(idx) {
                    result.push((weight, depth));
                }
            }
            for edge in self.graph.edges_directed(idx, Direction::Incoming) {
                stack.push((edge.source(), depth + 1));
            }
        }

        result.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        result
    }

    /// Export to GraphViz DOT, clustered by namespace
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph ReferenceGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push('\n');

        let mut by_namespace: HashMap<&str, Vec<&QualifiedPath>> = HashMap::new();
        for path in self.graph.node_weights() {
            by_namespace.entry(path.namespace.as_str()).or_default().push(path);
        }
        let mut namespaces: Vec<_> = by_namespace.into_iter().collect();
        namespaces.sort_by(|a, b| a.0.cmp(b.0));

        for (namespace, mut paths) in namespaces {
            paths.sort();
            let namespace = escape_dot(namespace);
            output.push_str(&format!("  subgraph \"cluster_{}\" {{\n", namespace));
            output.push_str(&format!("    label=\"{}\";\n", namespace));
            for path in paths {
                output.push_str(&format!(
                    "    \"{}\" [label=\"{}\"];\n",
                    escape_dot(&path.to_string()),
                    escape_dot(&path.key_path())
                ));
            }
            output.push_str("  }\n");
        }

        output.push('\n');

        let mut edges: Vec<(&QualifiedPath, &QualifiedPath)> = self
            .graph
            .edge_references()
            .filter_map(|e| {
                Some((
                    self.graph.node_weight(e.source())?,
                    self.graph.node_weight(e.target())?,
                ))
            })
            .collect();
        edges.sort();
        for (from, to) in edges {
            output.push_str(&format!(
                "  \"{}\" -> \"{}\";\n",
                escape_dot(&from.to_string()),
                escape_dot(&to.to_string())
            ));
        }

        output.push_str("}\n");
        output
    }
}

/// Quote-safe text for a DOT string literal
fn escape_dot(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
