//! The resolved module graph and its DOT rendering.

use std::collections::BTreeMap;
use std::fmt::Write;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use pfr_core::dependency::ModuleKey;
use pfr_core::specification::ModuleSpecification;

/// Edge label: the requirement the dependent placed on the dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEdge {
    pub requirement: Option<String>,
}

/// Resolved specifications, one per module key, backed by petgraph.
#[derive(Debug, Default)]
pub struct ResolvedGraph {
    graph: DiGraph<ModuleSpecification, ResolvedEdge>,
    index: BTreeMap<ModuleKey, NodeIndex>,
}

impl ResolvedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex. If the key is already present the existing index is returned.
    pub fn add_vertex(&mut self, spec: ModuleSpecification) -> NodeIndex {
        let key = spec.key();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.graph.add_node(spec);
        self.index.insert(key, idx);
        idx
    }

    /// Add a dependency edge from `from` to `to`, once.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: ResolvedEdge) {
        if !self.graph.edges(from).any(|e| e.target() == to) {
            self.graph.add_edge(from, to, edge);
        }
    }

    fn find(&self, key: &ModuleKey) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    /// Look up a vertex by key.
    pub fn get(&self, key: &ModuleKey) -> Option<&ModuleSpecification> {
        self.find(key).map(|idx| &self.graph[idx])
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// All vertices, sorted by key.
    pub fn vertices(&self) -> Vec<&ModuleSpecification> {
        self.index.values().map(|&idx| &self.graph[idx]).collect()
    }

    /// All edges as `(from, to, edge)`, sorted by endpoint keys.
    pub fn edges(&self) -> Vec<(&ModuleSpecification, &ModuleSpecification, &ResolvedEdge)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_references()
            .map(|e| (&self.graph[e.source()], &self.graph[e.target()], e.weight()))
            .collect();
        edges.sort_by(|a, b| (a.0.key(), a.1.key()).cmp(&(b.0.key(), b.1.key())));
        edges
    }

    /// Render the graph in DOT format.
    ///
    /// Nodes and edges are sorted by key so identical graphs render
    /// byte-identically.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph ResolvedModules {\n");
        for spec in self.vertices() {
            let id = quote(&spec.key().slug());
            let label = quote(&spec.label());
            if spec.is_missing() {
                let tooltip = quote(spec.reason.as_deref().unwrap_or("missing"));
                let _ = writeln!(out, "  {id} [label={label}, style=dashed, tooltip={tooltip}];");
            } else {
                let _ = writeln!(out, "  {id} [label={label}];");
            }
        }
        for (from, to, edge) in self.edges() {
            let from = quote(&from.key().slug());
            let to = quote(&to.key().slug());
            match &edge.requirement {
                Some(req) => {
                    let _ = writeln!(out, "  {from} -> {to} [label={}];", quote(req));
                }
                None => {
                    let _ = writeln!(out, "  {from} -> {to};");
                }
            }
        }
        out.push_str("}\n");
        out
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
