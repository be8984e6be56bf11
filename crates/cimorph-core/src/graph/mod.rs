pub mod builder;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a job starts once its dependencies are satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Regular,
    Manual,
    Delayed,
}

/// A job node in the dependency graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub stage: String,
    #[serde(rename = "type")]
    pub kind: JobKind,
    #[serde(rename = "allowFailure")]
    pub allow_failure: bool,
}

/// The relationship an edge encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Explicit `needs:` dependency.
    Needs,
    /// Artifact hand-off declared via `dependencies:`.
    Artifact,
    /// Implicit ordering inferred from stage position.
    DependsOn,
}

/// A directed edge: `source` must complete before `target` starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

/// Job dependency graph with pipeline-level metadata.
///
/// Node ids are unique and edges are unique per (source, target) pair; the
/// first insertion wins and later duplicates are no-ops. Edges may
/// reference job names that have no node (dangling references in the
/// source config are kept rather than rejected).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub variables: BTreeMap<String, String>,
    pub secrets: Vec<String>,
    pub stages: Vec<String>,
}

impl Graph {
    /// Add a node unless one with the same id already exists.
    pub fn add_node(&mut self, node: Node) {
        if !self.nodes.iter().any(|n| n.id == node.id) {
            self.nodes.push(node);
        }
    }

    /// Add an edge unless one with the same (source, target) pair already
    /// exists, regardless of kind.
    pub fn add_edge(&mut self, edge: Edge) {
        if !self
            .edges
            .iter()
            .any(|e| e.source == edge.source && e.target == edge.target)
        {
            self.edges.push(edge);
        }
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> Node {
        Node {
            id: id.to_string(),
            label: id.to_string(),
            stage: "test".to_string(),
            kind: JobKind::Regular,
            allow_failure: false,
        }
    }

    #[test]
    fn duplicate_node_ids_are_ignored() {
        let mut graph = Graph::default();
        graph.add_node(node("build"));
        let mut second = node("build");
        second.stage = "deploy".to_string();
        graph.add_node(second);

        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].stage, "test");
    }

    #[test]
    fn duplicate_edges_keep_first_kind() {
        let mut graph = Graph::default();
        graph.add_edge(Edge {
            source: "a".to_string(),
            target: "b".to_string(),
            kind: EdgeKind::Needs,
        });
        graph.add_edge(Edge {
            source: "a".to_string(),
            target: "b".to_string(),
            kind: EdgeKind::Artifact,
        });

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].kind, EdgeKind::Needs);
    }

    #[test]
    fn serializes_with_contract_field_names() {
        let mut graph = Graph::default();
        graph.stages.push("build".to_string());
        graph.add_node(node("build"));
        graph.add_edge(Edge {
            source: "build".to_string(),
            target: "test".to_string(),
            kind: EdgeKind::DependsOn,
        });
        graph
            .variables
            .insert("CI".to_string(), "true".to_string());

        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["nodes"][0]["type"], "regular");
        assert_eq!(json["nodes"][0]["allowFailure"], false);
        assert_eq!(json["edges"][0]["type"], "depends_on");
        assert_eq!(json["variables"]["CI"], "true");
        assert_eq!(json["stages"][0], "build");
    }
}
