use crate::graph::Graph;
use std::collections::HashSet;

/// Find the longest dependency chain in the graph, by node count.
///
/// Entry points are the jobs no edge points at; exploration follows
/// outgoing edges depth-first and the first longest path found is kept
/// (an equally long later path never replaces it). Returns an empty path
/// when every node has an incoming edge, e.g. on a fully cyclic graph.
pub fn find_critical_path(graph: &Graph) -> Vec<String> {
    let targets: HashSet<&str> = graph.edges.iter().map(|e| e.target.as_str()).collect();
    let entries: Vec<&str> = graph
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| !targets.contains(id))
        .collect();

    if entries.is_empty() {
        return Vec::new();
    }

    let cap = graph.nodes.len();
    let mut longest = Vec::new();
    let mut path = Vec::new();
    for entry in entries {
        extend_path(graph, entry, cap, &mut path, &mut longest);
    }

    longest
}

// A target already on the current path, or a path at the node-count cap,
// exhausts the branch instead of extending it. Paths therefore stay
// simple and recursion is bounded even on cyclic input.
fn extend_path(
    graph: &Graph,
    node: &str,
    cap: usize,
    path: &mut Vec<String>,
    longest: &mut Vec<String>,
) {
    path.push(node.to_string());

    let mut extended = false;
    if path.len() < cap {
        for edge in &graph.edges {
            if edge.source == node && !path.iter().any(|p| p == &edge.target) {
                extended = true;
                extend_path(graph, &edge.target, cap, path, longest);
            }
        }
    }

    if !extended && path.len() > longest.len() {
        *longest = path.clone();
    }

    path.pop();
}
