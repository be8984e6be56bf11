use crate::graph::Graph;
use std::collections::HashSet;

/// Detect circular dependencies.
///
/// Colored depth-first search over the edge relation, started from every
/// node not yet visited. Each back-edge into the recursion stack records
/// one cycle: the current path from the first occurrence of the target,
/// closed by repeating the target. Overlapping cycles are reported as
/// found, without dedup.
pub fn detect_cycles(graph: &Graph) -> Vec<Vec<String>> {
    let mut cycles = Vec::new();
    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();

    for node in &graph.nodes {
        if !visited.contains(&node.id) {
            dfs(
                graph,
                &node.id,
                &mut visited,
                &mut rec_stack,
                &mut path,
                &mut cycles,
            );
        }
    }

    cycles
}

// Recursion only descends into unvisited names, so depth is bounded by the
// number of distinct names in the graph.
fn dfs(
    graph: &Graph,
    node: &str,
    visited: &mut HashSet<String>,
    rec_stack: &mut HashSet<String>,
    path: &mut Vec<String>,
    cycles: &mut Vec<Vec<String>>,
) {
    visited.insert(node.to_string());
    rec_stack.insert(node.to_string());
    path.push(node.to_string());

    for edge in &graph.edges {
        if edge.source != node {
            continue;
        }
        if !visited.contains(&edge.target) {
            dfs(graph, &edge.target, visited, rec_stack, path, cycles);
        } else if rec_stack.contains(&edge.target) {
            let start = path
                .iter()
                .position(|n| n == &edge.target)
                .unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].to_vec();
            cycle.push(edge.target.clone());
            cycles.push(cycle);
        }
    }

    path.pop();
    rec_stack.remove(node);
}
