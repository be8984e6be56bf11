use crate::graph::Graph;
use serde::Serialize;
use std::collections::HashSet;

/// Direct and transitive dependencies of a single job.
#[derive(Debug, Clone, Serialize)]
pub struct JobDependencies {
    pub direct: Vec<String>,
    pub transitive: Vec<String>,
}

/// Collect the dependencies of `job`.
///
/// `direct` lists the sources of every edge pointing at the job, in edge
/// insertion order. `transitive` is the depth-first closure of those
/// dependencies in visit order; the starting job is excluded even when a
/// cycle leads back to it.
pub fn job_dependencies(graph: &Graph, job: &str) -> JobDependencies {
    let direct = graph
        .edges
        .iter()
        .filter(|e| e.target == job)
        .map(|e| e.source.clone())
        .collect();

    let mut visited = HashSet::new();
    visited.insert(job.to_string());
    let mut transitive = Vec::new();
    collect_transitive(graph, job, &mut visited, &mut transitive);

    JobDependencies { direct, transitive }
}

// Recursion only descends into unvisited jobs, so depth is bounded by the
// number of distinct job names.
fn collect_transitive(
    graph: &Graph,
    job: &str,
    visited: &mut HashSet<String>,
    out: &mut Vec<String>,
) {
    for edge in &graph.edges {
        if edge.target == job && !visited.contains(&edge.source) {
            visited.insert(edge.source.clone());
            out.push(edge.source.clone());
            collect_transitive(graph, &edge.source, visited, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, EdgeKind, Graph};

    fn edge(source: &str, target: &str) -> Edge {
        Edge {
            source: source.to_string(),
            target: target.to_string(),
            kind: EdgeKind::Needs,
        }
    }

    #[test]
    fn linear_chain_reports_direct_and_transitive() {
        let mut graph = Graph::default();
        graph.add_edge(edge("a", "b"));
        graph.add_edge(edge("b", "c"));

        let deps = job_dependencies(&graph, "c");
        assert_eq!(deps.direct, vec!["b"]);
        assert_eq!(deps.transitive, vec!["b", "a"]);
    }

    #[test]
    fn diamond_visits_each_dependency_once() {
        let mut graph = Graph::default();
        graph.add_edge(edge("root", "left"));
        graph.add_edge(edge("root", "right"));
        graph.add_edge(edge("left", "sink"));
        graph.add_edge(edge("right", "sink"));

        let deps = job_dependencies(&graph, "sink");
        assert_eq!(deps.direct, vec!["left", "right"]);
        assert_eq!(deps.transitive, vec!["left", "root", "right"]);
    }

    #[test]
    fn cycle_does_not_report_the_starting_job() {
        let mut graph = Graph::default();
        graph.add_edge(edge("a", "b"));
        graph.add_edge(edge("b", "a"));

        let deps = job_dependencies(&graph, "a");
        assert_eq!(deps.direct, vec!["b"]);
        assert_eq!(deps.transitive, vec!["b"]);
    }

    #[test]
    fn dangling_sources_are_reported() {
        let mut graph = Graph::default();
        graph.add_edge(edge("ghost", "real"));

        let deps = job_dependencies(&graph, "real");
        assert_eq!(deps.direct, vec!["ghost"]);
        assert_eq!(deps.transitive, vec!["ghost"]);
    }

    #[test]
    fn job_without_dependencies_reports_empty_lists() {
        let graph = Graph::default();
        let deps = job_dependencies(&graph, "lonely");
        assert!(deps.direct.is_empty());
        assert!(deps.transitive.is_empty());
    }
}
