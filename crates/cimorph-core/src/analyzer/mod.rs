pub mod critical_path;
pub mod cycles;
pub mod dependencies;

use crate::graph::Graph;
use serde::Serialize;

pub use critical_path::find_critical_path;
pub use cycles::detect_cycles;
pub use dependencies::{job_dependencies, JobDependencies};

/// Summary metrics for a dependency graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphMetrics {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub total_stages: usize,
    pub total_variables: usize,
    pub total_secrets: usize,
    pub cycles: usize,
    pub critical_path_length: usize,
    pub avg_job_dependencies: f64,
}

/// Everything the analyzer derives from one graph.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub metrics: GraphMetrics,
    pub cycles: Vec<Vec<String>>,
    pub critical_path: Vec<String>,
}

/// Run every analysis over the graph and bundle the results.
pub fn analyze(graph: &Graph) -> Analysis {
    let cycles = detect_cycles(graph);
    let critical_path = find_critical_path(graph);
    let metrics = metrics_with(graph, cycles.len(), critical_path.len());

    Analysis {
        metrics,
        cycles,
        critical_path,
    }
}

/// Compute summary metrics for the graph.
pub fn graph_metrics(graph: &Graph) -> GraphMetrics {
    metrics_with(
        graph,
        detect_cycles(graph).len(),
        find_critical_path(graph).len(),
    )
}

fn metrics_with(graph: &Graph, cycles: usize, critical_path_length: usize) -> GraphMetrics {
    let direct_total: usize = graph
        .nodes
        .iter()
        .map(|n| graph.edges.iter().filter(|e| e.target == n.id).count())
        .sum();
    let avg_job_dependencies = if graph.nodes.is_empty() {
        0.0
    } else {
        direct_total as f64 / graph.nodes.len() as f64
    };

    GraphMetrics {
        total_nodes: graph.nodes.len(),
        total_edges: graph.edges.len(),
        total_stages: graph.stages.len(),
        total_variables: graph.variables.len(),
        total_secrets: graph.secrets.len(),
        cycles,
        critical_path_length,
        avg_job_dependencies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::GraphBuilder;
    use crate::parser::gitlab::GitLabParser;

    #[test]
    fn empty_graph_metrics_are_all_zero() {
        let metrics = graph_metrics(&Graph::default());
        assert_eq!(metrics.total_nodes, 0);
        assert_eq!(metrics.total_edges, 0);
        assert_eq!(metrics.cycles, 0);
        assert_eq!(metrics.critical_path_length, 0);
        assert_eq!(metrics.avg_job_dependencies, 0.0);
    }

    #[test]
    fn two_stage_pipeline_end_to_end() {
        let yaml = r#"
stages: [build, test]

build:
  stage: build
  script: [make]

test:
  stage: test
  needs: [build]
  script: [make test]
"#;
        let graph = GraphBuilder::build(&GitLabParser::parse(yaml).unwrap());
        let analysis = analyze(&graph);

        assert_eq!(analysis.metrics.total_nodes, 2);
        assert_eq!(analysis.metrics.total_edges, 1);
        assert_eq!(analysis.metrics.cycles, 0);
        assert!(analysis.cycles.is_empty());
        assert_eq!(analysis.critical_path, vec!["build", "test"]);
        assert_eq!(analysis.metrics.critical_path_length, 2);
        assert_eq!(analysis.metrics.avg_job_dependencies, 0.5);
    }

    #[test]
    fn metrics_field_names_match_the_external_contract() {
        let json = serde_json::to_value(graph_metrics(&Graph::default())).unwrap();
        for key in [
            "total_nodes",
            "total_edges",
            "total_stages",
            "total_variables",
            "total_secrets",
            "cycles",
            "critical_path_length",
            "avg_job_dependencies",
        ] {
            assert!(json.get(key).is_some(), "missing metric field {key}");
        }
    }
}
