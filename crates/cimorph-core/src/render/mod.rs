use crate::graph::{EdgeKind, Graph};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Generate a Mermaid flowchart diagram from a dependency graph.
pub fn to_mermaid(graph: &Graph) -> String {
    let mut lines = Vec::new();
    lines.push("graph LR".to_string());

    for node in &graph.nodes {
        let label = if node.stage.is_empty() {
            node.label.clone()
        } else {
            format!("{}\\n({})", node.label, node.stage)
        };
        lines.push(format!("    {}[\"{}\"]", mermaid_id(&node.id), label));
    }

    for edge in &graph.edges {
        // Artifact hand-offs render dashed to set them apart from
        // execution-order edges.
        let arrow = match edge.kind {
            EdgeKind::Artifact => "-.->",
            _ => "-->",
        };
        lines.push(format!(
            "    {} {} {}",
            mermaid_id(&edge.source),
            arrow,
            mermaid_id(&edge.target)
        ));
    }

    let roots = root_ids(graph);
    let leaves = leaf_ids(graph);
    if !roots.is_empty() {
        let ids: Vec<String> = roots.iter().map(|id| mermaid_id(id)).collect();
        lines.push(format!(
            "    style {} fill:#22c55e,color:#fff",
            ids.join(",")
        ));
    }
    if !leaves.is_empty() {
        let ids: Vec<String> = leaves.iter().map(|id| mermaid_id(id)).collect();
        lines.push(format!(
            "    style {} fill:#3b82f6,color:#fff",
            ids.join(",")
        ));
    }

    lines.join("\n")
}

/// Generate a DOT (Graphviz) representation of the dependency graph.
pub fn to_dot(graph: &Graph) -> String {
    let mut lines = Vec::new();
    lines.push("digraph pipeline {".to_string());
    lines.push("    rankdir=LR;".to_string());
    lines.push("    node [shape=box, style=\"rounded,filled\", fontname=\"Helvetica\"];".to_string());
    lines.push("    edge [color=\"#666666\"];".to_string());
    lines.push(String::new());

    let roots = root_ids(graph);
    let leaves = leaf_ids(graph);

    for node in &graph.nodes {
        let color = if roots.contains(node.id.as_str()) {
            "#22c55e"
        } else if leaves.contains(node.id.as_str()) {
            "#3b82f6"
        } else {
            "#f59e0b"
        };
        lines.push(format!(
            "    \"{}\" [label=\"{}\\n({})\", fillcolor=\"{}\", fontcolor=\"#ffffff\"];",
            node.id, node.label, node.stage, color
        ));
    }

    lines.push(String::new());

    for edge in &graph.edges {
        let style = match edge.kind {
            EdgeKind::Artifact => " [style=dashed]",
            _ => "",
        };
        lines.push(format!(
            "    \"{}\" -> \"{}\"{};",
            edge.source, edge.target, style
        ));
    }

    lines.push("}".to_string());
    lines.join("\n")
}

/// Generate an ASCII level layout of the dependency graph.
///
/// Edges whose endpoints have no node are skipped for layout purposes;
/// cyclic graphs degrade to an error string rather than a diagram.
pub fn to_ascii(graph: &Graph) -> String {
    let dag = to_petgraph(graph);

    let topo = match petgraph::algo::toposort(&dag, None) {
        Ok(t) => t,
        Err(_) => return "Error: cycle detected in dependency graph".to_string(),
    };

    // A job's level is one past the deepest of its dependencies.
    let mut levels: HashMap<NodeIndex, usize> = HashMap::new();
    for &node in &topo {
        let level = dag
            .neighbors_directed(node, Direction::Incoming)
            .map(|dep| levels.get(&dep).copied().unwrap_or(0) + 1)
            .max()
            .unwrap_or(0);
        levels.insert(node, level);
    }

    let max_level = levels.values().copied().max().unwrap_or(0);
    let mut level_jobs: Vec<Vec<NodeIndex>> = vec![Vec::new(); max_level + 1];
    for &node in &topo {
        if let Some(&level) = levels.get(&node) {
            level_jobs[level].push(node);
        }
    }

    let mut lines = Vec::new();
    lines.push(format!(
        "Pipeline ({} jobs, {} levels)",
        graph.nodes.len(),
        max_level + 1
    ));
    lines.push("=".repeat(60));
    lines.push(String::new());

    for (level, jobs) in level_jobs.iter().enumerate() {
        let prefix = if level == 0 {
            "START".to_string()
        } else {
            format!("L{}", level)
        };
        let job_strs: Vec<String> = jobs
            .iter()
            .map(|&idx| {
                let id = dag[idx];
                match graph.node(id) {
                    Some(node) if !node.stage.is_empty() => {
                        format!("[{} ({})]", id, node.stage)
                    }
                    _ => format!("[{}]", id),
                }
            })
            .collect();

        if job_strs.len() > 1 {
            lines.push(format!("  {:>5} ─┬─ {}", prefix, job_strs[0]));
            for (i, js) in job_strs[1..].iter().enumerate() {
                if i == job_strs.len() - 2 {
                    lines.push(format!("         └─ {}", js));
                } else {
                    lines.push(format!("         ├─ {}", js));
                }
            }
        } else if let Some(js) = job_strs.first() {
            lines.push(format!("  {:>5} ── {}", prefix, js));
        }

        if level < max_level {
            lines.push("         │".to_string());
        }
    }

    lines.join("\n")
}

/// Build a petgraph view over the nodes and the edges whose endpoints both
/// exist. Dangling references stay in the `Graph` itself but cannot take
/// part in a topological layout.
fn to_petgraph(graph: &Graph) -> DiGraph<&str, ()> {
    let mut dag = DiGraph::new();
    let mut indexes = HashMap::new();

    for node in &graph.nodes {
        indexes.insert(node.id.as_str(), dag.add_node(node.id.as_str()));
    }
    for edge in &graph.edges {
        if let (Some(&source), Some(&target)) = (
            indexes.get(edge.source.as_str()),
            indexes.get(edge.target.as_str()),
        ) {
            dag.add_edge(source, target, ());
        }
    }

    dag
}

fn root_ids(graph: &Graph) -> HashSet<&str> {
    let targets: HashSet<&str> = graph.edges.iter().map(|e| e.target.as_str()).collect();
    graph
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| !targets.contains(id))
        .collect()
}

fn leaf_ids(graph: &Graph) -> HashSet<&str> {
    let sources: HashSet<&str> = graph.edges.iter().map(|e| e.source.as_str()).collect();
    graph
        .nodes
        .iter()
        .map(|n| n.id.as_str())
        .filter(|id| !sources.contains(id))
        .collect()
}

fn mermaid_id(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::builder::GraphBuilder;
    use crate::parser::gitlab::GitLabParser;

    fn build(yaml: &str) -> Graph {
        GraphBuilder::build(&GitLabParser::parse(yaml).unwrap())
    }

    fn linear() -> Graph {
        build(
            r#"
stages: [build, test]

build:
  stage: build
  script: [make]

test:
  stage: test
  needs: [build]
  script: [make test]
"#,
        )
    }

    #[test]
    fn mermaid_contains_nodes_and_edges() {
        let mermaid = to_mermaid(&linear());
        assert!(mermaid.contains("graph LR"));
        assert!(mermaid.contains("build"));
        assert!(mermaid.contains("test"));
        assert!(mermaid.contains("-->"));
    }

    #[test]
    fn mermaid_sanitizes_ids() {
        let graph = build(
            r#"
"deploy:prod":
  script: [./deploy.sh]
"#,
        );
        let mermaid = to_mermaid(&graph);
        assert!(mermaid.contains("deploy_prod["));
    }

    #[test]
    fn artifact_edges_render_dashed() {
        let graph = build(
            r#"
package:
  stage: build
  script: [make dist]

ship:
  stage: deploy
  dependencies: [package]
  script: [./ship.sh]
"#,
        );
        assert!(to_mermaid(&graph).contains("-.->"));
        assert!(to_dot(&graph).contains("[style=dashed]"));
    }

    #[test]
    fn dot_is_a_digraph_with_edges() {
        let dot = to_dot(&linear());
        assert!(dot.contains("digraph"));
        assert!(dot.contains("\"build\" -> \"test\";"));
    }

    #[test]
    fn ascii_lays_out_levels() {
        let ascii = to_ascii(&linear());
        assert!(ascii.contains("2 jobs, 2 levels"));
        assert!(ascii.contains("START"));
        assert!(ascii.contains("L1"));
    }

    #[test]
    fn ascii_reports_cycles_instead_of_looping() {
        let graph = build(
            r#"
a:
  needs: [b]
  script: [true]

b:
  needs: [a]
  script: [true]
"#,
        );
        assert!(to_ascii(&graph).contains("cycle detected"));
    }
}
