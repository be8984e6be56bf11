use crate::graph::{Edge, EdgeKind, Graph, JobKind, Node};
use crate::parser::pipeline::{Job, Pipeline};

/// Builds a dependency [`Graph`] from a parsed pipeline.
pub struct GraphBuilder;

impl GraphBuilder {
    /// Build a fresh graph from the pipeline.
    ///
    /// Every call starts from an empty graph, so rebuilding from the same
    /// pipeline is deterministic and no state is carried between calls.
    pub fn build(pipeline: &Pipeline) -> Graph {
        let mut graph = Graph {
            stages: pipeline.stages.clone(),
            ..Graph::default()
        };

        Self::add_nodes(pipeline, &mut graph);
        Self::add_edges(pipeline, &mut graph);
        Self::extract_variables_and_secrets(pipeline, &mut graph);

        graph
    }

    fn add_nodes(pipeline: &Pipeline, graph: &mut Graph) {
        for job in &pipeline.jobs {
            graph.add_node(Node {
                id: job.name.clone(),
                label: job.name.clone(),
                stage: job.stage.clone(),
                kind: Self::job_kind(job),
                allow_failure: job.allow_failure,
            });
        }
    }

    fn job_kind(job: &Job) -> JobKind {
        match job.when.as_str() {
            "manual" => JobKind::Manual,
            "delayed" => JobKind::Delayed,
            _ => JobKind::Regular,
        }
    }

    fn add_edges(pipeline: &Pipeline, graph: &mut Graph) {
        for job in &pipeline.jobs {
            // Edges are added even when the referenced job does not exist;
            // consumers tolerate dangling sources.
            for need in &job.needs {
                graph.add_edge(Edge {
                    source: need.clone(),
                    target: job.name.clone(),
                    kind: EdgeKind::Needs,
                });
            }

            for dep in &job.dependencies {
                graph.add_edge(Edge {
                    source: dep.clone(),
                    target: job.name.clone(),
                    kind: EdgeKind::Artifact,
                });
            }

            // A job with no explicit dependencies inherits an ordering edge
            // from every job of the immediately preceding stage.
            if job.needs.is_empty() && job.dependencies.is_empty() {
                Self::add_stage_edges(pipeline, job, graph);
            }
        }
    }

    fn add_stage_edges(pipeline: &Pipeline, job: &Job, graph: &mut Graph) {
        let Some(stage_idx) = pipeline.stages.iter().position(|s| s == &job.stage) else {
            return;
        };
        if stage_idx == 0 {
            return;
        }

        let prev_stage = &pipeline.stages[stage_idx - 1];
        for prev_job in pipeline.jobs_in_stage(prev_stage) {
            graph.add_edge(Edge {
                source: prev_job.name.clone(),
                target: job.name.clone(),
                kind: EdgeKind::DependsOn,
            });
        }
    }

    fn extract_variables_and_secrets(pipeline: &Pipeline, graph: &mut Graph) {
        for var in &pipeline.variables {
            graph
                .variables
                .insert(var.name.clone(), var.value.clone());
        }

        // Job-level variables never override globals.
        for job in &pipeline.jobs {
            for (name, value) in &job.variables {
                graph
                    .variables
                    .entry(name.clone())
                    .or_insert_with(|| value.clone());
            }
        }

        for secret in &pipeline.secrets {
            graph.secrets.push(secret.name.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::gitlab::GitLabParser;

    fn build(yaml: &str) -> Graph {
        GraphBuilder::build(&GitLabParser::parse(yaml).unwrap())
    }

    #[test]
    fn one_node_per_job_with_derived_kind() {
        let graph = build(
            r#"
stages: [build, deploy]

compile:
  stage: build
  script: [make]

release:
  stage: deploy
  when: manual
  allow_failure: true
  script: [make release]
"#,
        );

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.node("compile").unwrap().kind, JobKind::Regular);
        let release = graph.node("release").unwrap();
        assert_eq!(release.kind, JobKind::Manual);
        assert!(release.allow_failure);
        assert_eq!(graph.stages, vec!["build", "deploy"]);
    }

    #[test]
    fn explicit_needs_suppress_stage_edges() {
        let graph = build(
            r#"
stages: [build, test]

build_app:
  stage: build
  script: [make]

build_docs:
  stage: build
  script: [make docs]

unit:
  stage: test
  needs: [build_app]
  script: [make test]
"#,
        );

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, "build_app");
        assert_eq!(graph.edges[0].target, "unit");
        assert_eq!(graph.edges[0].kind, EdgeKind::Needs);
    }

    #[test]
    fn implicit_edges_come_from_every_job_of_previous_stage() {
        let graph = build(
            r#"
stages: [build, test]

compile:
  stage: build
  script: [make]

lint:
  stage: build
  script: [make lint]

unit:
  stage: test
  script: [make test]
"#,
        );

        let sources: Vec<&str> = graph
            .edges
            .iter()
            .filter(|e| e.target == "unit")
            .map(|e| e.source.as_str())
            .collect();
        assert_eq!(sources, vec!["compile", "lint"]);
        assert!(graph.edges.iter().all(|e| e.kind == EdgeKind::DependsOn));
    }

    #[test]
    fn first_stage_and_unknown_stage_get_no_implicit_edges() {
        let graph = build(
            r#"
stages: [build, test]

compile:
  stage: build
  script: [make]

orphan:
  stage: undeclared
  script: [true]
"#,
        );

        assert!(graph.edges.is_empty());
    }

    #[test]
    fn dangling_needs_reference_still_produces_an_edge() {
        let graph = build(
            r#"
unit:
  stage: test
  needs: [ghost]
  script: [make test]
"#,
        );

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, "ghost");
        assert!(graph.node("ghost").is_none());
    }

    #[test]
    fn artifact_dependencies_use_their_own_edge_kind() {
        let graph = build(
            r#"
stages: [build, deploy]

package:
  stage: build
  script: [make dist]

ship:
  stage: deploy
  dependencies: [package]
  script: [./ship.sh]
"#,
        );

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].kind, EdgeKind::Artifact);
    }

    #[test]
    fn global_variables_win_over_job_variables() {
        let graph = build(
            r#"
variables:
  TARGET: production

deploy:
  stage: deploy
  variables:
    TARGET: staging
    REGION: eu-west-1
  script: [./deploy.sh]
"#,
        );

        assert_eq!(
            graph.variables.get("TARGET").map(String::as_str),
            Some("production")
        );
        assert_eq!(
            graph.variables.get("REGION").map(String::as_str),
            Some("eu-west-1")
        );
    }

    #[test]
    fn rebuilding_the_same_pipeline_is_deterministic() {
        let yaml = r#"
stages: [build, test, deploy]

variables:
  API_TOKEN:
    value: "t"
    masked: true

build: {stage: build, script: [make]}
unit: {stage: test, script: [make test]}
e2e: {stage: test, script: [make e2e]}
ship: {stage: deploy, needs: [unit, e2e], script: [./ship.sh]}
"#;
        let pipeline = GitLabParser::parse(yaml).unwrap();
        let first = serde_json::to_string(&GraphBuilder::build(&pipeline)).unwrap();
        let second = serde_json::to_string(&GraphBuilder::build(&pipeline)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_pipeline_builds_an_empty_graph() {
        let graph = build("");
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
        assert!(graph.variables.is_empty());
        assert!(graph.secrets.is_empty());
    }
}
