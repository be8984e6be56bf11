use crate::error::ParseError;
use crate::parser::pipeline::{Artifacts, Job, Pipeline, Secret, Variable};
use serde_yaml::Value;
use std::path::Path;

/// Parser for GitLab CI `.gitlab-ci.yml` files.
pub struct GitLabParser;

/// Reserved top-level keywords in GitLab CI that are NOT job definitions.
const RESERVED_KEYWORDS: &[&str] = &[
    "image",
    "services",
    "stages",
    "before_script",
    "after_script",
    "variables",
    "cache",
    "retry",
    "timeout",
    "default",
    "include",
    "workflow",
    "pages",
];

impl GitLabParser {
    /// Parse a GitLab CI file into a [`Pipeline`].
    pub fn parse_file(path: &Path) -> Result<Pipeline, ParseError> {
        let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse GitLab CI YAML content into a [`Pipeline`].
    ///
    /// Empty or non-mapping documents yield an empty pipeline; only
    /// syntactically invalid YAML is an error.
    pub fn parse(content: &str) -> Result<Pipeline, ParseError> {
        let yaml: Value = serde_yaml::from_str(content)?;

        let mut pipeline = Pipeline::default();
        let Some(mapping) = yaml.as_mapping() else {
            return Ok(pipeline);
        };

        pipeline.stages = Self::parse_stages(&yaml);
        Self::parse_global_variables(&yaml, &mut pipeline);
        pipeline.default_image = yaml
            .get("default")
            .and_then(|d| d.get("image"))
            .or_else(|| yaml.get("image"))
            .and_then(Self::parse_image);
        Self::parse_workflow(&yaml, &mut pipeline);
        Self::parse_includes(&yaml, &mut pipeline);

        for (key, value) in mapping {
            let Some(name) = key.as_str() else { continue };

            // Reserved keywords and hidden jobs (starting with .) are not jobs.
            if RESERVED_KEYWORDS.contains(&name) || name.starts_with('.') {
                continue;
            }
            if !value.is_mapping() {
                continue;
            }

            pipeline.jobs.push(Self::parse_job(name, value));
        }

        Ok(pipeline)
    }

    fn parse_stages(yaml: &Value) -> Vec<String> {
        yaml.get("stages")
            .and_then(|v| v.as_sequence())
            .map(|seq| {
                seq.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn parse_global_variables(yaml: &Value, pipeline: &mut Pipeline) {
        let Some(vars) = yaml.get("variables").and_then(|v| v.as_mapping()) else {
            return;
        };

        for (key, value) in vars {
            let Some(name) = key.as_str() else { continue };

            match value {
                Value::Mapping(m) => {
                    let protected = m
                        .get(Value::String("protected".to_string()))
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false);
                    let masked = m
                        .get(Value::String("masked".to_string()))
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false);
                    pipeline.variables.push(Variable {
                        name: name.to_string(),
                        value: m
                            .get(Value::String("value".to_string()))
                            .map(Self::scalar_to_string)
                            .unwrap_or_default(),
                        protected,
                        masked,
                    });

                    // Masked or protected variables are sensitive and also
                    // surfaced as secrets.
                    if masked || protected {
                        pipeline.secrets.push(Secret {
                            name: name.to_string(),
                            kind: "env".to_string(),
                            description: if masked {
                                "Masked variable".to_string()
                            } else {
                                "Protected variable".to_string()
                            },
                        });
                    }
                }
                other => pipeline.variables.push(Variable {
                    name: name.to_string(),
                    value: Self::scalar_to_string(other),
                    protected: false,
                    masked: false,
                }),
            }
        }
    }

    fn parse_job(name: &str, config: &Value) -> Job {
        let mut job = Job::new(name.to_string(), "test".to_string());

        if let Some(stage) = config.get("stage").and_then(|v| v.as_str()) {
            job.stage = stage.to_string();
        }
        job.image = config.get("image").and_then(Self::parse_image);
        job.script = Self::string_list(config.get("script"));
        job.before_script = Self::string_list(config.get("before_script"));
        job.after_script = Self::string_list(config.get("after_script"));
        job.dependencies = Self::string_list(config.get("dependencies"));
        if let Some(needs) = config.get("needs") {
            job.needs = Self::parse_needs(needs);
        }
        if let Some(vars) = config.get("variables").and_then(|v| v.as_mapping()) {
            for (key, value) in vars {
                if let Some(k) = key.as_str() {
                    job.variables
                        .insert(k.to_string(), Self::scalar_to_string(value));
                }
            }
        }
        job.artifacts = config.get("artifacts").and_then(Self::parse_artifacts);
        job.tags = Self::string_list(config.get("tags"));
        job.timeout = config
            .get("timeout")
            .and_then(|v| v.as_str())
            .map(String::from);
        if let Some(when) = config.get("when").and_then(|v| v.as_str()) {
            job.when = when.to_string();
        }
        job.allow_failure = config
            .get("allow_failure")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if let Some(rules) = config.get("rules").and_then(|v| v.as_sequence()) {
            job.rules = rules
                .iter()
                .filter_map(|r| r.get("if").and_then(|v| v.as_str()).map(String::from))
                .collect();
        }
        job.only_branches = Self::parse_branches(config.get("only"));
        job.except_branches = Self::parse_branches(config.get("except"));
        job.environment = config.get("environment").and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Mapping(m) => m
                .get(Value::String("name".to_string()))
                .and_then(|n| n.as_str())
                .map(String::from),
            _ => None,
        });

        job
    }

    /// `needs:` entries are either plain job names or `{ job: name }` mappings.
    fn parse_needs(needs: &Value) -> Vec<String> {
        match needs {
            Value::Sequence(seq) => seq
                .iter()
                .filter_map(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Mapping(m) => m
                        .get(Value::String("job".to_string()))
                        .and_then(|v| v.as_str())
                        .map(String::from),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// `only:`/`except:` are either a branch list or `{ branches: [...] }`.
    fn parse_branches(value: Option<&Value>) -> Vec<String> {
        match value {
            Some(Value::Sequence(seq)) => seq
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            Some(Value::Mapping(m)) => m
                .get(Value::String("branches".to_string()))
                .and_then(|v| v.as_sequence())
                .map(|seq| {
                    seq.iter()
                        .filter_map(|v| v.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn parse_artifacts(value: &Value) -> Option<Artifacts> {
        let paths = Self::string_list(value.get("paths"));
        if paths.is_empty() {
            return None;
        }
        Some(Artifacts {
            paths,
            expire_in: value
                .get("expire_in")
                .and_then(|v| v.as_str())
                .map(String::from),
        })
    }

    fn parse_workflow(yaml: &Value, pipeline: &mut Pipeline) {
        let Some(workflow) = yaml.get("workflow") else {
            return;
        };
        pipeline.workflow_name = workflow
            .get("name")
            .and_then(|v| v.as_str())
            .map(String::from);
        if let Some(rules) = workflow.get("rules").and_then(|v| v.as_sequence()) {
            pipeline.workflow_rules = rules
                .iter()
                .filter_map(|r| r.get("if").and_then(|v| v.as_str()).map(String::from))
                .collect();
        }
    }

    fn parse_includes(yaml: &Value, pipeline: &mut Pipeline) {
        match yaml.get("include") {
            Some(Value::String(s)) => pipeline.includes.push(s.clone()),
            Some(Value::Sequence(seq)) => {
                for inc in seq {
                    match inc {
                        Value::String(s) => pipeline.includes.push(s.clone()),
                        Value::Mapping(m) => {
                            if let Some(local) = m
                                .get(Value::String("local".to_string()))
                                .and_then(|v| v.as_str())
                            {
                                pipeline.includes.push(local.to_string());
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// `image:` is either a string or `{ name: ... }`.
    fn parse_image(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Mapping(m) => m
                .get(Value::String("name".to_string()))
                .and_then(|v| v.as_str())
                .map(String::from),
            _ => None,
        }
    }

    /// Normalize a string-or-list field to a list of strings.
    fn string_list(value: Option<&Value>) -> Vec<String> {
        match value {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Sequence(seq)) => {
                seq.iter().map(Self::scalar_to_string).collect()
            }
            _ => Vec::new(),
        }
    }

    fn scalar_to_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Mapping(m) => m
                .get(Value::String("value".to_string()))
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_pipeline() {
        let yaml = r#"
stages:
  - build
  - test
  - deploy

build:
  stage: build
  script:
    - npm ci
    - npm run build

test:
  stage: test
  script:
    - npm test

deploy:
  stage: deploy
  script:
    - ./deploy.sh
  when: manual
"#;
        let pipeline = GitLabParser::parse(yaml).unwrap();
        assert_eq!(pipeline.stages, vec!["build", "test", "deploy"]);
        assert_eq!(pipeline.jobs.len(), 3);
        assert_eq!(pipeline.job("build").unwrap().script.len(), 2);
        assert_eq!(pipeline.job("deploy").unwrap().when, "manual");
    }

    #[test]
    fn skips_reserved_keys_and_hidden_jobs() {
        let yaml = r#"
image: node:20

.template:
  before_script:
    - npm ci

workflow:
  name: Nightly

build:
  stage: build
  script:
    - npm run build
"#;
        let pipeline = GitLabParser::parse(yaml).unwrap();
        assert_eq!(pipeline.jobs.len(), 1);
        assert!(pipeline.job(".template").is_none());
        assert_eq!(pipeline.default_image.as_deref(), Some("node:20"));
        assert_eq!(pipeline.workflow_name.as_deref(), Some("Nightly"));
    }

    #[test]
    fn parses_needs_mapping_form() {
        let yaml = r#"
deploy:
  stage: deploy
  needs:
    - job: build_app
    - test_app
  script:
    - ./deploy.sh
"#;
        let pipeline = GitLabParser::parse(yaml).unwrap();
        assert_eq!(
            pipeline.job("deploy").unwrap().needs,
            vec!["build_app", "test_app"]
        );
    }

    #[test]
    fn masked_and_protected_variables_become_secrets() {
        let yaml = r#"
variables:
  CI_DEBUG: "false"
  API_TOKEN:
    value: "abc123"
    masked: true
  DEPLOY_KEY:
    value: "xyz"
    protected: true
"#;
        let pipeline = GitLabParser::parse(yaml).unwrap();
        assert_eq!(pipeline.variables.len(), 3);
        let secret_names: Vec<&str> =
            pipeline.secrets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(secret_names, vec!["API_TOKEN", "DEPLOY_KEY"]);
        assert_eq!(pipeline.secrets[0].description, "Masked variable");
    }

    #[test]
    fn stringifies_numeric_and_bool_variables() {
        let yaml = r#"
build:
  variables:
    RETRIES: 3
    VERBOSE: true
  script:
    - make
"#;
        let pipeline = GitLabParser::parse(yaml).unwrap();
        let job = pipeline.job("build").unwrap();
        assert_eq!(job.variables.get("RETRIES").map(String::as_str), Some("3"));
        assert_eq!(
            job.variables.get("VERBOSE").map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn parses_artifacts_and_branch_filters() {
        let yaml = r#"
package:
  stage: build
  script:
    - make dist
  artifacts:
    paths:
      - dist/
    expire_in: 1 week
  only:
    - main
    - release/*
"#;
        let pipeline = GitLabParser::parse(yaml).unwrap();
        let job = pipeline.job("package").unwrap();
        let artifacts = job.artifacts.as_ref().unwrap();
        assert_eq!(artifacts.paths, vec!["dist/"]);
        assert_eq!(artifacts.expire_in.as_deref(), Some("1 week"));
        assert_eq!(job.only_branches, vec!["main", "release/*"]);
    }

    #[test]
    fn empty_and_scalar_documents_yield_empty_pipeline() {
        assert!(GitLabParser::parse("").unwrap().jobs.is_empty());
        assert!(GitLabParser::parse("just a string").unwrap().jobs.is_empty());
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(GitLabParser::parse("foo: [unclosed").is_err());
    }

    #[test]
    fn collects_includes_and_workflow_rules() {
        let yaml = r#"
include:
  - local: .ci/lint.yml
  - https://example.com/remote.yml

workflow:
  rules:
    - if: '$CI_PIPELINE_SOURCE == "push"'
    - if: '$CI_PIPELINE_SOURCE == "merge_request_event"'
"#;
        let pipeline = GitLabParser::parse(yaml).unwrap();
        assert_eq!(
            pipeline.includes,
            vec![".ci/lint.yml", "https://example.com/remote.yml"]
        );
        assert_eq!(pipeline.workflow_rules.len(), 2);
    }
}
