use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A pipeline-level CI/CD variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub protected: bool,
    pub masked: bool,
}

/// A sensitive variable surfaced separately from plain variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    pub kind: String,
    pub description: String,
}

/// Artifact configuration attached to a job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Artifacts {
    pub paths: Vec<String>,
    pub expire_in: Option<String>,
}

/// A single job in a GitLab CI pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub stage: String,
    pub image: Option<String>,
    pub script: Vec<String>,
    pub before_script: Vec<String>,
    pub after_script: Vec<String>,
    /// Jobs that must complete before this one starts.
    pub needs: Vec<String>,
    /// Jobs whose artifacts this one consumes.
    pub dependencies: Vec<String>,
    pub variables: BTreeMap<String, String>,
    pub artifacts: Option<Artifacts>,
    pub tags: Vec<String>,
    pub timeout: Option<String>,
    pub when: String,
    pub allow_failure: bool,
    /// Raw `if:` expressions collected from `rules:`.
    pub rules: Vec<String>,
    pub only_branches: Vec<String>,
    pub except_branches: Vec<String>,
    pub environment: Option<String>,
}

impl Job {
    pub fn new(name: String, stage: String) -> Self {
        Self {
            name,
            stage,
            image: None,
            script: Vec::new(),
            before_script: Vec::new(),
            after_script: Vec::new(),
            needs: Vec::new(),
            dependencies: Vec::new(),
            variables: BTreeMap::new(),
            artifacts: None,
            tags: Vec::new(),
            timeout: None,
            when: "on_success".to_string(),
            allow_failure: false,
            rules: Vec::new(),
            only_branches: Vec::new(),
            except_branches: Vec::new(),
            environment: None,
        }
    }
}

/// A parsed GitLab CI pipeline definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pipeline {
    /// Stage names in execution order.
    pub stages: Vec<String>,
    pub jobs: Vec<Job>,
    pub variables: Vec<Variable>,
    pub secrets: Vec<Secret>,
    pub default_image: Option<String>,
    pub workflow_name: Option<String>,
    /// Raw `if:` expressions from `workflow: rules:`.
    pub workflow_rules: Vec<String>,
    pub includes: Vec<String>,
}

impl Pipeline {
    /// Look up a job by name.
    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }

    /// All jobs assigned to the given stage, in definition order.
    pub fn jobs_in_stage(&self, stage: &str) -> Vec<&Job> {
        self.jobs.iter().filter(|j| j.stage == stage).collect()
    }
}
