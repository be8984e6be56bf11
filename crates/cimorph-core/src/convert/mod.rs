use crate::parser::pipeline::{Job, Pipeline};
use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Output of a pipeline conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub workflow_name: String,
    pub converted_jobs: usize,
    pub warnings: Vec<String>,
    pub yaml: String,
}

/// GitLab runner tags mapped to hosted GitHub runners.
const RUNNER_MAPPING: &[(&str, &str)] = &[
    ("linux", "ubuntu-latest"),
    ("linux-docker", "ubuntu-latest"),
    ("docker", "ubuntu-latest"),
    ("windows", "windows-latest"),
    ("macos", "macos-latest"),
];

/// Container image families mapped to setup actions and their version input.
const SETUP_ACTIONS: &[(&str, &str, &str, &str)] = &[
    ("python", "actions/setup-python@v4", "python-version", "3.11"),
    ("node", "actions/setup-node@v4", "node-version", "18"),
    ("ruby", "actions/setup-ruby@v4", "ruby-version", "3.2"),
    ("go", "actions/setup-go@v4", "go-version", "1.21"),
    ("java", "actions/setup-java@v4", "java-version", "17"),
];

/// GitLab CI condition variables rewritten to GitHub Actions contexts.
const CONDITION_REWRITES: &[(&str, &str)] = &[
    ("$CI_COMMIT_BRANCH", "github.ref_name"),
    ("$CI_COMMIT_REF_NAME", "github.ref_name"),
    ("$CI_PIPELINE_SOURCE", "github.event_name"),
    ("$CI_MERGE_REQUEST_IID", "github.event.number"),
    ("merge_request_event", "pull_request"),
];

/// Convert a parsed GitLab CI pipeline into a GitHub Actions workflow.
///
/// Constructs the workflow as a `serde_yaml` tree and serializes it.
/// Jobs the converter cannot express fully degrade to warnings, never to
/// errors.
pub fn gitlab_to_github_actions(
    pipeline: &Pipeline,
    name_override: Option<&str>,
) -> Result<ConversionResult> {
    let workflow_name = name_override
        .map(str::to_string)
        .or_else(|| pipeline.workflow_name.clone())
        .unwrap_or_else(|| "CI/CD Pipeline".to_string());

    let mut warnings = Vec::new();

    let mut root = Mapping::new();
    root.insert(
        Value::String("name".to_string()),
        Value::String(workflow_name.clone()),
    );
    root.insert(
        Value::String("on".to_string()),
        convert_triggers(&pipeline.workflow_rules),
    );

    let env = global_env(pipeline);
    if !env.is_empty() {
        root.insert(Value::String("env".to_string()), Value::Mapping(env));
    }

    let mut jobs = Mapping::new();
    for job in &pipeline.jobs {
        let job_id = sanitize_job_id(&job.name);
        jobs.insert(
            Value::String(job_id),
            Value::Mapping(convert_job(pipeline, job, &mut warnings)),
        );
    }
    let converted_jobs = jobs.len();
    root.insert(Value::String("jobs".to_string()), Value::Mapping(jobs));

    let yaml = serde_yaml::to_string(&root)?;

    Ok(ConversionResult {
        workflow_name,
        converted_jobs,
        warnings,
        yaml,
    })
}

fn convert_triggers(rules: &[String]) -> Value {
    let mut on = Mapping::new();

    for rule in rules {
        if rule.contains("\"push\"") {
            on.insert(
                Value::String("push".to_string()),
                branches_value(&["main", "**"]),
            );
        } else if rule.contains("merge_request") {
            on.insert(
                Value::String("pull_request".to_string()),
                branches_value(&["main"]),
            );
        } else if rule.contains("\"schedule\"") {
            let mut cron = Mapping::new();
            cron.insert(
                Value::String("cron".to_string()),
                Value::String("0 0 * * *".to_string()),
            );
            on.insert(
                Value::String("schedule".to_string()),
                Value::Sequence(vec![Value::Mapping(cron)]),
            );
        }
    }

    if on.is_empty() {
        on.insert(
            Value::String("push".to_string()),
            branches_value(&["main", "develop", "**"]),
        );
        on.insert(
            Value::String("pull_request".to_string()),
            branches_value(&["main", "develop"]),
        );
    }

    Value::Mapping(on)
}

fn branches_value(branches: &[&str]) -> Value {
    let mut map = Mapping::new();
    map.insert(
        Value::String("branches".to_string()),
        Value::Sequence(
            branches
                .iter()
                .map(|b| Value::String((*b).to_string()))
                .collect(),
        ),
    );
    Value::Mapping(map)
}

/// Masked and protected variables stay out of the workflow file.
fn global_env(pipeline: &Pipeline) -> Mapping {
    let mut env = Mapping::new();
    for var in &pipeline.variables {
        if !var.masked && !var.protected {
            env.insert(
                Value::String(var.name.clone()),
                Value::String(var.value.clone()),
            );
        }
    }
    env
}

fn convert_job(pipeline: &Pipeline, job: &Job, warnings: &mut Vec<String>) -> Mapping {
    let mut map = Mapping::new();
    map.insert(
        Value::String("name".to_string()),
        Value::String(job.name.clone()),
    );
    map.insert(
        Value::String("runs-on".to_string()),
        Value::String(runner_for(job).to_string()),
    );

    let needs = if job.needs.is_empty() {
        &job.dependencies
    } else {
        &job.needs
    };
    if !needs.is_empty() {
        for dep in needs {
            if pipeline.job(dep).is_none() {
                warnings.push(format!(
                    "Job '{}' needs '{}', which is not defined in the pipeline",
                    job.name, dep
                ));
            }
        }
        map.insert(
            Value::String("needs".to_string()),
            Value::Sequence(
                needs
                    .iter()
                    .map(|dep| Value::String(sanitize_job_id(dep)))
                    .collect(),
            ),
        );
    }

    if !job.variables.is_empty() {
        let mut env = Mapping::new();
        for (name, value) in &job.variables {
            env.insert(Value::String(name.clone()), Value::String(value.clone()));
        }
        map.insert(Value::String("env".to_string()), Value::Mapping(env));
    }

    if let Some(timeout) = &job.timeout {
        map.insert(
            Value::String("timeout-minutes".to_string()),
            Value::Number(parse_timeout_minutes(timeout).into()),
        );
    }

    if let Some(condition) = job_condition(job, warnings) {
        map.insert(Value::String("if".to_string()), Value::String(condition));
    }

    if let Some(image) = effective_image(pipeline, job) {
        map.insert(
            Value::String("container".to_string()),
            Value::String(image.to_string()),
        );
    }

    map.insert(
        Value::String("steps".to_string()),
        Value::Sequence(convert_steps(pipeline, job, warnings)),
    );

    map
}

fn effective_image<'a>(pipeline: &'a Pipeline, job: &'a Job) -> Option<&'a str> {
    job.image
        .as_deref()
        .or(pipeline.default_image.as_deref())
}

fn runner_for(job: &Job) -> &'static str {
    for tag in &job.tags {
        let tag = tag.to_lowercase();
        if let Some((_, runner)) = RUNNER_MAPPING.iter().find(|(key, _)| *key == tag) {
            return runner;
        }
    }

    if let Some(image) = &job.image {
        let image = image.to_lowercase();
        if let Some((_, runner)) = RUNNER_MAPPING.iter().find(|(key, _)| image.contains(key)) {
            return runner;
        }
    }

    "ubuntu-latest"
}

fn convert_steps(pipeline: &Pipeline, job: &Job, warnings: &mut Vec<String>) -> Vec<Value> {
    let mut steps = Vec::new();

    steps.push(uses_step("Checkout repository", "actions/checkout@v4", None));

    if let Some(image) = effective_image(pipeline, job) {
        if let Some(step) = setup_step(image) {
            steps.push(step);
        }
    }

    if !job.before_script.is_empty() {
        steps.push(run_step(
            "Run before_script",
            &job.before_script.join("\n"),
            false,
        ));
    }

    if job.script.is_empty() {
        warnings.push(format!("Job '{}' has no script", job.name));
    } else {
        steps.push(run_step(
            &format!("Run {}", job.name),
            &job.script.join("\n"),
            job.allow_failure,
        ));
    }

    if !job.after_script.is_empty() {
        steps.push(run_step(
            "Run after_script",
            &job.after_script.join("\n"),
            true,
        ));
    }

    if let Some(artifacts) = &job.artifacts {
        let mut with = Mapping::new();
        with.insert(
            Value::String("name".to_string()),
            Value::String(format!("{}-artifacts", sanitize_job_id(&job.name))),
        );
        with.insert(
            Value::String("path".to_string()),
            Value::String(artifacts.paths.join("\n")),
        );
        if let Some(expire_in) = &artifacts.expire_in {
            warnings.push(format!(
                "Job '{}': artifact expiry '{}' maps to retention-days and may need review",
                job.name, expire_in
            ));
        }
        steps.push(uses_step(
            "Upload artifacts",
            "actions/upload-artifact@v4",
            Some(with),
        ));
    }

    steps
}

fn uses_step(name: &str, uses: &str, with: Option<Mapping>) -> Value {
    let mut step = Mapping::new();
    step.insert(
        Value::String("name".to_string()),
        Value::String(name.to_string()),
    );
    step.insert(
        Value::String("uses".to_string()),
        Value::String(uses.to_string()),
    );
    if let Some(with) = with {
        step.insert(Value::String("with".to_string()), Value::Mapping(with));
    }
    Value::Mapping(step)
}

fn run_step(name: &str, run: &str, continue_on_error: bool) -> Value {
    let mut step = Mapping::new();
    step.insert(
        Value::String("name".to_string()),
        Value::String(name.to_string()),
    );
    step.insert(
        Value::String("run".to_string()),
        Value::String(run.to_string()),
    );
    if continue_on_error {
        step.insert(Value::String("continue-on-error".to_string()), Value::Bool(true));
    }
    Value::Mapping(step)
}

/// Map a container image to the matching setup action, carrying over any
/// version embedded in the image tag.
fn setup_step(image: &str) -> Option<Value> {
    let image_lower = image.to_lowercase();
    let (family, action, version_key, default_version) = SETUP_ACTIONS
        .iter()
        .find(|(family, _, _, _)| image_lower.contains(family))?;

    let version = version_from_image(image).unwrap_or_else(|| (*default_version).to_string());
    let mut with = Mapping::new();
    with.insert(
        Value::String((*version_key).to_string()),
        Value::String(version),
    );

    let mut name = String::from("Setup ");
    name.push_str(family);
    Some(uses_step(&name, action, Some(with)))
}

/// Image tags put the runtime version first, so the first dotted version
/// number wins (`node:18.19-alpine3.19` picks `18.19`).
fn version_from_image(image: &str) -> Option<String> {
    let re = Regex::new(r"\d+\.\d+(?:\.\d+)?").ok()?;
    re.find(image).map(|m| m.as_str().to_string())
}

fn job_condition(job: &Job, warnings: &mut Vec<String>) -> Option<String> {
    if let Some(rule) = job.rules.first() {
        if job.rules.len() > 1 {
            warnings.push(format!(
                "Job '{}' has {} rules; only the first was converted",
                job.name,
                job.rules.len()
            ));
        }
        return Some(rewrite_condition(rule));
    }

    if !job.only_branches.is_empty() {
        return Some(branch_condition(&job.only_branches, true));
    }
    if !job.except_branches.is_empty() {
        return Some(branch_condition(&job.except_branches, false));
    }

    if job.when == "manual" {
        warnings.push(format!(
            "Job '{}' is manual; GitHub Actions has no per-job manual gate, so it is disabled",
            job.name
        ));
        return Some("false".to_string());
    }

    None
}

fn rewrite_condition(condition: &str) -> String {
    let mut result = condition.to_string();
    for (gitlab, github) in CONDITION_REWRITES {
        result = result.replace(gitlab, github);
    }
    result
}

fn branch_condition(branches: &[String], include: bool) -> String {
    let clauses: Vec<String> = branches
        .iter()
        .map(|b| format!("github.ref_name == '{}'", b))
        .collect();
    let joined = clauses.join(" || ");
    if include {
        joined
    } else {
        format!("!({})", joined)
    }
}

/// GitHub job ids allow alphanumerics, `-` and `_` only.
fn sanitize_job_id(name: &str) -> String {
    let mut id: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    id.truncate(250);
    id
}

/// Parse GitLab timeout strings (`1h`, `30m`, `3600s`, bare minutes) into
/// minutes, falling back to the GitLab default of 6 hours.
fn parse_timeout_minutes(timeout: &str) -> u64 {
    let t = timeout.trim().to_lowercase();
    if let Some(hours) = t.strip_suffix('h') {
        hours.trim().parse::<u64>().map(|v| v * 60).unwrap_or(360)
    } else if let Some(minutes) = t.strip_suffix('m') {
        minutes.trim().parse::<u64>().unwrap_or(360)
    } else if let Some(seconds) = t.strip_suffix('s') {
        seconds.trim().parse::<u64>().map(|v| v / 60).unwrap_or(360)
    } else {
        t.parse::<u64>().unwrap_or(360)
    }
}
