mod display;

use anyhow::{Context, Result};
use cimorph_core::analyzer;
use cimorph_core::convert::gitlab_to_github_actions;
use cimorph_core::render;
use cimorph_core::{GitLabParser, GraphBuilder};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cimorph",
    version,
    about = "cimorph — GitLab CI analyzer & GitHub Actions converter",
    long_about = "Parse GitLab CI pipelines, inspect their job dependency graph (cycles, critical path, metrics), and convert them to GitHub Actions workflows."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a pipeline: dependency graph, cycles, critical path, metrics
    Analyze {
        /// Path to a .gitlab-ci.yml file or a directory containing pipeline files
        #[arg(default_value = ".gitlab-ci.yml")]
        path: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Convert a pipeline to a GitHub Actions workflow
    Convert {
        /// Path to the pipeline file to convert
        path: PathBuf,

        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Workflow name override
        #[arg(long)]
        name: Option<String>,
    },

    /// Render the dependency graph
    Graph {
        /// Path to the pipeline file
        path: PathBuf,

        /// Output format (mermaid, dot, ascii, json)
        #[arg(short, long, default_value = "mermaid")]
        format: String,
    },

    /// Check that a pipeline file is well-formed YAML
    Validate {
        /// Path to the pipeline file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { path, format } => cmd_analyze(&path, &format),
        Commands::Convert { path, output, name } => {
            cmd_convert(&path, output.as_deref(), name.as_deref())
        }
        Commands::Graph { path, format } => cmd_graph(&path, &format),
        Commands::Validate { path } => cmd_validate(&path),
    }
}

fn discover_pipeline_files(path: &PathBuf) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.clone()]);
    }

    if path.is_dir() {
        let mut files: Vec<PathBuf> = glob::glob(&format!("{}/**/*.yml", path.display()))
            .context("Failed to read glob pattern")?
            .chain(
                glob::glob(&format!("{}/**/*.yaml", path.display()))
                    .context("Failed to read glob pattern")?,
            )
            .filter_map(|r| r.ok())
            .collect();
        files.sort();
        return Ok(files);
    }

    anyhow::bail!("Path '{}' does not exist", path.display());
}

fn cmd_analyze(path: &PathBuf, format: &str) -> Result<()> {
    let files = discover_pipeline_files(path)?;

    if files.is_empty() {
        anyhow::bail!(
            "No pipeline files found at '{}'. \
            Make sure the path points to a YAML pipeline file or directory.",
            path.display()
        );
    }

    for file in &files {
        let pipeline = GitLabParser::parse_file(file)
            .with_context(|| format!("Failed to parse {}", file.display()))?;
        let graph = GraphBuilder::build(&pipeline);
        let analysis = analyzer::analyze(&graph);

        match format {
            "json" => {
                let job_dependencies: std::collections::BTreeMap<&str, _> = graph
                    .nodes
                    .iter()
                    .map(|n| (n.id.as_str(), analyzer::job_dependencies(&graph, &n.id)))
                    .collect();
                let report = serde_json::json!({
                    "graph": graph,
                    "metrics": analysis.metrics,
                    "cycles": analysis.cycles,
                    "critical_path": analysis.critical_path,
                    "job_dependencies": job_dependencies,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            _ => {
                display::print_analysis(&file.to_string_lossy(), &graph, &analysis);
            }
        }
    }

    Ok(())
}

fn cmd_convert(path: &PathBuf, output: Option<&std::path::Path>, name: Option<&str>) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!(
            "'{}' is not a file. Convert requires a single pipeline file.",
            path.display()
        );
    }

    let pipeline = GitLabParser::parse_file(path)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let result = gitlab_to_github_actions(&pipeline, name)?;

    for warning in &result.warnings {
        eprintln!("warning: {}", warning);
    }

    match output {
        Some(out_path) => {
            std::fs::write(out_path, &result.yaml)
                .with_context(|| format!("Failed to write {}", out_path.display()))?;
            println!(
                "Converted {} jobs to {}",
                result.converted_jobs,
                out_path.display()
            );
        }
        None => {
            print!("{}", result.yaml);
        }
    }

    Ok(())
}

fn cmd_graph(path: &PathBuf, format: &str) -> Result<()> {
    let pipeline = GitLabParser::parse_file(path)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let graph = GraphBuilder::build(&pipeline);

    match format {
        "dot" => println!("{}", render::to_dot(&graph)),
        "ascii" => println!("{}", render::to_ascii(&graph)),
        "json" => println!("{}", serde_json::to_string_pretty(&graph)?),
        _ => println!("{}", render::to_mermaid(&graph)),
    }

    Ok(())
}

fn cmd_validate(path: &PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    match serde_yaml::from_str::<serde_yaml::Value>(&content) {
        Ok(_) => {
            display::print_valid(&path.to_string_lossy());
            Ok(())
        }
        Err(err) => {
            anyhow::bail!("{} is not valid YAML: {}", path.display(), err)
        }
    }
}
