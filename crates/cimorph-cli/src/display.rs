use cimorph_core::analyzer::Analysis;
use cimorph_core::Graph;
use colored::*;

/// Print a full analysis report to the terminal.
pub fn print_analysis(source: &str, graph: &Graph, analysis: &Analysis) {
    println!();
    println!(
        "{}",
        format!(" cimorph v{} — Analyzing {}", env!("CARGO_PKG_VERSION"), source).bold()
    );
    println!();

    println!(" {}", "Pipeline Structure".bold().underline());
    println!(
        " {} {} jobs, {} dependency edges",
        "|-".dimmed(),
        analysis.metrics.total_nodes,
        analysis.metrics.total_edges
    );
    println!(
        " {} Stages: {}",
        "|-".dimmed(),
        if graph.stages.is_empty() {
            "(none declared)".to_string()
        } else {
            graph.stages.join(" -> ")
        }
    );
    println!(
        " {} Variables: {}, secrets: {}",
        "|-".dimmed(),
        analysis.metrics.total_variables,
        analysis.metrics.total_secrets
    );
    println!(
        " {} Avg. direct dependencies per job: {:.2}",
        "|-".dimmed(),
        analysis.metrics.avg_job_dependencies
    );
    println!();

    println!(" {}", "=".repeat(60).dimmed());
    println!();

    if analysis.cycles.is_empty() {
        println!(" {} No circular dependencies detected.", "OK".green().bold());
    } else {
        println!(
            " {} {} circular {} detected:",
            "FAIL".red().bold(),
            analysis.cycles.len(),
            if analysis.cycles.len() == 1 {
                "dependency"
            } else {
                "dependencies"
            }
        );
        for cycle in &analysis.cycles {
            println!("   {} {}", "|-".dimmed(), cycle.join(" -> ").red());
        }
    }
    println!();

    if analysis.critical_path.is_empty() {
        println!(
            " {} No critical path (no job is free of incoming dependencies).",
            "--".dimmed()
        );
    } else {
        println!(
            " {} Critical path ({} jobs): {}",
            "|-".dimmed(),
            analysis.metrics.critical_path_length,
            analysis.critical_path.join(" -> ").cyan()
        );
    }
    println!();
}

/// Confirm a file passed YAML validation.
pub fn print_valid(source: &str) {
    println!(" {} {} is valid YAML", "OK".green().bold(), source);
}
