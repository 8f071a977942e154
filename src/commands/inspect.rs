use anyhow::{Context, Result};
use console::style;
use std::path::PathBuf;

use asset_stamp::FingerprintReport;

use super::project;
use crate::cli::ResolveOptions;

pub fn run(input: Option<PathBuf>, options: ResolveOptions, json: bool) -> Result<()> {
    let config = project::resolve_config(&options)?;
    let input = project::input_dir(input, &config)?;
    let loaded = project::load(&input, &config, options.jobs, None, false)?;

    let fingerprinter = project::fingerprinter(&config, &input)?;
    let mut files = loaded.files;
    let report = fingerprinter
        .run(&mut files)
        .with_context(|| format!("Failed to fingerprint {}", input.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &FingerprintReport) {
    println!("{} Dependency graph", style("📋").blue().bold());
    for (file, deps) in &report.dependencies {
        println!("  {}", style(file.display()).cyan());
        for dep in deps {
            println!("    {} {}", style("→").dim(), dep.display());
        }
    }
    println!();

    println!("{}", style("Hashes:").bold());
    for (file, hash) in &report.hashes {
        let entry = if report.entries.contains(file) {
            style(" (entry)").yellow().to_string()
        } else {
            String::new()
        };
        println!("  {}  {}{}", style(hash).dim(), file.display(), entry);
    }
    println!();

    if !report.cycles.is_empty() {
        println!("{}", style("Reference cycles:").bold());
        for cycle in &report.cycles {
            let members: Vec<String> = cycle.iter().map(|p| p.display().to_string()).collect();
            println!("  {}", members.join(" ↔ "));
        }
        println!();
    }

    println!("{}", style("Renames:").bold());
    if report.renamed.is_empty() && report.external.is_empty() {
        println!("  {}", style("none").dim());
    }
    for (from, to) in report.renamed.iter().chain(report.external.iter()) {
        println!("  {} → {}", from.display(), style(to.display()).green());
    }

    println!();
    println!("  Passes: {}", report.passes);
}
