use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};
use std::time::Instant;

use asset_stamp::config::Config;
use asset_stamp::FingerprintReport;

use super::project;
use crate::cli::{BuildOptions, ResolveOptions};

pub fn run(input: Option<PathBuf>, options: BuildOptions) -> Result<()> {
    let config = project::resolve_config(&options.resolve)?;
    let input = project::input_dir(input, &config)?;

    // Determine output directory
    let output_dir = options
        .output
        .clone()
        .unwrap_or_else(|| config.project.output.clone());

    println!(
        "{} Fingerprinting assets from: {}",
        style("→").blue().bold(),
        input.display()
    );
    println!("  Output directory: {}", style(output_dir.display()).cyan());
    println!("  Algorithm: {}", style(config.fingerprint.algorithm).cyan());

    if options.dry_run {
        println!("  {}", style("(Dry run - no files will be written)").yellow());
    }

    println!();

    let outcome = execute(&input, &output_dir, &config, &options.resolve, options.dry_run, true)?;

    let Some(outcome) = outcome else {
        println!("{} No files found", style("!").yellow().bold());
        return Ok(());
    };

    if options.dry_run {
        print_plan(&outcome.report);
        return Ok(());
    }

    println!();
    println!("{} Build complete!", style("✓").green().bold());
    println!("  Files hashed: {}", style(outcome.report.hashes.len()).green());
    println!(
        "  Files renamed: {}",
        style(outcome.report.renamed.len() + outcome.report.external.len()).green()
    );
    if !outcome.report.cycles.is_empty() {
        println!("  Reference cycles: {}", style(outcome.report.cycles.len()).dim());
    }
    println!("  Files written: {}", style(outcome.written).green());
    println!(
        "  Time: {}",
        style(format!("{:.0}ms", outcome.elapsed_ms)).dim()
    );
    println!("  Output: {}", style(output_dir.display()).cyan());

    Ok(())
}

/// Result of one build
pub struct BuildOutcome {
    pub report: FingerprintReport,
    pub written: usize,
    pub elapsed_ms: f64,
}

/// Load, fingerprint and (unless `dry_run`) write one snapshot of `input`.
///
/// Returns `None` when the input directory holds no files.
pub fn execute(
    input: &Path,
    output_dir: &Path,
    config: &Config,
    resolve: &ResolveOptions,
    dry_run: bool,
    show_progress: bool,
) -> Result<Option<BuildOutcome>> {
    let start = Instant::now();

    let loaded = project::load(input, config, resolve.jobs, Some(output_dir), show_progress)?;
    if loaded.files.is_empty() && loaded.passthrough.is_empty() {
        return Ok(None);
    }

    tracing::debug!(
        "Loaded {} text files, {} binary files",
        loaded.files.len(),
        loaded.passthrough.len()
    );

    let fingerprinter = project::fingerprinter(config, input)?;
    let mut files = loaded.files;
    let report = fingerprinter
        .run(&mut files)
        .with_context(|| format!("Failed to fingerprint {}", input.display()))?;

    let written = if dry_run {
        0
    } else {
        project::write_output(input, output_dir, config, &files, &loaded.passthrough, &report)?
    };

    Ok(Some(BuildOutcome {
        report,
        written,
        elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
    }))
}

fn print_plan(report: &FingerprintReport) {
    if report.renamed.is_empty() && report.external.is_empty() {
        println!("  {}", style("Nothing would be renamed").dim());
        return;
    }

    for (from, to) in report.renamed.iter().chain(report.external.iter()) {
        println!(
            "  {} → {}",
            style(from.display()).dim(),
            style(to.display()).green()
        );
    }
}
