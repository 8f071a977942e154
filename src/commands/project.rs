use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use path_clean::PathClean;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use asset_stamp::config::{build_globset, find_and_load_config, load_config, Config};
use asset_stamp::{FileSet, FingerprintReport, Fingerprinter};

use crate::cli::ResolveOptions;

/// Files of an input directory, split into text (FileSet) and binary
pub struct Project {
    pub files: FileSet,
    /// Files copied as-is, relative to the input directory
    pub passthrough: Vec<PathBuf>,
}

/// Load the configuration file and apply command line overrides
pub fn resolve_config(options: &ResolveOptions) -> Result<Config> {
    let mut config = if let Some(config_path) = &options.config {
        load_config(config_path)?
    } else {
        find_and_load_config()?.unwrap_or_default()
    };

    if !options.entries.is_empty() {
        config.fingerprint.entries = options.entries.clone();
        config.fingerprint.entry_patterns.clear();
    }

    if !options.assets.is_empty() {
        config.fingerprint.assets = options.assets.clone();
    }

    if let Some(algorithm) = options.algorithm {
        config.fingerprint.algorithm = algorithm;
    }

    Ok(config)
}

/// Input directory from the command line, else `project.source`
pub fn input_dir(input: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    let input = input.unwrap_or_else(|| config.project.source.clone());
    check_input_dir(&input)?;
    Ok(input)
}

pub fn check_input_dir(input: &Path) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input directory does not exist: {}", input.display());
    }

    if !input.is_dir() {
        anyhow::bail!("Input path is not a directory: {}", input.display());
    }

    Ok(())
}

/// Read every file under `input`, skipping `exclude` (usually the output
/// directory). Text files are read in parallel on a pool of `jobs` threads.
pub fn load(
    input: &Path,
    config: &Config,
    jobs: Option<usize>,
    exclude: Option<&Path>,
    show_progress: bool,
) -> Result<Project> {
    let include = build_globset(&config.project.include)?;
    let exclude = exclude.map(|p| p.clean());
    let encoding = config.fingerprint.encoding;

    let mut text = Vec::new();
    let mut passthrough = Vec::new();

    let walker = WalkDir::new(input)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| match &exclude {
            Some(excluded) => e.path().clean() != *excluded,
            None => true,
        });

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(input)
            .unwrap_or(entry.path())
            .to_path_buf();

        if include.is_match(&relative) {
            text.push(relative);
        } else {
            passthrough.push(relative);
        }
    }

    let pb = if show_progress {
        let pb = ProgressBar::new(text.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap()
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let num_jobs = jobs.unwrap_or_else(num_cpus::get);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_jobs)
        .build()?;

    let contents: Vec<(PathBuf, String)> = pool.install(|| {
        text.par_iter()
            .map(|relative| -> Result<(PathBuf, String)> {
                let path = input.join(relative);
                let bytes = std::fs::read(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let content = encoding.decode(bytes).with_context(|| {
                    format!("{} is not valid {}", path.display(), encoding)
                })?;
                pb.inc(1);
                Ok((relative.clone(), content))
            })
            .collect::<Result<Vec<_>>>()
    })?;

    pb.finish_and_clear();

    Ok(Project {
        files: contents.into_iter().collect(),
        passthrough,
    })
}

/// Build a fingerprinter for files keyed relative to `input`
pub fn fingerprinter(config: &Config, input: &Path) -> Result<Fingerprinter> {
    let options = config
        .fingerprint
        .to_options(input)
        .context("Invalid [fingerprint] configuration")?;
    let markers = config
        .markers
        .syntax()
        .context("Invalid [markers] configuration")?;

    Ok(Fingerprinter::new(options).with_markers(markers))
}

/// Write the fingerprinted FileSet and copy binary files to `output_dir`.
///
/// Binary files referenced by markers are copied under their hash-qualified
/// name. Returns the number of files written.
pub fn write_output(
    input: &Path,
    output_dir: &Path,
    config: &Config,
    files: &FileSet,
    passthrough: &[PathBuf],
    report: &FingerprintReport,
) -> Result<usize> {
    let encoding = config.fingerprint.encoding;
    let mut written = 0;

    for (relative, content) in files {
        let output_path = output_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let bytes = encoding.encode(content).with_context(|| {
            format!("{} cannot be written as {}", relative.display(), encoding)
        })?;
        std::fs::write(&output_path, bytes)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        written += 1;
    }

    for relative in passthrough {
        let target = report.external.get(relative).unwrap_or(relative);
        let output_path = output_dir.join(target);
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::copy(input.join(relative), &output_path)
            .with_context(|| format!("Failed to copy {}", relative.display()))?;
        written += 1;
    }

    for (original, renamed) in &report.external {
        if !passthrough.contains(original) {
            tracing::warn!(
                "{} is outside the input directory, not copied as {}",
                original.display(),
                renamed.display()
            );
        }
    }

    Ok(written)
}
