use anyhow::Result;
use console::style;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use path_clean::PathClean;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};

use super::{build, project};
use crate::cli::WatchOptions;

/// Watch statistics
struct WatchStats {
    builds: u64,
    errors: u64,
    skipped: u64,
    start_time: Instant,
}

impl WatchStats {
    fn new() -> Self {
        Self {
            builds: 0,
            errors: 0,
            skipped: 0,
            start_time: Instant::now(),
        }
    }

    fn print_summary(&self) {
        let elapsed = self.start_time.elapsed();
        println!();
        println!("{} Watch session summary:", style("📊").blue().bold());
        println!("  Duration: {:.1}s", elapsed.as_secs_f64());
        println!("  Builds: {}", style(self.builds).green());
        if self.errors > 0 {
            println!("  Errors: {}", style(self.errors).red());
        }
        if self.skipped > 0 {
            println!("  Skipped events: {}", style(self.skipped).dim());
        }
    }
}

/// Collapses bursts of events into one rebuild
struct Debouncer {
    last_build: Option<Instant>,
    debounce_duration: Duration,
}

impl Debouncer {
    fn new(debounce_ms: u64) -> Self {
        Self {
            last_build: None,
            debounce_duration: Duration::from_millis(debounce_ms),
        }
    }

    fn should_build(&mut self) -> bool {
        let now = Instant::now();

        if let Some(last) = self.last_build {
            if now.duration_since(last) < self.debounce_duration {
                return false;
            }
        }

        self.last_build = Some(now);
        true
    }
}

pub fn run(input: Option<PathBuf>, options: WatchOptions) -> Result<()> {
    let config = project::resolve_config(&options.resolve)?;
    let input = project::input_dir(input, &config)?;

    // Determine output directory
    let output_dir = options
        .output
        .clone()
        .unwrap_or_else(|| config.project.output.clone());

    println!("{} Watch mode started", style("👁").blue().bold());
    println!("  Watching: {}", style(input.display()).cyan());
    println!("  Output: {}", style(output_dir.display()).cyan());
    println!("  Debounce: {}ms", options.debounce);
    println!();
    println!("  Press {} to stop", style("Ctrl+C").yellow());
    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!();

    let mut stats = WatchStats::new();
    rebuild(&input, &output_dir, &config, &options, &mut stats);

    // Create a channel to receive the events
    let (tx, rx) = channel();

    let watcher_config = Config::default().with_poll_interval(Duration::from_millis(100));
    let mut watcher = RecommendedWatcher::new(tx, watcher_config)?;
    watcher.watch(&input, RecursiveMode::Recursive)?;

    let mut debouncer = Debouncer::new(options.debounce);
    let mut dirty = false;

    // Set up Ctrl+C handler
    let running = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, std::sync::atomic::Ordering::SeqCst);
    })
    .ok(); // Ignore if already set

    while running.load(std::sync::atomic::Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(Ok(event)) => {
                if is_relevant(&event, &output_dir) {
                    dirty = true;
                } else {
                    stats.skipped += 1;
                }
            }
            Ok(Err(e)) => {
                eprintln!("{} Watch error: {}", style("⚠").yellow(), e);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                eprintln!("{} Watcher disconnected", style("✗").red());
                break;
            }
        }

        // Each rebuild fingerprints the whole snapshot again
        if dirty && debouncer.should_build() {
            dirty = false;
            rebuild(&input, &output_dir, &config, &options, &mut stats);
        }
    }

    stats.print_summary();

    Ok(())
}

fn is_relevant(event: &Event, output_dir: &Path) -> bool {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
        _ => return false,
    }

    // Events carry absolute paths, the output directory may be relative
    let output_dir = output_dir.clean();
    let absolute_output =
        std::fs::canonicalize(&output_dir).unwrap_or_else(|_| output_dir.clone());

    event
        .paths
        .iter()
        .any(|path| !path.starts_with(&absolute_output) && !path.clean().starts_with(&output_dir))
}

fn rebuild(
    input: &Path,
    output_dir: &Path,
    config: &asset_stamp::config::Config,
    options: &WatchOptions,
    stats: &mut WatchStats,
) {
    println!("{} Rebuilding {}", style("→").blue(), input.display());

    match build::execute(input, output_dir, config, &options.resolve, false, false) {
        Ok(Some(outcome)) => {
            stats.builds += 1;
            println!(
                "  {} {} files hashed, {} renamed ({:.0}ms)",
                style("✓").green(),
                outcome.report.hashes.len(),
                outcome.report.renamed.len() + outcome.report.external.len(),
                outcome.elapsed_ms
            );
        }
        Ok(None) => {
            println!("  {} No files found", style("!").yellow());
        }
        Err(e) => {
            stats.errors += 1;
            eprintln!("  {} Error: {:#}", style("✗").red(), e);
        }
    }
}
