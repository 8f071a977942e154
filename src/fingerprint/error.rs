use std::path::PathBuf;
use thiserror::Error;

/// Fatal conditions that abort a fingerprinting run
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// Missing or invalid option
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A marker points at an asset that is not on any search root
    #[error("Asset \"{reference}\" referenced by {} not found in any of: {}", .file.display(), format_roots(.roots))]
    Resolution {
        reference: String,
        file: PathBuf,
        roots: Vec<PathBuf>,
    },

    /// A dependency edge never received a final hash
    #[error("Error while adding hashes to {}: dependency {} was never resolved", .file.display(), .dependency.display())]
    Convergence { file: PathBuf, dependency: PathBuf },

    /// The per-entry fixed-point loop hit its pass limit
    #[error("Dependencies of entry {} did not converge after {passes} passes", .entry.display())]
    NotConverged { entry: PathBuf, passes: usize },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Content of {} cannot be represented as {encoding}", .path.display())]
    Encoding { path: PathBuf, encoding: String },
}

fn format_roots(roots: &[PathBuf]) -> String {
    roots
        .iter()
        .map(|r| r.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
