use path_clean::PathClean;
use std::path::{Path, PathBuf};

use super::{FileSet, FingerprintError};

/// Maps a raw marker reference to a canonical file identity.
pub trait AssetLocator: Send + Sync {
    /// Resolve `reference` found in `file` against the search `roots`.
    ///
    /// `known` is the FileSet being processed; identities present there take
    /// precedence over files on disk.
    fn locate(
        &self,
        reference: &str,
        file: &Path,
        roots: &[PathBuf],
        known: &FileSet,
    ) -> Result<PathBuf, FingerprintError>;
}

/// Looks for `root/reference` under each root in turn.
///
/// Identities are lexically cleaned paths relative to `base_dir`; a candidate
/// matches when it is a FileSet key or a file on disk at `base_dir/candidate`.
#[derive(Debug, Clone, Default)]
pub struct SearchPathLocator {
    base_dir: PathBuf,
}

impl SearchPathLocator {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl AssetLocator for SearchPathLocator {
    fn locate(
        &self,
        reference: &str,
        file: &Path,
        roots: &[PathBuf],
        known: &FileSet,
    ) -> Result<PathBuf, FingerprintError> {
        let relative = reference.trim_start_matches('/');

        for root in roots {
            let candidate = root.join(relative).clean();

            if known.contains_key(&candidate) || self.base_dir.join(&candidate).is_file() {
                return Ok(candidate);
            }
        }

        Err(FingerprintError::Resolution {
            reference: reference.to_string(),
            file: file.to_path_buf(),
            roots: roots.to_vec(),
        })
    }
}
