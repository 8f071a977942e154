use std::fmt;
use std::path::{Path, PathBuf};

use super::graph::DependencyGraph;
use super::FingerprintError;
use crate::utils::hash::{HashAlgorithm, TextEncoding};

pub const DEFAULT_MAX_PASSES: usize = 256;

type EntryPredicate = Box<dyn Fn(&Path) -> bool + Send + Sync>;

/// Traversal roots
pub enum EntryPoints {
    /// Explicit list of files
    Files(Vec<PathBuf>),
    /// Every file with at least one marker that matches the predicate
    Matching(EntryPredicate),
}

impl EntryPoints {
    pub fn matching(predicate: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        EntryPoints::Matching(Box::new(predicate))
    }

    /// Concrete entry list for `graph`
    pub fn select(&self, graph: &DependencyGraph) -> Result<Vec<PathBuf>, FingerprintError> {
        let entries: Vec<PathBuf> = match self {
            EntryPoints::Files(files) => files.clone(),
            EntryPoints::Matching(predicate) => {
                graph.files().filter(|file| predicate(file)).cloned().collect()
            }
        };

        if entries.is_empty() {
            return Err(FingerprintError::Configuration("No entry".to_string()));
        }

        Ok(entries)
    }
}

impl Default for EntryPoints {
    fn default() -> Self {
        EntryPoints::Files(Vec::new())
    }
}

impl fmt::Debug for EntryPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPoints::Files(files) => f.debug_tuple("Files").field(files).finish(),
            EntryPoints::Matching(_) => f.write_str("Matching(<predicate>)"),
        }
    }
}

/// Options of one fingerprinting run
#[derive(Debug)]
pub struct FingerprintOptions {
    /// Directories searched for referenced assets
    pub asset_roots: Vec<PathBuf>,
    pub entries: EntryPoints,
    pub algorithm: HashAlgorithm,
    pub encoding: TextEncoding,
    /// Directory that relative identities are read from when not in the FileSet
    pub base_dir: PathBuf,
    /// Upper bound on passes per entry point
    pub max_passes: usize,
}

impl Default for FingerprintOptions {
    fn default() -> Self {
        Self {
            asset_roots: Vec::new(),
            entries: EntryPoints::default(),
            algorithm: HashAlgorithm::default(),
            encoding: TextEncoding::default(),
            base_dir: PathBuf::new(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl FingerprintOptions {
    pub fn new(asset_roots: Vec<PathBuf>, entries: EntryPoints) -> Self {
        Self {
            asset_roots,
            entries,
            ..Self::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Checks that do not need the dependency graph
    pub fn validate(&self) -> Result<(), FingerprintError> {
        if self.asset_roots.is_empty() {
            return Err(FingerprintError::Configuration(
                "List of asset directories not given".to_string(),
            ));
        }

        if let EntryPoints::Files(files) = &self.entries {
            if files.is_empty() {
                return Err(FingerprintError::Configuration("No entry".to_string()));
            }
        }

        if self.max_passes == 0 {
            return Err(FingerprintError::Configuration(
                "max_passes must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_roots_rejected() {
        let options = FingerprintOptions::new(vec![], EntryPoints::Files(vec!["index.html".into()]));
        assert!(matches!(options.validate(), Err(FingerprintError::Configuration(_))));
    }

    #[test]
    fn test_empty_entry_list_rejected() {
        let options = FingerprintOptions::new(vec![".".into()], EntryPoints::Files(vec![]));
        assert!(matches!(options.validate(), Err(FingerprintError::Configuration(_))));
    }

    #[test]
    fn test_predicate_matching_nothing_rejected() {
        let entries = EntryPoints::matching(|path| path.extension().is_some_and(|e| e == "html"));
        assert!(matches!(
            entries.select(&DependencyGraph::new()),
            Err(FingerprintError::Configuration(_))
        ));
    }
}
