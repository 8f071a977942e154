//! Dependency-aware content fingerprinting.
//!
//! A run goes through four stages:
//!
//! 1. build the [`DependencyGraph`] from the markers in every file,
//! 2. resolve hashes from each entry point ([`resolver`]),
//! 3. check that every edge received a final hash,
//! 4. rewrite markers and rename referenced files ([`rewrite`]).

mod content;
mod cycles;
mod error;
pub mod graph;
mod locator;
mod markers;
pub mod names;
mod options;
pub mod resolver;
mod rewrite;

pub use content::ContentSource;
pub use cycles::CycleMerger;
pub use error::FingerprintError;
pub use graph::{DependencyGraph, EdgeState, SELF_SENTINEL};
pub use locator::{AssetLocator, SearchPathLocator};
pub use markers::{MarkerSyntax, TagMarkers, DEFAULT_CLOSE, DEFAULT_OPEN, DEFAULT_TAG};
pub use options::{EntryPoints, FingerprintOptions, DEFAULT_MAX_PASSES};

use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;

use resolver::HashResolver;

/// Files being processed: identity to text content
pub type FileSet = IndexMap<PathBuf, String>;

/// Summary of a successful run
#[derive(Debug, Clone, Default, Serialize)]
pub struct FingerprintReport {
    /// Every hash computed, in the order it was computed
    pub hashes: IndexMap<PathBuf, String>,
    /// FileSet entries moved to their hash-qualified name
    pub renamed: IndexMap<PathBuf, PathBuf>,
    /// Referenced files outside the FileSet and their hash-qualified name
    pub external: IndexMap<PathBuf, PathBuf>,
    /// Files that share one hash because they reference each other
    pub cycles: Vec<Vec<PathBuf>>,
    /// Dependencies of every file with markers
    pub dependencies: IndexMap<PathBuf, Vec<PathBuf>>,
    pub entries: Vec<PathBuf>,
    pub passes: usize,
}

/// Runs the fingerprinting stages over a FileSet
pub struct Fingerprinter {
    options: FingerprintOptions,
    markers: Box<dyn MarkerSyntax>,
    locator: Box<dyn AssetLocator>,
}

impl Fingerprinter {
    pub fn new(options: FingerprintOptions) -> Self {
        let locator = SearchPathLocator::new(options.base_dir.clone());
        Self {
            options,
            markers: Box::new(TagMarkers::default()),
            locator: Box::new(locator),
        }
    }

    pub fn with_markers(mut self, markers: impl MarkerSyntax + 'static) -> Self {
        self.markers = Box::new(markers);
        self
    }

    pub fn with_locator(mut self, locator: impl AssetLocator + 'static) -> Self {
        self.locator = Box::new(locator);
        self
    }

    pub fn options(&self) -> &FingerprintOptions {
        &self.options
    }

    /// Fingerprint `files` in place.
    ///
    /// On success markers are rewritten and referenced files renamed. On
    /// failure the FileSet is left as it was.
    pub fn run(&self, files: &mut FileSet) -> Result<FingerprintReport, FingerprintError> {
        self.options.validate()?;

        let (mut graph, originals) = DependencyGraph::build(
            files,
            self.markers.as_ref(),
            self.locator.as_ref(),
            &self.options.asset_roots,
        )?;

        let entries = self.options.entries.select(&graph)?;
        let dependencies: IndexMap<PathBuf, Vec<PathBuf>> = graph
            .iter()
            .map(|(file, deps)| (file.clone(), deps.keys().cloned().collect()))
            .collect();

        let resolution = {
            let content = ContentSource::new(files, &self.options.base_dir, self.options.encoding);
            HashResolver::new(
                &mut graph,
                &content,
                self.options.algorithm,
                self.options.max_passes,
            )
            .resolve_all(&entries)?
        };

        let renames = rewrite::apply(
            files,
            &graph,
            &originals,
            &resolution.registry,
            self.markers.as_ref(),
        )?;

        tracing::info!(
            "Fingerprinted {} files, renamed {} ({} passes)",
            resolution.computed.len(),
            renames.renamed.len() + renames.external.len(),
            resolution.passes
        );

        Ok(FingerprintReport {
            hashes: resolution.computed,
            renamed: renames.renamed,
            external: renames.external,
            cycles: resolution.cycles,
            dependencies,
            entries,
            passes: resolution.passes,
        })
    }
}
