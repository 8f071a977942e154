//! Dependency graph with per-edge resolution state.
//!
//! Keys are files that contain at least one marker. Each file maps its
//! dependencies, in first-discovery order, to the state of that edge. The
//! inner order is also the order in which dependency hashes are combined.

use indexmap::IndexMap;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use super::locator::AssetLocator;
use super::markers::MarkerSyntax;
use super::{FileSet, FingerprintError};

/// Value contributed by a file's reference to itself
pub const SELF_SENTINEL: &str = "self";

/// Resolution state of one (file, dependency) edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeState {
    /// No hash assigned yet
    Unresolved,
    /// Blocked by a loop on the current traversal path
    PendingInCycle,
    /// The file references itself
    SelfSentinel,
    /// Final digest of the dependency
    Hash(String),
}

impl EdgeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EdgeState::SelfSentinel | EdgeState::Hash(_))
    }

    /// Value fed into a combined hash, `None` while the edge is unsettled
    pub fn terminal_value(&self) -> Option<&str> {
        match self {
            EdgeState::Hash(hash) => Some(hash),
            EdgeState::SelfSentinel => Some(SELF_SENTINEL),
            EdgeState::Unresolved | EdgeState::PendingInCycle => None,
        }
    }
}

/// First raw reference text seen for each resolved identity
pub type OriginalReferences = IndexMap<PathBuf, String>;

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: IndexMap<PathBuf, IndexMap<PathBuf, EdgeState>>,
    /// Every distinct raw reference per file and the identity it resolved to
    references: IndexMap<PathBuf, Vec<(String, PathBuf)>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for every file in `files`.
    ///
    /// Marker extraction and reference resolution run in parallel; results are
    /// merged in FileSet order so the graph does not depend on scheduling.
    pub fn build(
        files: &FileSet,
        markers: &dyn MarkerSyntax,
        locator: &dyn AssetLocator,
        roots: &[PathBuf],
    ) -> Result<(Self, OriginalReferences), FingerprintError> {
        let entries: Vec<(&PathBuf, &String)> = files.iter().collect();

        let resolved: Vec<(PathBuf, Vec<(PathBuf, String)>)> = entries
            .par_iter()
            .map(|(path, content)| -> Result<_, FingerprintError> {
                let references = markers.extract_references(content);
                let deps = references
                    .into_iter()
                    .map(|reference| {
                        locator
                            .locate(&reference, path, roots, files)
                            .map(|identity| (identity, reference))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(((*path).clone(), deps))
            })
            .collect::<Result<Vec<_>, FingerprintError>>()?;

        let mut graph = Self::new();
        let mut originals = OriginalReferences::new();

        for (file, deps) in resolved {
            if deps.is_empty() {
                continue;
            }

            let inner = graph.edges.entry(file.clone()).or_default();
            let spelled = graph.references.entry(file).or_default();
            for (identity, reference) in deps {
                originals.entry(identity.clone()).or_insert_with(|| reference.clone());
                inner.entry(identity.clone()).or_insert(EdgeState::Unresolved);
                if !spelled.iter().any(|(raw, _)| *raw == reference) {
                    spelled.push((reference, identity));
                }
            }
        }

        for (file, inner) in graph.edges.iter_mut() {
            if let Some(state) = inner.get_mut(file) {
                *state = EdgeState::SelfSentinel;
            }
        }

        tracing::debug!(
            "Dependency graph: {} files with markers, {} referenced assets",
            graph.edges.len(),
            originals.len()
        );

        Ok((graph, originals))
    }

    pub fn contains(&self, file: &Path) -> bool {
        self.edges.contains_key(file)
    }

    pub fn dependencies(&self, file: &Path) -> Option<&IndexMap<PathBuf, EdgeState>> {
        self.edges.get(file)
    }

    /// Raw references found in `file`, each with its resolved identity
    pub fn references(&self, file: &Path) -> &[(String, PathBuf)] {
        self.references.get(file).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.edges.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &IndexMap<PathBuf, EdgeState>)> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// First dependency of `file` (in insertion order) whose edge is `state`
    pub fn first_in_state(&self, file: &Path, state: &EdgeState) -> Option<PathBuf> {
        self.edges
            .get(file)?
            .iter()
            .find(|(_, s)| *s == state)
            .map(|(dep, _)| dep.clone())
    }

    /// Mark `file → dep` as blocked by a loop. Terminal edges are left alone.
    pub fn mark_pending(&mut self, file: &Path, dep: &Path) {
        if let Some(state) = self.edges.get_mut(file).and_then(|inner| inner.get_mut(dep)) {
            if !state.is_terminal() {
                *state = EdgeState::PendingInCycle;
            }
        }
    }

    /// Record `hash` on every edge pointing at `dep`.
    ///
    /// Returns whether at least one file references `dep`, self references
    /// included. Self edges keep their sentinel.
    pub fn assign_hash(&mut self, dep: &Path, hash: &str) -> bool {
        let mut referenced = false;

        for inner in self.edges.values_mut() {
            if let Some(state) = inner.get_mut(dep) {
                referenced = true;
                if *state != EdgeState::SelfSentinel {
                    *state = EdgeState::Hash(hash.to_string());
                }
            }
        }

        referenced
    }

    /// Turn every `PendingInCycle` edge back into `Unresolved`.
    ///
    /// Returns whether anything was reset.
    pub fn reset_pending(&mut self) -> bool {
        let mut changed = false;

        for inner in self.edges.values_mut() {
            for state in inner.values_mut() {
                if *state == EdgeState::PendingInCycle {
                    *state = EdgeState::Unresolved;
                    changed = true;
                }
            }
        }

        changed
    }

    /// First edge that is neither hashed nor a self reference
    pub fn first_unsettled(&self) -> Option<(&PathBuf, &PathBuf)> {
        self.edges.iter().find_map(|(file, inner)| {
            inner
                .iter()
                .find(|(_, state)| !state.is_terminal())
                .map(|(dep, _)| (file, dep))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::locator::SearchPathLocator;
    use crate::fingerprint::markers::TagMarkers;

    fn build(files: &[(&str, &str)]) -> Result<(DependencyGraph, OriginalReferences), FingerprintError> {
        let files: FileSet = files
            .iter()
            .map(|(path, content)| (PathBuf::from(path), content.to_string()))
            .collect();
        DependencyGraph::build(
            &files,
            &TagMarkers::default(),
            &SearchPathLocator::default(),
            &[PathBuf::from(".")],
        )
    }

    #[test]
    fn test_files_without_markers_are_not_keys() {
        let (graph, originals) = build(&[
            ("index.html", "{{addHash:./app.css}}"),
            ("app.css", "body {}"),
        ])
        .unwrap();

        assert_eq!(graph.len(), 1);
        assert!(graph.contains(Path::new("index.html")));
        assert!(!graph.contains(Path::new("app.css")));
        assert_eq!(originals[Path::new("app.css")], "./app.css");
    }

    #[test]
    fn test_dependency_order_is_first_discovery() {
        let (graph, _) = build(&[
            ("index.html", "{{addHash:c.js}} {{addHash:a.js}} {{addHash:c.js}} {{addHash:b.js}}"),
            ("a.js", ""),
            ("b.js", ""),
            ("c.js", ""),
        ])
        .unwrap();

        let deps: Vec<&PathBuf> = graph.dependencies(Path::new("index.html")).unwrap().keys().collect();
        assert_eq!(deps, vec![Path::new("c.js"), Path::new("a.js"), Path::new("b.js")]);
    }

    #[test]
    fn test_every_spelling_is_kept_per_file() {
        let (graph, originals) = build(&[
            ("index.html", "{{addHash:./b.css}} {{addHash:b.css}} {{addHash:./b.css}}"),
            ("about.html", "{{addHash:b.css}}"),
            ("b.css", ""),
        ])
        .unwrap();

        let references = graph.references(Path::new("index.html"));
        assert_eq!(references.len(), 2);
        assert_eq!(references[0], ("./b.css".to_string(), PathBuf::from("b.css")));
        assert_eq!(references[1], ("b.css".to_string(), PathBuf::from("b.css")));
        assert_eq!(graph.dependencies(Path::new("index.html")).unwrap().len(), 1);
        assert_eq!(
            graph.references(Path::new("about.html")),
            &[("b.css".to_string(), PathBuf::from("b.css"))]
        );
        assert!(graph.references(Path::new("b.css")).is_empty());
        assert_eq!(originals[Path::new("b.css")], "./b.css");
    }

    #[test]
    fn test_self_reference_is_sentinel() {
        let (graph, _) = build(&[("a.css", "{{addHash:a.css}} {{addHash:b.css}}"), ("b.css", "")]).unwrap();

        let deps = graph.dependencies(Path::new("a.css")).unwrap();
        assert_eq!(deps[Path::new("a.css")], EdgeState::SelfSentinel);
        assert_eq!(deps[Path::new("b.css")], EdgeState::Unresolved);
    }

    #[test]
    fn test_unknown_reference_aborts() {
        let err = build(&[("index.html", "{{addHash:missing.js}}")]).unwrap_err();
        assert!(matches!(err, FingerprintError::Resolution { .. }));
    }

    #[test]
    fn test_assign_and_reset() {
        let (mut graph, _) = build(&[
            ("a", "{{addHash:b}}"),
            ("b", "{{addHash:a}} {{addHash:b}}"),
        ])
        .unwrap();

        graph.mark_pending(Path::new("a"), Path::new("b"));
        graph.mark_pending(Path::new("b"), Path::new("b"));
        assert_eq!(
            graph.first_in_state(Path::new("a"), &EdgeState::PendingInCycle),
            Some(PathBuf::from("b"))
        );
        assert_eq!(
            graph.dependencies(Path::new("b")).unwrap()[Path::new("b")],
            EdgeState::SelfSentinel
        );

        assert!(graph.reset_pending());
        assert!(!graph.reset_pending());

        assert!(graph.assign_hash(Path::new("b"), "feed"));
        assert_eq!(
            graph.dependencies(Path::new("a")).unwrap()[Path::new("b")],
            EdgeState::Hash("feed".to_string())
        );
        assert_eq!(
            graph.dependencies(Path::new("b")).unwrap()[Path::new("b")],
            EdgeState::SelfSentinel
        );
        assert_eq!(graph.first_unsettled(), Some((&PathBuf::from("b"), &PathBuf::from("a"))));
        assert!(!graph.assign_hash(Path::new("unreferenced"), "feed"));
    }
}
