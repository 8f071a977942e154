//! Cycle-aware hash resolution.
//!
//! Each entry point drives a fixed-point loop of depth-first passes over the
//! [`DependencyGraph`]. A pass hashes every file whose dependencies are all
//! terminal, parks edges that close a loop as `PendingInCycle`, and settles
//! the loops it found with one combined hash per cycle. Pending edges are
//! reset between passes so loops that only close once another loop is
//! settled are picked up again.

use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::content::ContentSource;
use super::cycles::CycleMerger;
use super::graph::{DependencyGraph, EdgeState};
use super::FingerprintError;
use crate::utils::hash::HashAlgorithm;

/// Current depth-first path with O(1) membership
#[derive(Debug, Default)]
struct Breadcrumb {
    trail: Vec<PathBuf>,
    positions: HashMap<PathBuf, usize>,
}

impl Breadcrumb {
    fn new(entry: &Path) -> Self {
        let mut breadcrumb = Self::default();
        breadcrumb.push(entry.to_path_buf());
        breadcrumb
    }

    fn push(&mut self, path: PathBuf) {
        self.positions.insert(path.clone(), self.trail.len());
        self.trail.push(path);
    }

    fn pop(&mut self) {
        if let Some(path) = self.trail.pop() {
            self.positions.remove(&path);
        }
    }

    fn last(&self) -> Option<&PathBuf> {
        self.trail.last()
    }

    fn position(&self, path: &Path) -> Option<usize> {
        self.positions.get(path).copied()
    }

    fn slice_from(&self, start: usize) -> &[PathBuf] {
        &self.trail[start..]
    }

    fn pairs(&self) -> impl Iterator<Item = (&PathBuf, &PathBuf)> {
        self.trail.iter().zip(self.trail.iter().skip(1))
    }
}

/// Per-run resolution state
pub struct HashResolver<'a> {
    graph: &'a mut DependencyGraph,
    content: &'a ContentSource<'a>,
    algorithm: HashAlgorithm,
    max_passes: usize,
    /// Every hash computed in this run
    computed: IndexMap<PathBuf, String>,
    /// Hashes of files referenced by at least one file
    registry: IndexMap<PathBuf, String>,
    cycles: Vec<Vec<PathBuf>>,
    passes: usize,
}

/// What a resolver run produced
#[derive(Debug, Default)]
pub struct Resolution {
    pub computed: IndexMap<PathBuf, String>,
    pub registry: IndexMap<PathBuf, String>,
    pub cycles: Vec<Vec<PathBuf>>,
    pub passes: usize,
}

impl<'a> HashResolver<'a> {
    pub fn new(
        graph: &'a mut DependencyGraph,
        content: &'a ContentSource<'a>,
        algorithm: HashAlgorithm,
        max_passes: usize,
    ) -> Self {
        Self {
            graph,
            content,
            algorithm,
            max_passes: max_passes.max(1),
            computed: IndexMap::new(),
            registry: IndexMap::new(),
            cycles: Vec::new(),
            passes: 0,
        }
    }

    /// Resolve every entry, then check that no edge was left behind
    pub fn resolve_all(mut self, entries: &[PathBuf]) -> Result<Resolution, FingerprintError> {
        for entry in entries {
            self.resolve_entry(entry)?;
        }

        if let Some((file, dependency)) = self.graph.first_unsettled() {
            return Err(FingerprintError::Convergence {
                file: file.clone(),
                dependency: dependency.clone(),
            });
        }

        Ok(Resolution {
            computed: self.computed,
            registry: self.registry,
            cycles: self.cycles,
            passes: self.passes,
        })
    }

    /// Run passes from `entry` until nothing is left pending
    pub fn resolve_entry(&mut self, entry: &Path) -> Result<(), FingerprintError> {
        if self.computed.contains_key(entry) {
            tracing::debug!("Entry {} already hashed", entry.display());
            return Ok(());
        }

        tracing::debug!("Entry {}", entry.display());

        for pass in 1..=self.max_passes {
            self.run_pass(entry)?;
            self.passes += 1;

            let reset = self.graph.reset_pending();
            if !reset && self.computed.contains_key(entry) {
                tracing::debug!("Entry {} settled after {} passes", entry.display(), pass);
                return Ok(());
            }
        }

        Err(FingerprintError::NotConverged {
            entry: entry.to_path_buf(),
            passes: self.max_passes,
        })
    }

    fn run_pass(&mut self, entry: &Path) -> Result<(), FingerprintError> {
        let mut breadcrumb = Breadcrumb::new(entry);
        let mut merger = CycleMerger::new();

        while let Some(current) = breadcrumb.last().cloned() {
            if !self.graph.contains(&current) {
                // No markers at all, the content alone decides
                self.settle_file(&current)?;
                breadcrumb.pop();
                continue;
            }

            if let Some(dep) = self.graph.first_in_state(&current, &EdgeState::Unresolved) {
                tracing::debug!("Process {} in {}", dep.display(), current.display());

                match breadcrumb.position(&dep) {
                    Some(start) => {
                        // Loop back into the current path
                        merger.add(breadcrumb.slice_from(start));
                        self.defer_path(&breadcrumb);
                        self.graph.mark_pending(&current, &dep);
                    }
                    None => breadcrumb.push(dep),
                }
            } else if let Some(dep) = self.graph.first_in_state(&current, &EdgeState::PendingInCycle) {
                merger.add(&[current.clone(), dep]);
                self.defer_path(&breadcrumb);
                breadcrumb.pop();
            } else {
                self.settle_file(&current)?;
                breadcrumb.pop();
            }
        }

        if !merger.is_empty() {
            let pending: Vec<PathBuf> = merger.into_classes().into_iter().flatten().collect();
            self.settle_pending(&pending)?;
        }

        Ok(())
    }

    /// Park every edge along the current path until the loop is settled
    fn defer_path(&mut self, breadcrumb: &Breadcrumb) {
        for (from, to) in breadcrumb.pairs() {
            self.graph.mark_pending(from, to);
        }
    }

    fn settle_file(&mut self, file: &Path) -> Result<(), FingerprintError> {
        let content = self.content.fetch(file)?;
        let content_hash = self.algorithm.digest_hex(&content);

        let values: Vec<String> = self
            .graph
            .dependencies(file)
            .map(|deps| {
                deps.values()
                    .filter_map(|state| state.terminal_value().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let hash = self.combine(content_hash, &values);
        tracing::debug!("Replace: {} ({})", file.display(), hash);
        self.record(file, hash);

        Ok(())
    }

    /// Settle the files left pending by a pass.
    ///
    /// Separate loop candidates may belong to one loop, so the pending files
    /// are split into strongly connected components over their full edge set
    /// and settled dependencies first. A file that only leads into a loop is
    /// its own component and gets its own hash.
    fn settle_pending(&mut self, pending: &[PathBuf]) -> Result<(), FingerprintError> {
        let mut subgraph = DiGraph::<usize, ()>::new();
        let nodes: Vec<_> = (0..pending.len()).map(|i| subgraph.add_node(i)).collect();
        let position: HashMap<&PathBuf, usize> =
            pending.iter().enumerate().map(|(i, p)| (p, i)).collect();

        for (i, file) in pending.iter().enumerate() {
            if let Some(deps) = self.graph.dependencies(file) {
                for dep in deps.keys() {
                    if let Some(&j) = position.get(dep) {
                        if i != j {
                            subgraph.add_edge(nodes[i], nodes[j], ());
                        }
                    }
                }
            }
        }

        // Components come out dependencies first
        for component in tarjan_scc(&subgraph) {
            let mut indices: Vec<usize> = component.iter().map(|n| subgraph[*n]).collect();
            indices.sort_unstable();
            let members: Vec<PathBuf> = indices.into_iter().map(|i| pending[i].clone()).collect();

            if members.len() > 1 {
                self.settle_cycle(&members)?;
            } else if self.computed.contains_key(&members[0]) {
                continue;
            } else if self.dependencies_terminal(&members[0]) {
                self.settle_file(&members[0])?;
            }
        }

        Ok(())
    }

    fn dependencies_terminal(&self, file: &Path) -> bool {
        self.graph
            .dependencies(file)
            .map_or(true, |deps| deps.values().all(EdgeState::is_terminal))
    }

    fn settle_cycle(&mut self, members: &[PathBuf]) -> Result<bool, FingerprintError> {
        let inside: HashSet<&PathBuf> = members.iter().collect();

        let mut values = Vec::new();
        for member in members {
            if let Some(deps) = self.graph.dependencies(member) {
                for (dep, state) in deps {
                    if inside.contains(dep) {
                        continue;
                    }
                    match state.terminal_value() {
                        Some(value) => values.push(value.to_string()),
                        None => {
                            tracing::debug!(
                                "Cycle through {} waits for {}",
                                member.display(),
                                dep.display()
                            );
                            return Ok(false);
                        }
                    }
                }
            }
        }

        let mut contents = Vec::with_capacity(members.len());
        for member in members {
            contents.push(self.content.fetch(member)?);
        }
        let slices: Vec<&[u8]> = contents.iter().map(|c| c.as_ref()).collect();
        let content_hash = self.algorithm.digest_concat(&slices);

        let hash = self.combine(content_hash, &values);
        tracing::debug!("Replace cycle with {} items ({})", members.len(), hash);

        for member in members {
            tracing::debug!("  {}", member.display());
            self.record(member, hash.clone());
        }
        self.cycles.push(members.to_vec());

        Ok(true)
    }

    fn combine(&self, content_hash: String, values: &[String]) -> String {
        if values.is_empty() {
            return content_hash;
        }

        let mut combined = content_hash;
        for value in values {
            combined.push_str(value);
        }
        self.algorithm.digest_hex(combined.as_bytes())
    }

    fn record(&mut self, file: &Path, hash: String) {
        if self.graph.assign_hash(file, &hash) {
            self.registry.entry(file.to_path_buf()).or_insert_with(|| hash.clone());
        }
        self.computed.insert(file.to_path_buf(), hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::graph::OriginalReferences;
    use crate::fingerprint::locator::SearchPathLocator;
    use crate::fingerprint::markers::TagMarkers;
    use crate::fingerprint::FileSet;
    use crate::utils::hash::TextEncoding;

    const ALGORITHM: HashAlgorithm = HashAlgorithm::Xxh3_128;

    fn files(entries: &[(&str, &str)]) -> FileSet {
        entries
            .iter()
            .map(|(path, content)| (PathBuf::from(path), content.to_string()))
            .collect()
    }

    fn graph(files: &FileSet) -> (DependencyGraph, OriginalReferences) {
        DependencyGraph::build(
            files,
            &TagMarkers::default(),
            &SearchPathLocator::default(),
            &[PathBuf::from(".")],
        )
        .unwrap()
    }

    fn resolve(files: &FileSet, entries: &[&str]) -> Result<Resolution, FingerprintError> {
        let (mut graph, _) = graph(files);
        let base = PathBuf::new();
        let content = ContentSource::new(files, &base, TextEncoding::Utf8);
        let entries: Vec<PathBuf> = entries.iter().map(PathBuf::from).collect();
        HashResolver::new(&mut graph, &content, ALGORITHM, 64).resolve_all(&entries)
    }

    fn digest(data: &str) -> String {
        ALGORITHM.digest_hex(data.as_bytes())
    }

    #[test]
    fn test_leaf_hash_is_content_digest() {
        let files = files(&[("a", "{{addHash:b}}"), ("b", "b")]);
        let result = resolve(&files, &["a"]).unwrap();

        assert_eq!(result.computed[Path::new("b")], digest("b"));
    }

    #[test]
    fn test_dependent_combines_dependency_hash() {
        let files = files(&[("a", "a{{addHash:b}}"), ("b", "b")]);
        let result = resolve(&files, &["a"]).unwrap();

        let hash_b = digest("b");
        let hash_a = digest(&format!("{}{}", digest("a{{addHash:b}}"), hash_b));
        assert_eq!(result.computed[Path::new("a")], hash_a);
        assert_eq!(result.registry.len(), 1);
        assert_eq!(result.registry[Path::new("b")], hash_b);
    }

    #[test]
    fn test_dependency_values_follow_insertion_order() {
        let files = files(&[
            ("index", "{{addHash:z}}{{addHash:y}}"),
            ("z", "zz"),
            ("y", "yy"),
        ]);
        let result = resolve(&files, &["index"]).unwrap();

        let expected = digest(&format!(
            "{}{}{}",
            digest("{{addHash:z}}{{addHash:y}}"),
            digest("zz"),
            digest("yy")
        ));
        assert_eq!(result.computed[Path::new("index")], expected);
    }

    #[test]
    fn test_two_cycle_shares_hash() {
        let files = files(&[("a", "{{addHash:b}}"), ("b", "{{addHash:a}}")]);
        let result = resolve(&files, &["a"]).unwrap();

        let expected = digest("{{addHash:b}}{{addHash:a}}");
        assert_eq!(result.computed[Path::new("a")], expected);
        assert_eq!(result.computed[Path::new("b")], expected);
        assert_eq!(result.registry.len(), 2);
        assert_eq!(result.cycles, vec![vec![PathBuf::from("a"), PathBuf::from("b")]]);
    }

    #[test]
    fn test_cycle_combines_external_dependencies() {
        let files = files(&[
            ("a", "{{addHash:b}}"),
            ("b", "{{addHash:a}}{{addHash:c}}"),
            ("c", "c"),
        ]);
        let result = resolve(&files, &["a"]).unwrap();

        let expected = digest(&format!(
            "{}{}",
            digest("{{addHash:b}}{{addHash:a}}{{addHash:c}}"),
            digest("c")
        ));
        assert_eq!(result.computed[Path::new("a")], expected);
        assert_eq!(result.computed[Path::new("b")], expected);
    }

    #[test]
    fn test_path_into_cycle_is_not_merged() {
        let files = files(&[
            ("x", "{{addHash:a}}"),
            ("a", "{{addHash:b}}"),
            ("b", "{{addHash:a}}"),
        ]);
        let result = resolve(&files, &["x"]).unwrap();

        let cycle = digest("{{addHash:b}}{{addHash:a}}");
        assert_eq!(result.computed[Path::new("a")], cycle);
        assert_eq!(result.computed[Path::new("b")], cycle);
        assert_eq!(
            result.computed[Path::new("x")],
            digest(&format!("{}{}", digest("{{addHash:a}}"), cycle))
        );
        assert!(!result.registry.contains_key(Path::new("x")));
    }

    #[test]
    fn test_linked_cycles_merge() {
        // a <-> b <-> c
        let files = files(&[
            ("a", "{{addHash:b}}"),
            ("b", "{{addHash:a}}{{addHash:c}}"),
            ("c", "{{addHash:b}}"),
        ]);
        let result = resolve(&files, &["a"]).unwrap();

        let hash = &result.computed[Path::new("a")];
        assert_eq!(&result.computed[Path::new("b")], hash);
        assert_eq!(&result.computed[Path::new("c")], hash);
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(result.cycles[0].len(), 3);
    }

    #[test]
    fn test_cycle_depending_on_cycle_settles_dependency_first() {
        // a <-> b -> c <-> d
        let files = files(&[
            ("a", "{{addHash:b}}"),
            ("b", "{{addHash:a}}{{addHash:c}}"),
            ("c", "{{addHash:d}}"),
            ("d", "{{addHash:c}}"),
        ]);
        let result = resolve(&files, &["a"]).unwrap();

        let lower = digest("{{addHash:d}}{{addHash:c}}");
        assert_eq!(result.computed[Path::new("c")], lower);
        assert_eq!(result.computed[Path::new("d")], lower);

        let upper = digest(&format!("{}{}", digest("{{addHash:b}}{{addHash:a}}{{addHash:c}}"), lower));
        assert_eq!(result.computed[Path::new("a")], upper);
        assert_eq!(result.computed[Path::new("b")], upper);
        assert_eq!(
            result.cycles,
            vec![
                vec![PathBuf::from("c"), PathBuf::from("d")],
                vec![PathBuf::from("a"), PathBuf::from("b")],
            ]
        );
    }

    #[test]
    fn test_interlocked_loops_form_one_cycle() {
        // a <-> b and c <-> d, joined by a -> c and c -> b
        let files = files(&[
            ("a", "{{addHash:b}}{{addHash:c}}"),
            ("b", "{{addHash:a}}"),
            ("c", "{{addHash:d}}{{addHash:b}}"),
            ("d", "{{addHash:c}}"),
        ]);
        let result = resolve(&files, &["a"]).unwrap();

        let expected = digest("{{addHash:b}}{{addHash:c}}{{addHash:a}}{{addHash:d}}{{addHash:b}}{{addHash:c}}");
        for member in ["a", "b", "c", "d"] {
            assert_eq!(result.computed[Path::new(member)], expected);
        }
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(result.passes, 1);
    }

    #[test]
    fn test_nested_loops_reached_through_a_path() {
        // f0 -> f1, f1 -> {f4, f5}, f4 -> f1, f5 -> {f2, f4}, f2 -> f5
        let files = files(&[
            ("f0", "{{addHash:f1}}"),
            ("f1", "{{addHash:f4}}{{addHash:f5}}"),
            ("f2", "{{addHash:f5}}"),
            ("f4", "{{addHash:f1}}"),
            ("f5", "{{addHash:f2}}{{addHash:f4}}"),
        ]);
        let result = resolve(&files, &["f0"]).unwrap();

        let shared = &result.computed[Path::new("f1")];
        for member in ["f2", "f4", "f5"] {
            assert_eq!(&result.computed[Path::new(member)], shared);
        }
        assert_ne!(&result.computed[Path::new("f0")], shared);
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(result.cycles[0].len(), 4);
    }

    #[test]
    fn test_self_reference_uses_sentinel() {
        let files = files(&[("a", "{{addHash:a}}")]);
        let result = resolve(&files, &["a"]).unwrap();

        let expected = digest(&format!("{}self", digest("{{addHash:a}}")));
        assert_eq!(result.computed[Path::new("a")], expected);
        assert_eq!(result.registry[Path::new("a")], expected);
    }

    #[test]
    fn test_unreachable_dependency_fails() {
        let files = files(&[
            ("a", "{{addHash:b}}"),
            ("b", "b"),
            ("orphan", "{{addHash:b}}{{addHash:c}}"),
            ("c", "c"),
        ]);

        match resolve(&files, &["a"]) {
            Err(FingerprintError::Convergence { file, dependency }) => {
                assert_eq!(file, PathBuf::from("orphan"));
                assert_eq!(dependency, PathBuf::from("c"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_second_entry_reuses_hashes() {
        let files = files(&[
            ("one", "{{addHash:shared}}"),
            ("two", "{{addHash:shared}}"),
            ("shared", "s"),
        ]);
        let result = resolve(&files, &["one", "two", "one"]).unwrap();

        assert_eq!(result.registry.len(), 1);
        assert_eq!(result.computed.len(), 3);
    }
}
