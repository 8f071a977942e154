use indexmap::IndexMap;
use std::path::PathBuf;

/// Merges overlapping candidate cycles into disjoint classes.
///
/// Backed by a disjoint-set over file identities. Members are numbered in the
/// order they are first seen, which fixes both the order of the classes and
/// the order of members inside each class.
#[derive(Debug, Default)]
pub struct CycleMerger {
    index: IndexMap<PathBuf, usize>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl CycleMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Add one candidate; all of its members end up in the same class
    pub fn add(&mut self, candidate: &[PathBuf]) {
        let mut members = candidate.iter().map(|path| self.intern(path));

        if let Some(first) = members.next() {
            let rest: Vec<usize> = members.collect();
            for other in rest {
                self.union(first, other);
            }
        }
    }

    /// Disjoint classes, ordered by their earliest member
    pub fn into_classes(mut self) -> Vec<Vec<PathBuf>> {
        let mut classes: IndexMap<usize, Vec<PathBuf>> = IndexMap::new();

        let paths: Vec<PathBuf> = self.index.keys().cloned().collect();
        for (id, path) in paths.into_iter().enumerate() {
            let root = self.find(id);
            classes.entry(root).or_default().push(path);
        }

        classes.into_values().collect()
    }

    fn intern(&mut self, path: &PathBuf) -> usize {
        if let Some(&id) = self.index.get(path) {
            return id;
        }

        let id = self.parent.len();
        self.index.insert(path.clone(), id);
        self.parent.push(id);
        self.rank.push(0);
        id
    }

    fn find(&mut self, id: usize) -> usize {
        let mut root = id;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        // Path compression
        let mut current = id;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }

        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }

        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}
