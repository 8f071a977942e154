use indexmap::IndexMap;
use std::path::PathBuf;

use super::graph::{DependencyGraph, OriginalReferences};
use super::markers::MarkerSyntax;
use super::names::{hashed_name, hashed_path};
use super::{FileSet, FingerprintError};

/// Renames produced by [`apply`]
#[derive(Debug, Default)]
pub struct Renames {
    /// FileSet keys that were moved
    pub renamed: IndexMap<PathBuf, PathBuf>,
    /// Referenced files that only exist on disk
    pub external: IndexMap<PathBuf, PathBuf>,
}

/// Replace markers with hash-qualified references, then rename every
/// referenced file.
///
/// All new contents are computed before the FileSet is touched, so a missing
/// hash leaves the FileSet unchanged.
pub fn apply(
    files: &mut FileSet,
    graph: &DependencyGraph,
    originals: &OriginalReferences,
    registry: &IndexMap<PathBuf, String>,
    markers: &dyn MarkerSyntax,
) -> Result<Renames, FingerprintError> {
    let mut rewritten: Vec<(PathBuf, String)> = Vec::with_capacity(graph.len());

    for file in graph.files() {
        let Some(mut content) = files.get(file).cloned() else {
            continue;
        };

        // Each spelling of a reference is rewritten on its own
        for (reference, dep) in graph.references(file) {
            let hash = registry.get(dep).ok_or_else(|| FingerprintError::Convergence {
                file: file.clone(),
                dependency: dep.clone(),
            })?;

            let marker = markers.marker_for(reference);
            content = content.replace(&marker, &hashed_name(reference, hash));
        }

        rewritten.push((file.clone(), content));
    }

    for (file, content) in rewritten {
        files.insert(file, content);
    }

    let mut renames = Renames::default();
    for (path, hash) in registry {
        let new_path = hashed_path(path, hash);

        match files.shift_remove(path) {
            Some(content) => {
                tracing::debug!(
                    "Rename {} (referenced as {}) to {}",
                    path.display(),
                    originals.get(path).map(String::as_str).unwrap_or("-"),
                    new_path.display()
                );
                files.insert(new_path.clone(), content);
                renames.renamed.insert(path.clone(), new_path);
            }
            None => {
                tracing::debug!(
                    "{} is not in the file set, reporting rename to {}",
                    path.display(),
                    new_path.display()
                );
                renames.external.insert(path.clone(), new_path);
            }
        }
    }

    Ok(renames)
}
