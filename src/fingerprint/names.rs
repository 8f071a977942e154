use std::path::{Path, PathBuf};

/// Insert `hash` between the base name and the extension of a `/`-separated
/// reference: `css/site.min.css` becomes `css/site.min.<hash>.css`.
pub fn hashed_name(reference: &str, hash: &str) -> String {
    let (directory, base) = match reference.rfind('/') {
        Some(idx) => reference.split_at(idx + 1),
        None => ("", reference),
    };

    // A leading dot belongs to the name, not the extension
    match base.rfind('.') {
        Some(idx) if idx > 0 => {
            let (name, extension) = base.split_at(idx);
            format!("{directory}{name}.{hash}{extension}")
        }
        _ => format!("{directory}{base}.{hash}"),
    }
}

/// Hash-qualified form of a file identity, keeping its directory.
pub fn hashed_path(path: &Path, hash: &str) -> PathBuf {
    match path.file_name() {
        Some(file_name) => {
            let renamed = hashed_name(&file_name.to_string_lossy(), hash);
            path.with_file_name(renamed)
        }
        None => path.to_path_buf(),
    }
}
