use std::borrow::Cow;
use std::path::{Path, PathBuf};

use super::{FileSet, FingerprintError};
use crate::utils::hash::TextEncoding;

/// Content lookup for hashing: FileSet first, then the disk.
pub struct ContentSource<'a> {
    files: &'a FileSet,
    base_dir: &'a Path,
    encoding: TextEncoding,
}

impl<'a> ContentSource<'a> {
    pub fn new(files: &'a FileSet, base_dir: &'a Path, encoding: TextEncoding) -> Self {
        Self {
            files,
            base_dir,
            encoding,
        }
    }

    /// Bytes of `path` as they are hashed.
    ///
    /// FileSet text is encoded with the configured encoding. Files outside the
    /// FileSet are read raw so binary assets hash by their actual bytes.
    pub fn fetch(&self, path: &Path) -> Result<Cow<'a, [u8]>, FingerprintError> {
        let files: &'a FileSet = self.files;

        if let Some(text) = files.get(path) {
            return self
                .encoding
                .encode(text)
                .ok_or_else(|| FingerprintError::Encoding {
                    path: path.to_path_buf(),
                    encoding: self.encoding.to_string(),
                });
        }

        let disk_path: PathBuf = self.base_dir.join(path);
        tracing::debug!("Reading {} from disk", disk_path.display());

        std::fs::read(&disk_path)
            .map(Cow::Owned)
            .map_err(|source| FingerprintError::Io {
                path: disk_path,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prefers_fileset() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.css"), "on disk").unwrap();

        let mut files = FileSet::new();
        files.insert(PathBuf::from("a.css"), "in memory".to_string());

        let source = ContentSource::new(&files, temp_dir.path(), TextEncoding::Utf8);
        assert_eq!(source.fetch(Path::new("a.css")).unwrap().as_ref(), b"in memory");
    }

    #[test]
    fn test_reads_binary_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("logo.png"), [0x89, 0xff, 0x00]).unwrap();

        let files = FileSet::new();
        let source = ContentSource::new(&files, temp_dir.path(), TextEncoding::Utf8);
        assert_eq!(source.fetch(Path::new("logo.png")).unwrap().as_ref(), &[0x89, 0xff, 0x00]);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let files = FileSet::new();
        let source = ContentSource::new(&files, temp_dir.path(), TextEncoding::Utf8);

        match source.fetch(Path::new("gone.js")) {
            Err(FingerprintError::Io { path, .. }) => {
                assert_eq!(path, temp_dir.path().join("gone.js"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
