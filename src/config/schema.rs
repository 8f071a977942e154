use globset::{Glob, GlobSet, GlobSetBuilder};
use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::fingerprint::{
    EntryPoints, FingerprintError, FingerprintOptions, TagMarkers, DEFAULT_CLOSE,
    DEFAULT_MAX_PASSES, DEFAULT_OPEN, DEFAULT_TAG,
};
use crate::utils::hash::{HashAlgorithm, TextEncoding};

/// Root configuration structure for asset-stamp.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Project layout
    #[serde(default)]
    pub project: ProjectConfig,

    /// Hash resolution settings
    #[serde(default)]
    pub fingerprint: FingerprintConfig,

    /// Marker syntax
    #[serde(default)]
    pub markers: MarkerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Source directory
    #[serde(default = "default_source_dir")]
    pub source: PathBuf,

    /// Output directory
    #[serde(default = "default_output_dir")]
    pub output: PathBuf,

    /// Glob patterns of text files that may contain markers.
    /// Everything else is copied as binary.
    #[serde(default = "default_include")]
    pub include: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            source: default_source_dir(),
            output: default_output_dir(),
            include: default_include(),
        }
    }
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("./web")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./dist")
}

fn default_include() -> Vec<String> {
    [
        "**/*.html", "**/*.htm", "**/*.css", "**/*.js", "**/*.mjs", "**/*.json", "**/*.svg",
        "**/*.xml", "**/*.txt", "**/*.webmanifest",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintConfig {
    /// Asset search roots, relative to the source directory
    #[serde(default = "default_assets")]
    pub assets: Vec<PathBuf>,

    /// Explicit entry files, relative to the source directory
    #[serde(default)]
    pub entries: Vec<PathBuf>,

    /// Glob patterns selecting entry files among files with markers
    #[serde(default)]
    pub entry_patterns: Vec<String>,

    /// Digest algorithm
    #[serde(default)]
    pub algorithm: HashAlgorithm,

    /// Text encoding of source files
    #[serde(default)]
    pub encoding: TextEncoding,

    /// Maximum resolution passes per entry
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            assets: default_assets(),
            entries: Vec::new(),
            entry_patterns: Vec::new(),
            algorithm: HashAlgorithm::default(),
            encoding: TextEncoding::default(),
            max_passes: default_max_passes(),
        }
    }
}

fn default_assets() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

fn default_max_passes() -> usize {
    DEFAULT_MAX_PASSES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Marker tag name
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Opening delimiter
    #[serde(default = "default_open")]
    pub open: String,

    /// Closing delimiter
    #[serde(default = "default_close")]
    pub close: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            tag: default_tag(),
            open: default_open(),
            close: default_close(),
        }
    }
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

fn default_open() -> String {
    DEFAULT_OPEN.to_string()
}

fn default_close() -> String {
    DEFAULT_CLOSE.to_string()
}

impl MarkerConfig {
    pub fn syntax(&self) -> Result<TagMarkers, FingerprintError> {
        TagMarkers::new(&self.tag, &self.open, &self.close)
    }
}

impl FingerprintConfig {
    /// Options for a run over files keyed relative to `source`
    pub fn to_options(&self, source: &Path) -> Result<FingerprintOptions, FingerprintError> {
        let entries = match (self.entries.is_empty(), self.entry_patterns.is_empty()) {
            (true, true) => {
                return Err(FingerprintError::Configuration(
                    "\"entries\" is not provided".to_string(),
                ))
            }
            (false, false) => {
                return Err(FingerprintError::Configuration(
                    "use either \"entries\" or \"entry_patterns\", not both".to_string(),
                ))
            }
            (false, true) => EntryPoints::Files(self.entries.iter().map(|e| e.clean()).collect()),
            (true, false) => {
                let globs = build_globset(&self.entry_patterns)?;
                EntryPoints::matching(move |path| globs.is_match(path))
            }
        };

        Ok(FingerprintOptions::new(self.assets.clone(), entries)
            .with_algorithm(self.algorithm)
            .with_encoding(self.encoding)
            .with_base_dir(source)
            .with_max_passes(self.max_passes))
    }
}

/// Compile glob patterns, reporting the first invalid one
pub fn build_globset(patterns: &[String]) -> Result<GlobSet, FingerprintError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            FingerprintError::Configuration(format!("invalid glob \"{pattern}\": {e}"))
        })?;
        builder.add(glob);
    }

    builder
        .build()
        .map_err(|e| FingerprintError::Configuration(format!("invalid glob set: {e}")))
}

impl Config {
    /// Generate default TOML content
    pub fn default_toml() -> String {
        r#"[project]
source = "./web"
output = "./dist"
# Files that may contain markers; everything else is copied as-is
include = ["**/*.html", "**/*.css", "**/*.js", "**/*.mjs", "**/*.json", "**/*.svg"]

[fingerprint]
# Where referenced assets are searched, relative to the source directory
assets = ["."]

# Entry files, relative to the source directory...
entries = ["index.html"]
# ...or glob patterns over files that contain markers
# entry_patterns = ["**/*.html"]

# xxh3-64, xxh3-128, sha256 or blake3
algorithm = "xxh3-128"
encoding = "utf-8"
max_passes = 256

[markers]
# Markers look like {{addHash:css/site.css}}
tag = "addHash"
open = "{{"
close = "}}"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_toml_parses() {
        let config: Config = toml::from_str(&Config::default_toml()).unwrap();

        assert_eq!(config.project.output, PathBuf::from("./dist"));
        assert_eq!(config.fingerprint.entries, vec![PathBuf::from("index.html")]);
        assert_eq!(config.fingerprint.algorithm, HashAlgorithm::Xxh3_128);
        assert_eq!(config.markers.tag, "addHash");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.fingerprint.assets, vec![PathBuf::from(".")]);
        assert_eq!(config.fingerprint.max_passes, DEFAULT_MAX_PASSES);
        assert_eq!(config.fingerprint.encoding, TextEncoding::Utf8);
        assert!(config.project.include.iter().any(|p| p == "**/*.css"));
    }

    #[test]
    fn test_algorithm_names() {
        let config: Config = toml::from_str(
            r#"[fingerprint]
algorithm = "sha256"
encoding = "latin1"
"#,
        )
        .unwrap();

        assert_eq!(config.fingerprint.algorithm, HashAlgorithm::Sha256);
        assert_eq!(config.fingerprint.encoding, TextEncoding::Latin1);
        assert!(toml::from_str::<Config>("[fingerprint]\nalgorithm = \"md5\"\n").is_err());
    }

    #[test]
    fn test_entry_patterns_become_predicate() {
        let config = FingerprintConfig {
            entry_patterns: vec!["**/*.html".to_string()],
            ..FingerprintConfig::default()
        };

        let options = config.to_options(Path::new("web")).unwrap();
        match &options.entries {
            EntryPoints::Matching(predicate) => {
                assert!(predicate(Path::new("blog/post.html")));
                assert!(!predicate(Path::new("app.css")));
            }
            other => panic!("unexpected entries: {other:?}"),
        }
        assert_eq!(options.base_dir, PathBuf::from("web"));
    }

    #[test]
    fn test_entry_options_conflict() {
        let missing = FingerprintConfig::default();
        assert!(missing.to_options(Path::new(".")).is_err());

        let both = FingerprintConfig {
            entries: vec![PathBuf::from("index.html")],
            entry_patterns: vec!["*.html".to_string()],
            ..FingerprintConfig::default()
        };
        assert!(matches!(
            both.to_options(Path::new(".")),
            Err(FingerprintError::Configuration(_))
        ));
    }
}
