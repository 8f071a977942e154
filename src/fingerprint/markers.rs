use regex::Regex;

use super::FingerprintError;

pub const DEFAULT_TAG: &str = "addHash";
pub const DEFAULT_OPEN: &str = "{{";
pub const DEFAULT_CLOSE: &str = "}}";

/// Finds dependency markers in file content and rebuilds their literal text.
///
/// Implementations must be pure: the same content always yields the same
/// references in the same order.
pub trait MarkerSyntax: Send + Sync {
    /// Raw references in order of appearance
    fn extract_references(&self, content: &str) -> Vec<String>;

    /// Exact marker text that refers to `reference`
    fn marker_for(&self, reference: &str) -> String;
}

/// Markers of the form `{{addHash:path/to/file}}` with configurable tag and
/// delimiters
#[derive(Debug, Clone)]
pub struct TagMarkers {
    tag: String,
    open: String,
    close: String,
    pattern: Regex,
}

impl TagMarkers {
    pub fn new(tag: &str, open: &str, close: &str) -> Result<Self, FingerprintError> {
        if tag.is_empty() || open.is_empty() || close.is_empty() {
            return Err(FingerprintError::Configuration(
                "marker tag and delimiters must not be empty".to_string(),
            ));
        }

        let pattern = Regex::new(&format!(
            r"{}{}:([^\r\n]+?){}",
            regex::escape(open),
            regex::escape(tag),
            regex::escape(close)
        ))
        .map_err(|e| FingerprintError::Configuration(format!("invalid marker syntax: {e}")))?;

        Ok(Self {
            tag: tag.to_string(),
            open: open.to_string(),
            close: close.to_string(),
            pattern,
        })
    }
}

impl Default for TagMarkers {
    fn default() -> Self {
        // The default delimiters are plain text once escaped
        Self::new(DEFAULT_TAG, DEFAULT_OPEN, DEFAULT_CLOSE).expect("default marker syntax is valid")
    }
}

impl MarkerSyntax for TagMarkers {
    fn extract_references(&self, content: &str) -> Vec<String> {
        self.pattern
            .captures_iter(content)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }

    fn marker_for(&self, reference: &str) -> String {
        format!("{}{}:{}{}", self.open, self.tag, reference, self.close)
    }
}
