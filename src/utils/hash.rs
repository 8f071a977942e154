use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use xxhash_rust::xxh3::{xxh3_128, xxh3_64};

use crate::fingerprint::FingerprintError;

/// Digest used for content fingerprints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[serde(rename = "xxh3-64")]
    Xxh3_64,
    #[default]
    #[serde(rename = "xxh3-128")]
    Xxh3_128,
    #[serde(rename = "sha256")]
    Sha256,
    #[serde(rename = "blake3")]
    Blake3,
}

impl HashAlgorithm {
    /// Hash `data` and return the lowercase hex digest
    pub fn digest_hex(&self, data: &[u8]) -> String {
        match self {
            HashAlgorithm::Xxh3_64 => format!("{:016x}", xxh3_64(data)),
            HashAlgorithm::Xxh3_128 => format!("{:032x}", xxh3_128(data)),
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
            HashAlgorithm::Blake3 => blake3::hash(data).to_hex().to_string(),
        }
    }

    /// Hash a sequence of inputs as if they were one contiguous buffer
    pub fn digest_concat(&self, inputs: &[&[u8]]) -> String {
        let mut combined = Vec::with_capacity(inputs.iter().map(|i| i.len()).sum());
        for input in inputs {
            combined.extend_from_slice(input);
        }
        self.digest_hex(&combined)
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Xxh3_64 => write!(f, "xxh3-64"),
            HashAlgorithm::Xxh3_128 => write!(f, "xxh3-128"),
            HashAlgorithm::Sha256 => write!(f, "sha256"),
            HashAlgorithm::Blake3 => write!(f, "blake3"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xxh3-64" | "xxh3" => Ok(HashAlgorithm::Xxh3_64),
            "xxh3-128" => Ok(HashAlgorithm::Xxh3_128),
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "blake3" => Ok(HashAlgorithm::Blake3),
            other => Err(FingerprintError::Configuration(format!(
                "unsupported hash algorithm \"{other}\" (expected xxh3-64, xxh3-128, sha256 or blake3)"
            ))),
        }
    }
}

/// Text encoding of FileSet content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextEncoding {
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    #[serde(rename = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl TextEncoding {
    /// Bytes of `text` in this encoding, `None` when a character does not fit
    pub fn encode<'a>(&self, text: &'a str) -> Option<std::borrow::Cow<'a, [u8]>> {
        match self {
            TextEncoding::Utf8 => Some(std::borrow::Cow::Borrowed(text.as_bytes())),
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).ok())
                .collect::<Option<Vec<u8>>>()
                .map(std::borrow::Cow::Owned),
        }
    }

    /// Decode raw file bytes, `None` when they are not valid in this encoding
    pub fn decode(&self, bytes: Vec<u8>) -> Option<String> {
        match self {
            TextEncoding::Utf8 => String::from_utf8(bytes).ok(),
            TextEncoding::Latin1 => Some(bytes.into_iter().map(char::from).collect()),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf8 => write!(f, "utf-8"),
            TextEncoding::Latin1 => write!(f, "latin1"),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "latin1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            other => Err(FingerprintError::Configuration(format!(
                "unsupported text encoding \"{other}\""
            ))),
        }
    }
}
