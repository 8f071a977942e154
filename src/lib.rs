//! Content-hash fingerprinting for interdependent build assets.
//!
//! Files reference each other through inline markers such as
//! `{{addHash:img/logo.png}}`. [`Fingerprinter`] computes a hash per file that
//! covers its own content and everything it depends on, rewrites the markers
//! to hash-qualified names and renames the referenced files.

pub mod config;
pub mod fingerprint;
pub mod utils;

pub use fingerprint::{
    EntryPoints, FileSet, FingerprintError, FingerprintOptions, FingerprintReport, Fingerprinter,
};
pub use utils::hash::{HashAlgorithm, TextEncoding};
