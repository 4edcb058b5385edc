//! # Module Versioning
//!
//! A module's version is a content fingerprint of the files it owns at one
//! tree state. It never depends on build output, timestamps or the machine it
//! is computed on, so two commits with identical module contents share a
//! version and the second build can be recognised as a repeat.
//!
//! ## Algorithm
//!
//! 1.  Take the `(path, blob)` pairs of every file owned by the module, with
//!     paths made relative to the module directory.
//! 2.  Sort them bytewise by relative path.
//! 3.  Feed `path NUL blob LF` for each pair into SHA-256.
//! 4.  The lowercase hex digest is the version.
//!
//! A module without files hashes nothing and gets
//! [`EMPTY_VERSION`](crate::defaults::EMPTY_VERSION).

use sha2::{Digest, Sha256};

use crate::path::relative_to;
use crate::repository::FileEntry;

/// Compute the version of the module at `module_path` from the files it owns.
///
/// Entries outside `module_path` are ignored. Input order does not matter.
pub fn module_version<'a, I>(module_path: &str, files: I) -> String
where
    I: IntoIterator<Item = &'a FileEntry>,
{
    let mut pairs: Vec<(&str, &str)> = files
        .into_iter()
        .filter_map(|entry| {
            relative_to(&entry.path, module_path).map(|rel| (rel, entry.blob.as_str()))
        })
        .collect();
    pairs.sort_unstable();

    let mut hasher = Sha256::new();
    for (path, blob) in pairs {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update(blob.as_bytes());
        hasher.update([b'\n']);
    }
    hex::encode(hasher.finalize())
}
