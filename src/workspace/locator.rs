//! File location across the organized folder set and the intake directory
//!
//! Callers may hold a stale path for a file that a previous classification
//! already moved. Probing the fixed candidate order makes every
//! file-accepting operation idempotent against relocation.

use crate::error::{Error, Result};
use crate::workspace::FolderLayout;
use std::path::{Path, PathBuf};

/// Find a file by its filename component, probing the candidate directories
/// in fixed priority order. Returns the first existing path.
pub fn locate(layout: &FolderLayout, file_ref: &str) -> Result<PathBuf> {
    let name = Path::new(file_ref)
        .file_name()
        .ok_or_else(|| Error::FileNotFound {
            name: file_ref.to_string(),
        })?;

    for dir in layout.candidate_dirs() {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(Error::FileNotFound {
        name: name.to_string_lossy().into_owned(),
    })
}

/// Resolve a file reference: the literal path when it exists, otherwise a
/// candidate-directory probe by filename.
pub fn resolve_file_ref(layout: &FolderLayout, file_ref: &str) -> Result<PathBuf> {
    let literal = Path::new(file_ref);
    if literal.is_file() {
        return Ok(literal.to_path_buf());
    }
    locate(layout, file_ref)
}
