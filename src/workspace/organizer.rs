//! State-driven document filing
//!
//! The organizer classifies a document from its live content and relocates
//! it into the matching organized subfolder. Moves are exclusive: a file
//! ends up at exactly one destination and no copy is left behind.

use crate::error::{Error, Result};
use crate::pdf::{classify_bytes, SignatureState};
use crate::workspace::{list_pdf_names, locator, FolderLayout};
use std::path::{Path, PathBuf};

/// Orchestrates classify -> locate -> move over a folder layout
#[derive(Debug, Clone)]
pub struct Organizer {
    layout: FolderLayout,
}

/// Result of one reconciliation pass over the unsigned folder
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// Files newly classified as signed and moved to the signed folder
    pub promoted: Vec<String>,
    /// Files whose signature field is still unfilled
    pub still_pending: Vec<String>,
    /// Files that could not be scanned or moved; never aborts the pass
    pub failed: Vec<ScanFailure>,
}

/// A single file the reconciliation pass could not process
#[derive(Debug, Clone)]
pub struct ScanFailure {
    pub name: String,
    pub reason: String,
}

/// Outcome of re-classifying one pending file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromoteStatus {
    Promoted,
    StillPending,
}

/// Move a file with rename semantics, falling back to copy-verify-delete
/// when rename fails (e.g. across filesystems).
fn move_file(source: &Path, destination: &Path) -> Result<()> {
    if std::fs::rename(source, destination).is_ok() {
        return Ok(());
    }

    std::fs::copy(source, destination)?;
    let copied = std::fs::metadata(destination)?.len();
    let original = std::fs::metadata(source)?.len();
    if copied != original {
        let _ = std::fs::remove_file(destination);
        return Err(Error::WriteFailure {
            reason: format!(
                "copy of {} arrived truncated ({} of {} bytes)",
                source.display(),
                copied,
                original
            ),
        });
    }
    std::fs::remove_file(source)?;
    Ok(())
}

impl Organizer {
    pub fn new(layout: FolderLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &FolderLayout {
        &self.layout
    }

    /// Classify a document and move it into the matching state subfolder.
    ///
    /// The file reference is resolved through the candidate directories when
    /// its literal path no longer exists. A missing destination folder is a
    /// configuration fault and fails the call.
    pub fn organize(
        &self,
        file_ref: &str,
        base_folder: Option<&Path>,
    ) -> Result<(PathBuf, SignatureState)> {
        let source = locator::resolve_file_ref(&self.layout, file_ref)?;
        let data = std::fs::read(&source)?;
        let state = classify_bytes(&data)?;

        let base = base_folder.unwrap_or(&self.layout.organized_dir);
        let dest_dir = base.join(state.folder_name());
        if !dest_dir.is_dir() {
            return Err(Error::DestinationUnavailable {
                path: dest_dir.display().to_string(),
            });
        }

        let file_name = source.file_name().ok_or_else(|| Error::FileNotFound {
            name: file_ref.to_string(),
        })?;
        let destination = dest_dir.join(file_name);

        if destination != source {
            move_file(&source, &destination)?;
        }

        Ok((destination, state))
    }

    /// PDF filenames waiting in the unsigned folder, sorted.
    /// Fails fast when the unsigned or signed folder is missing.
    pub fn pending_files(&self) -> Result<Vec<String>> {
        let pending_dir = self.layout.state_dir(SignatureState::UnsignedFields);
        let signed_dir = self.layout.state_dir(SignatureState::Signed);
        for dir in [&pending_dir, &signed_dir] {
            if !dir.is_dir() {
                return Err(Error::DestinationUnavailable {
                    path: dir.display().to_string(),
                });
            }
        }
        list_pdf_names(&pending_dir)
    }

    /// Re-classify one file in the unsigned folder, moving it to the signed
    /// folder when its signature field has been filled since the last scan.
    pub fn promote_if_signed(&self, name: &str) -> Result<PromoteStatus> {
        let path = self
            .layout
            .state_dir(SignatureState::UnsignedFields)
            .join(name);
        let data = std::fs::read(&path)?;
        match classify_bytes(&data)? {
            SignatureState::Signed => {
                let signed_dir = self.layout.state_dir(SignatureState::Signed);
                if !signed_dir.is_dir() {
                    return Err(Error::DestinationUnavailable {
                        path: signed_dir.display().to_string(),
                    });
                }
                move_file(&path, &signed_dir.join(name))?;
                Ok(PromoteStatus::Promoted)
            }
            _ => Ok(PromoteStatus::StillPending),
        }
    }

    /// Re-scan the unsigned folder and promote newly signed documents.
    ///
    /// Scans only the top level, in sorted filename order. Idempotent:
    /// promoted files are simply absent from the next scan. Per-file
    /// failures never abort the pass.
    pub fn reconcile_unsigned(&self) -> Result<ReconcileOutcome> {
        let mut outcome = ReconcileOutcome::default();
        for name in self.pending_files()? {
            match self.promote_if_signed(&name) {
                Ok(PromoteStatus::Promoted) => outcome.promoted.push(name),
                Ok(PromoteStatus::StillPending) => outcome.still_pending.push(name),
                Err(e) => outcome.failed.push(ScanFailure {
                    name,
                    reason: e.client_message(),
                }),
            }
        }
        Ok(outcome)
    }
}
