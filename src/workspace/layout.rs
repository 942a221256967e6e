//! Folder layout for the intake directory and the organized folder set

use crate::error::{Error, Result};
use crate::pdf::SignatureState;
use std::path::{Path, PathBuf};

/// The directory tree the workflow operates on: an intake folder for new
/// documents and an organized base holding one subfolder per signature state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLayout {
    pub intake_dir: PathBuf,
    pub organized_dir: PathBuf,
}

impl Default for FolderLayout {
    fn default() -> Self {
        Self {
            intake_dir: PathBuf::from("pdf_documents"),
            organized_dir: PathBuf::from("organized_pdfs"),
        }
    }
}

impl FolderLayout {
    pub fn new(intake_dir: impl Into<PathBuf>, organized_dir: impl Into<PathBuf>) -> Self {
        Self {
            intake_dir: intake_dir.into(),
            organized_dir: organized_dir.into(),
        }
    }

    /// Organized subfolder for a state
    pub fn state_dir(&self, state: SignatureState) -> PathBuf {
        self.organized_dir.join(state.folder_name())
    }

    /// Candidate directories for file location, in fixed probe order:
    /// the three organized subfolders, then intake.
    pub fn candidate_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = SignatureState::ALL
            .iter()
            .map(|state| self.state_dir(*state))
            .collect();
        dirs.push(self.intake_dir.clone());
        dirs
    }

    /// Create the intake folder and the organized folder set if absent.
    /// Run once at startup so later moves never hit a missing folder.
    pub fn ensure_layout(&self) -> Result<()> {
        std::fs::create_dir_all(&self.intake_dir)?;
        for state in SignatureState::ALL {
            std::fs::create_dir_all(self.state_dir(state))?;
        }
        Ok(())
    }
}

/// A PDF file found in a listing
#[derive(Debug, Clone)]
pub struct PdfFileEntry {
    /// Filename only
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// Last modified time (ISO 8601 format)
    pub modified: Option<String>,
}

/// PDF filenames directly under `dir`, sorted. Missing directory is empty.
pub fn list_pdf_names(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let pattern = dir.join("*.pdf");
    let paths = glob::glob(&pattern.to_string_lossy())
        .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

    let mut names = Vec::new();
    for entry in paths {
        let path = match entry {
            Ok(p) => p,
            Err(_) => continue, // skip entries we can't read
        };
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name() {
            names.push(name.to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// PDF files directly under `dir` with size and modified metadata, sorted by name
pub fn list_pdf_files(dir: &Path) -> Result<Vec<PdfFileEntry>> {
    let names = list_pdf_names(dir)?;
    let mut files = Vec::with_capacity(names.len());
    for name in names {
        let metadata = std::fs::metadata(dir.join(&name)).ok();
        let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
        let modified = metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| {
                chrono::DateTime::from_timestamp(d.as_secs() as i64, 0)
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_default()
            });
        files.push(PdfFileEntry {
            name,
            size,
            modified,
        });
    }
    Ok(files)
}
