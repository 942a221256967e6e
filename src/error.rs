//! Error types for the eSignature MCP Server

use thiserror::Error;

/// Result type alias for the eSignature MCP Server
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the eSignature MCP Server
#[derive(Error, Debug)]
pub enum Error {
    /// File absent at its literal path and at every candidate location
    #[error("File not found: {name}")]
    FileNotFound { name: String },

    /// Invalid PDF file (bad header)
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// Underlying PDF cannot be parsed
    #[error("Malformed PDF: {0}")]
    Malformed(#[from] lopdf::Error),

    /// Placement page out of bounds
    #[error("Page {page} out of bounds (total: {total})")]
    PageOutOfBounds { page: u32, total: u32 },

    /// A form field with the requested name already exists
    #[error("Field already exists: {name}")]
    DuplicateField { name: String },

    /// Target folder missing or unwritable during a move
    #[error("Destination unavailable: {path}")]
    DestinationUnavailable { path: String },

    /// Field-append encode/write failed
    #[error("Write failed: {reason}")]
    WriteFailure { reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal runtime error (e.g. blocking task failure)
    #[error("Internal error: {reason}")]
    Internal { reason: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Return a sanitized error message safe to send to clients.
    /// Internal details (absolute paths, library errors) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::FileNotFound { name } => format!("File not found: {}", name),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::Malformed(_) => "Malformed PDF document".to_string(),
            Error::PageOutOfBounds { page, total } => {
                format!("Page {} out of bounds (total: {})", page, total)
            }
            Error::DuplicateField { name } => format!("Field already exists: {}", name),
            Error::DestinationUnavailable { .. } => "Destination folder unavailable".to_string(),
            Error::WriteFailure { .. } => "Failed to write output PDF".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Internal { .. } => "Internal error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
        }
    }
}
